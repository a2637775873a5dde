//! Library crate for ruls
//!
//! This exposes the listing engine for the binary, the tests and embedding.
//!
//! # Features
//!
//! - **Lazy probing**: names read from a directory are only `stat`ed when the
//!   requested output needs something the directory read did not supply
//! - **Composable sorting**: key, collation, direction and directories-first
//!   are chosen independently and combined at run time
//! - **Cycle-safe recursion**: depth-first traversal that refuses to list a
//!   directory inside itself
//! - **Column layout**: grid, horizontal and comma-separated output packed
//!   into the line width
//! - **Color**: `LS_COLORS` parsing and colored names
//!
//! # Modules
//!
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: Resolved run configuration
//! - [`data`]: Core data structures (`FileEntry`, `FileType`, `Status`)
//! - [`probe`]: Probe decisions and the filesystem probe
//! - [`catalog`]: Per-directory entry table and column widths
//! - [`sort`]: Entry ordering
//! - [`traverse`]: Directory queue and cycle detection
//! - [`layout`]: Column layout
//! - [`color`]: `LS_COLORS` parsing and lookup
//! - [`output`]: Renderers
//! - [`session`]: The run itself

pub mod cancel;
pub mod catalog;
pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod layout;
pub mod output;
pub mod probe;
pub mod quote;
pub mod session;
pub mod sort;
pub mod timefmt;
pub mod traverse;
pub mod utils;
pub mod version;

pub use cli::Args;
pub use config::{Config, Environment};
pub use data::{FileEntry, FileType};
pub use error::{Diagnostics, ExitStatus, ListError};
pub use session::ListingSession;
