//! CLI interface definitions for the `ruls` application.
//!
//! This module defines command-line arguments using [`clap`] and exposes:
//!
//! - [`Args`]: the raw flags parsed from CLI inputs
//! - value enums for the word-valued options (`--sort`, `--time`, `--format`, ...)
//!
//! `Args` is a flat record; [`crate::config::Config::resolve`] turns it into
//! the configuration the listing core consumes.
//!
//! # Example
//!
//! ```bash
//! ruls -lR --group-directories-first --time-style=long-iso src
//! ```

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for the `ruls` directory lister.
#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "ruls",
    author = "Sam Green",
    version,
    about = "List information about the FILEs (the current directory by default).",
    disable_help_flag = true
)]
pub struct Args {
    /// Files and directories to list
    pub files: Vec<PathBuf>,

    /// Do not ignore entries starting with .
    #[arg(short = 'a', long = "all")]
    pub all: bool,

    /// Do not list implied . and ..
    #[arg(short = 'A', long = "almost-all")]
    pub almost_all: bool,

    /// With -l, print the author of each file
    #[arg(long)]
    pub author: bool,

    /// Do not list implied entries ending with ~
    #[arg(short = 'B', long = "ignore-backups")]
    pub ignore_backups: bool,

    /// Scale sizes by SIZE before printing them
    #[arg(long = "block-size", value_name = "SIZE")]
    pub block_size: Option<String>,

    /// Sort by, and show, ctime
    #[arg(short = 'c')]
    pub ctime: bool,

    /// List entries by columns
    #[arg(short = 'C', overrides_with_all = ["long", "one_per_line", "across", "commas", "format"])]
    pub columns: bool,

    /// Colorize the output; WHEN can be 'always', 'auto', or 'never'
    #[arg(
        long,
        value_enum,
        value_name = "WHEN",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "always",
    )]
    pub color: Option<When>,

    /// List directories themselves, not their contents
    #[arg(short = 'd', long)]
    pub directory: bool,

    /// List all entries in directory order
    #[arg(short = 'f')]
    pub unsorted_all: bool,

    /// Append indicator (one of */=>@|) to entries
    #[arg(short = 'F', long)]
    pub classify: bool,

    /// Likewise, except do not append '*'
    #[arg(long = "file-type")]
    pub file_type: bool,

    /// Append indicator with style WORD
    #[arg(long = "indicator-style", value_enum, value_name = "WORD")]
    pub indicator_style: Option<IndicatorArg>,

    /// Across -x, commas -m, horizontal -x, long -l, single-column -1, verbose -l, vertical -C
    #[arg(
        long,
        value_enum,
        value_name = "WORD",
        overrides_with_all = ["long", "one_per_line", "across", "commas", "columns"],
    )]
    pub format: Option<FormatArg>,

    /// Like -l --time-style=full-iso
    #[arg(long = "full-time")]
    pub full_time: bool,

    /// Group directories before files
    #[arg(long = "group-directories-first")]
    pub group_directories_first: bool,

    /// In a long listing, don't print group names
    #[arg(short = 'G', long = "no-group")]
    pub no_group: bool,

    /// With -l and -s, print sizes like 1K 234M 2G etc.
    #[arg(short = 'h', long = "human-readable")]
    pub human_readable: bool,

    /// Likewise, but use powers of 1000 not 1024
    #[arg(long)]
    pub si: bool,

    /// Follow symbolic links listed on the command line
    #[arg(short = 'H', long = "dereference-command-line")]
    pub dereference_command_line: bool,

    /// Follow each command line symbolic link that points to a directory
    #[arg(long = "dereference-command-line-symlink-to-dir")]
    pub dereference_command_line_symlink_to_dir: bool,

    /// Do not list implied entries matching shell PATTERN (overridden by -a or -A)
    #[arg(long, value_name = "PATTERN", action = ArgAction::Append)]
    pub hide: Vec<String>,

    /// Hyperlink file names; WHEN can be 'always', 'auto', or 'never'
    #[arg(
        long,
        value_enum,
        value_name = "WHEN",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "always",
    )]
    pub hyperlink: Option<When>,

    /// Print the index number of each file
    #[arg(short = 'i', long)]
    pub inode: bool,

    /// Do not list implied entries matching shell PATTERN
    #[arg(short = 'I', long, value_name = "PATTERN", action = ArgAction::Append)]
    pub ignore: Vec<String>,

    /// Default to 1024-byte blocks for file system usage
    #[arg(short = 'k', long)]
    pub kibibytes: bool,

    /// Use a long listing format
    #[arg(
        short = 'l',
        overrides_with_all = ["columns", "one_per_line", "across", "commas", "format"],
    )]
    pub long: bool,

    /// When showing file information for a symbolic link, show information
    /// for the file the link references
    #[arg(short = 'L', long)]
    pub dereference: bool,

    /// Fill width with a comma separated list of entries
    #[arg(
        short = 'm',
        overrides_with_all = ["long", "one_per_line", "across", "columns", "format"],
    )]
    pub commas: bool,

    /// Like -l, but list numeric user and group IDs
    #[arg(short = 'n', long = "numeric-uid-gid")]
    pub numeric_uid_gid: bool,

    /// Print entry names without quoting
    #[arg(short = 'N', long, overrides_with_all = ["quote_name", "quoting_style"])]
    pub literal: bool,

    /// Append / indicator to directories
    #[arg(short = 'p')]
    pub slash: bool,

    /// Enclose entry names in double quotes
    #[arg(short = 'Q', long = "quote-name", overrides_with_all = ["literal", "quoting_style"])]
    pub quote_name: bool,

    /// Use quoting style WORD for entry names
    #[arg(
        long = "quoting-style",
        value_name = "WORD",
        overrides_with_all = ["literal", "quote_name"],
    )]
    pub quoting_style: Option<String>,

    /// Reverse order while sorting
    #[arg(short = 'r', long)]
    pub reverse: bool,

    /// List subdirectories recursively
    #[arg(short = 'R', long)]
    pub recursive: bool,

    /// Print the allocated size of each file, in blocks
    #[arg(short = 's', long)]
    pub size: bool,

    /// Sort by file size, largest first
    #[arg(
        short = 'S',
        overrides_with_all = ["sort", "sort_time", "unsorted", "sort_version", "sort_extension"],
    )]
    pub sort_size: bool,

    /// Sort by WORD instead of name
    #[arg(
        long,
        value_enum,
        value_name = "WORD",
        overrides_with_all = [
            "sort_size",
            "sort_time",
            "unsorted",
            "sort_version",
            "sort_extension",
        ],
    )]
    pub sort: Option<SortArg>,

    /// Sort by time, newest first
    #[arg(
        short = 't',
        overrides_with_all = ["sort", "sort_size", "unsorted", "sort_version", "sort_extension"],
    )]
    pub sort_time: bool,

    /// Assume tab stops at each COLS instead of 8
    #[arg(short = 'T', long, value_name = "COLS")]
    pub tabsize: Option<usize>,

    /// Select which timestamp is used to display or sort
    #[arg(long, value_enum, value_name = "WORD")]
    pub time: Option<TimeArg>,

    /// Time/date format with -l
    #[arg(long = "time-style", value_name = "TIME_STYLE")]
    pub time_style: Option<String>,

    /// With -lt: sort by, and show, access time
    #[arg(short = 'u')]
    pub atime: bool,

    /// Do not sort; list entries in directory order
    #[arg(
        short = 'U',
        overrides_with_all = ["sort", "sort_size", "sort_time", "sort_version", "sort_extension"],
    )]
    pub unsorted: bool,

    /// Natural sort of (version) numbers within text
    #[arg(
        short = 'v',
        overrides_with_all = ["sort", "sort_size", "sort_time", "unsorted", "sort_extension"],
    )]
    pub sort_version: bool,

    /// Set output width to COLS; 0 means no limit
    #[arg(short = 'w', long, value_name = "COLS")]
    pub width: Option<usize>,

    /// List entries by lines instead of by columns
    #[arg(
        short = 'x',
        overrides_with_all = ["long", "one_per_line", "columns", "commas", "format"],
    )]
    pub across: bool,

    /// Sort alphabetically by entry extension
    #[arg(
        short = 'X',
        overrides_with_all = ["sort", "sort_size", "sort_time", "unsorted", "sort_version"],
    )]
    pub sort_extension: bool,

    /// Print any security context of each file
    #[arg(short = 'Z', long)]
    pub context: bool,

    /// List one file per line
    #[arg(short = '1', overrides_with_all = ["long", "columns", "across", "commas", "format"])]
    pub one_per_line: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

/// Argument of `--color` and `--hyperlink`.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum When {
    #[value(alias = "yes", alias = "force")]
    Always,
    #[value(alias = "tty", alias = "if-tty")]
    Auto,
    #[value(alias = "no", alias = "none")]
    Never,
}

/// Argument of `--sort`.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum SortArg {
    None,
    Size,
    Time,
    Version,
    Extension,
    Width,
    Name,
}

/// Argument of `--time`.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum TimeArg {
    #[value(alias = "modification")]
    Mtime,
    #[value(alias = "access", alias = "use")]
    Atime,
    #[value(alias = "status")]
    Ctime,
    #[value(alias = "creation")]
    Birth,
}

/// Argument of `--format`.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum FormatArg {
    Across,
    Commas,
    Horizontal,
    Long,
    SingleColumn,
    Verbose,
    Vertical,
}

/// Argument of `--indicator-style`.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum IndicatorArg {
    None,
    Slash,
    FileType,
    Classify,
}
