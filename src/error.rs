//! Error types and the run-wide severity accumulator.
//!
//! Per-entry and per-directory problems never abort a listing. They are
//! reported through [`Diagnostics`], which prints them, remembers them, and
//! raises the process exit status to at least the severity of the problem.

use std::io::{self, Write};
use thiserror::Error;

use crate::color::ColorSpecError;

/// How much a recorded problem affects the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Minor,
    Serious,
}

impl Severity {
    /// Problems with command-line operands are serious, everything else is minor.
    pub fn for_operand(command_line_arg: bool) -> Self {
        if command_line_arg {
            Severity::Serious
        } else {
            Severity::Minor
        }
    }
}

/// Process exit status of a listing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ExitStatus {
    #[default]
    Success,
    Minor,
    Serious,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Minor => 1,
            ExitStatus::Serious => 2,
        }
    }
}

impl From<Severity> for ExitStatus {
    fn from(s: Severity) -> Self {
        match s {
            Severity::Minor => ExitStatus::Minor,
            Severity::Serious => ExitStatus::Serious,
        }
    }
}

/// `strerror(EILSEQ)`, the reason two names failed to collate.
const EILSEQ_MESSAGE: &str = "Invalid or incomplete multibyte or wide character";

/// Errors raised while listing.
///
/// Paths are stored already quoted for display.
#[derive(Error, Debug)]
pub enum ListError {
    #[error("cannot access {path}: {}", os_message(.source))]
    Access { path: String, source: io::Error },

    #[error("cannot open directory {path}: {}", os_message(.source))]
    OpenDir { path: String, source: io::Error },

    #[error("reading directory {path}: {}", os_message(.source))]
    ReadDir { path: String, source: io::Error },

    #[error("cannot read symbolic link {path}: {}", os_message(.source))]
    ReadLink { path: String, source: io::Error },

    #[error("cannot determine device and inode of {path}: {}", os_message(.source))]
    DeviceInode { path: String, source: io::Error },

    #[error("{path}: {}", os_message(.source))]
    Security { path: String, source: io::Error },

    #[error("{path}: not listing already-listed directory")]
    Cycle { path: String },

    #[error("cannot compare file names {left} and {right}: {}", EILSEQ_MESSAGE)]
    Collation { left: String, right: String },

    #[error("unparsable value for LS_COLORS environment variable")]
    ColorSpec(#[from] ColorSpecError),

    #[error("interrupted")]
    Interrupted,

    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error("write error: {}", os_message(.0))]
    Io(#[from] io::Error),
}

/// Renders an I/O error the way C's `strerror` would, without Rust's
/// trailing `(os error N)`.
pub fn os_message(e: &io::Error) -> String {
    let text = e.to_string();
    match text.rfind(" (os error ") {
        Some(idx) => text[..idx].to_string(),
        None => text,
    }
}

/// Run-wide diagnostics sink and severity accumulator.
pub struct Diagnostics {
    program: String,
    sink: Box<dyn Write>,
    messages: Vec<String>,
    status: ExitStatus,
}

impl Diagnostics {
    pub fn new(program: &str, sink: Box<dyn Write>) -> Self {
        Self {
            program: program.to_string(),
            sink,
            messages: Vec::new(),
            status: ExitStatus::Success,
        }
    }

    /// Diagnostics written to standard error.
    pub fn stderr(program: &str) -> Self {
        Self::new(program, Box::new(io::stderr()))
    }

    /// Records a problem and raises the exit status.
    pub fn report(&mut self, severity: Severity, err: &ListError) {
        self.status = self.status.max(severity.into());
        self.emit(err.to_string());
    }

    /// Emits a message that does not affect the exit status.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.emit(message.into());
    }

    fn emit(&mut self, message: String) {
        // A failing diagnostics stream has nowhere left to report to.
        let _ = writeln!(self.sink, "{}: {}", self.program, message);
        let _ = self.sink.flush();
        self.messages.push(message);
    }

    pub fn status(&self) -> ExitStatus {
        self.status
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}
