//! Directory traversal bookkeeping.
//!
//! Directories waiting to be listed live on a LIFO [`DirQueue`]. When
//! recursing, the (device, inode) pairs of the directories on the current
//! path are kept in an [`ActivePathSet`]; a directory whose pair is already
//! present would be listed inside itself, so it is skipped. Each entered
//! directory schedules a pop marker ahead of its own subdirectories, which
//! removes its pair once all of them have been listed.

use fnv::FnvHashSet;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use crate::config::IgnoreMode;
use crate::error::ListError;

/// A directory waiting to be listed, or a pop marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDirectory {
    /// `None` marks a pop marker.
    pub path: Option<PathBuf>,
    /// Name shown in the header instead of `path`.
    pub display_name: Option<OsString>,
    pub command_line_arg: bool,
}

impl PendingDirectory {
    pub fn directory(
        path: impl Into<PathBuf>,
        display_name: Option<OsString>,
        command_line_arg: bool,
    ) -> Self {
        PendingDirectory {
            path: Some(path.into()),
            display_name,
            command_line_arg,
        }
    }

    pub fn pop_marker() -> Self {
        PendingDirectory {
            path: None,
            display_name: None,
            command_line_arg: false,
        }
    }

    pub fn is_pop_marker(&self) -> bool {
        self.path.is_none()
    }
}

/// Stack of directories still to visit.
#[derive(Debug, Default)]
pub struct DirQueue {
    stack: Vec<PendingDirectory>,
}

impl DirQueue {
    pub fn push(&mut self, pending: PendingDirectory) {
        log::trace!(
            "queue push {:?} (depth {})",
            pending.path.as_deref(),
            self.stack.len() + 1
        );
        self.stack.push(pending);
    }

    pub fn pop(&mut self) -> Option<PendingDirectory> {
        self.stack.pop()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

/// Device and inode of a directory.
pub type DevIno = (u64, u64);

/// Directories on the current recursion path.
#[derive(Debug, Default)]
pub struct ActivePathSet {
    members: FnvHashSet<DevIno>,
    order: Vec<DevIno>,
}

impl ActivePathSet {
    /// Adds a directory; returns `false` if it is already on the path.
    pub fn enter(&mut self, id: DevIno) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Removes the most recently entered directory.
    pub fn leave(&mut self) -> Result<DevIno, ListError> {
        let id = self.order.pop().ok_or_else(|| {
            ListError::Invariant("pop marker with an empty active-path set".to_string())
        })?;
        if !self.members.remove(&id) {
            return Err(ListError::Invariant(format!(
                "active directory {}:{} missing from the set",
                id.0, id.1
            )));
        }
        Ok(id)
    }

    pub fn contains(&self, id: DevIno) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Where the drive loop is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    Idle,
    OpeningDirectory,
    ReadingEntries,
    Sorting,
    ExtractingSubdirs,
    Rendering,
    Done,
}

/// Queue, active-path set and state of one run.
#[derive(Debug)]
pub struct Traversal {
    queue: DirQueue,
    active: ActivePathSet,
    detect_cycles: bool,
    state: TraversalState,
}

impl Traversal {
    /// Cycle detection is only needed when recursing.
    pub fn new(detect_cycles: bool) -> Self {
        Traversal {
            queue: DirQueue::default(),
            active: ActivePathSet::default(),
            detect_cycles,
            state: TraversalState::Idle,
        }
    }

    pub fn state(&self) -> TraversalState {
        self.state
    }

    pub fn set_state(&mut self, next: TraversalState) {
        if next != self.state {
            log::trace!("traversal {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    pub fn detects_cycles(&self) -> bool {
        self.detect_cycles
    }

    pub fn enqueue(
        &mut self,
        path: impl Into<PathBuf>,
        display_name: Option<OsString>,
        command_line_arg: bool,
    ) {
        self.queue
            .push(PendingDirectory::directory(path, display_name, command_line_arg));
    }

    /// Schedules removal of the directory just entered, ahead of its
    /// subdirectories.
    pub fn push_pop_marker(&mut self) {
        if self.detect_cycles {
            self.queue.push(PendingDirectory::pop_marker());
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Next directory to list, consuming any pop markers on the way.
    ///
    /// Returns `Ok(None)` once the queue is drained, and an invariant error
    /// if a marker fires with nothing to remove.
    pub fn next_directory(&mut self) -> Result<Option<PendingDirectory>, ListError> {
        while let Some(pending) = self.queue.pop() {
            if pending.is_pop_marker() {
                let id = self.active.leave()?;
                log::trace!("leaving directory {}:{}", id.0, id.1);
                continue;
            }
            return Ok(Some(pending));
        }
        self.set_state(TraversalState::Done);
        Ok(None)
    }

    /// Records entry into a directory. Returns `false` when it is already on
    /// the current path.
    pub fn enter(&mut self, id: DevIno) -> bool {
        self.active.enter(id)
    }

    pub fn active(&self) -> &ActivePathSet {
        &self.active
    }
}

/// Decides which names read from a directory are hidden.
#[derive(Debug, Clone)]
pub struct NameFilter {
    mode: IgnoreMode,
    ignore: GlobSet,
    hide: GlobSet,
}

fn build_globs(patterns: &[String], warnings: &mut Vec<String>) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(e) => warnings.push(format!("ignoring invalid pattern '{pattern}': {}", e.kind())),
        }
    }
    builder.build().unwrap_or_else(|e| {
        warnings.push(format!("ignoring patterns: {e}"));
        GlobSet::empty()
    })
}

impl NameFilter {
    /// Compiles `--ignore` and `--hide` patterns. Patterns that do not
    /// compile are dropped with a warning.
    pub fn new(mode: IgnoreMode, ignore: &[String], hide: &[String]) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let filter = NameFilter {
            mode,
            ignore: build_globs(ignore, &mut warnings),
            hide: build_globs(hide, &mut warnings),
        };
        (filter, warnings)
    }

    /// Whether `.` and `..` are listed; directory reads never return them.
    pub fn shows_dot_entries(&self) -> bool {
        self.mode == IgnoreMode::Minimal
    }

    pub fn is_ignored(&self, name: &OsStr) -> bool {
        let bytes = name.as_encoded_bytes();
        let dotted = bytes.first() == Some(&b'.');
        let dot_or_dotdot = bytes == b"." || bytes == b"..";
        match self.mode {
            IgnoreMode::Default if dotted => return true,
            IgnoreMode::DotAndDotDot if dot_or_dotdot => return true,
            _ => {}
        }
        if self.mode == IgnoreMode::Default && self.hide.is_match(name) {
            return true;
        }
        self.ignore.is_match(name)
    }
}

/// True for `.` and `..`, which are never descended into.
pub fn is_dot_or_dotdot(name: &OsStr) -> bool {
    let bytes = name.as_encoded_bytes();
    bytes == b"." || bytes == b".."
}
