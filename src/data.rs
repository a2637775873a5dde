//! Data structures for representing listed entries.
//!
//! This module defines the core data structures used throughout `ruls`
//! for representing names read from directories or given on the command line,
//! together with the metadata snapshot the probe layer attaches to them.

use std::ffi::OsString;
use std::fs::Metadata;
use std::os::unix::fs::MetadataExt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Type tag of a listed entry.
///
/// `ArgDirectory` marks a directory named on the command line that will be
/// expanded later rather than shown as itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    Unknown,
    Fifo,
    CharDevice,
    Directory,
    BlockDevice,
    Regular,
    Symlink,
    Socket,
    Whiteout,
    ArgDirectory,
}

impl FileType {
    /// Derives the type tag from the `S_IFMT` bits of a mode.
    pub fn from_mode(mode: u32) -> Self {
        match mode & libc::S_IFMT as u32 {
            m if m == libc::S_IFIFO as u32 => FileType::Fifo,
            m if m == libc::S_IFCHR as u32 => FileType::CharDevice,
            m if m == libc::S_IFDIR as u32 => FileType::Directory,
            m if m == libc::S_IFBLK as u32 => FileType::BlockDevice,
            m if m == libc::S_IFREG as u32 => FileType::Regular,
            m if m == libc::S_IFLNK as u32 => FileType::Symlink,
            m if m == libc::S_IFSOCK as u32 => FileType::Socket,
            _ => FileType::Unknown,
        }
    }

    /// Maps a `std` file type to the tag.
    pub fn from_std(ft: std::fs::FileType) -> Self {
        use std::os::unix::fs::FileTypeExt;

        if ft.is_symlink() {
            FileType::Symlink
        } else if ft.is_dir() {
            FileType::Directory
        } else if ft.is_file() {
            FileType::Regular
        } else if ft.is_fifo() {
            FileType::Fifo
        } else if ft.is_char_device() {
            FileType::CharDevice
        } else if ft.is_block_device() {
            FileType::BlockDevice
        } else if ft.is_socket() {
            FileType::Socket
        } else {
            FileType::Unknown
        }
    }

    /// True for both plain and command-line directories.
    pub fn is_directory(self) -> bool {
        matches!(self, FileType::Directory | FileType::ArgDirectory)
    }

    /// Leading character of the long-format mode string.
    pub fn mode_char(self) -> char {
        match self {
            FileType::Unknown => '?',
            FileType::Fifo => 'p',
            FileType::CharDevice => 'c',
            FileType::Directory | FileType::ArgDirectory => 'd',
            FileType::BlockDevice => 'b',
            FileType::Regular => '-',
            FileType::Symlink => 'l',
            FileType::Socket => 's',
            FileType::Whiteout => 'w',
        }
    }
}

/// A point in time with nanosecond resolution, ordered chronologically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub secs: i64,
    pub nanos: u32,
}

impl Timestamp {
    pub fn new(secs: i64, nanos: i64) -> Self {
        Self {
            secs,
            nanos: nanos.clamp(0, 999_999_999) as u32,
        }
    }
}

impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Self {
        match t.duration_since(UNIX_EPOCH) {
            Ok(d) => Timestamp {
                secs: d.as_secs() as i64,
                nanos: d.subsec_nanos(),
            },
            Err(e) => {
                let d = e.duration();
                let mut secs = -(d.as_secs() as i64);
                let mut nanos = d.subsec_nanos();
                if nanos > 0 {
                    secs -= 1;
                    nanos = 1_000_000_000 - nanos;
                }
                Timestamp { secs, nanos }
            }
        }
    }
}

/// Structured snapshot of one successful status probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub mode: u32,
    pub size: u64,
    /// Allocated size in 512-byte units.
    pub blocks: u64,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub dev: u64,
    pub ino: u64,
    pub rdev: u64,
    pub atime: Timestamp,
    pub mtime: Timestamp,
    pub ctime: Timestamp,
    pub btime: Option<Timestamp>,
}

impl Status {
    pub fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode)
    }

    pub fn is_dir(&self) -> bool {
        self.file_type() == FileType::Directory
    }
}

impl From<&Metadata> for Status {
    fn from(m: &Metadata) -> Self {
        Status {
            mode: m.mode(),
            size: m.size(),
            blocks: m.blocks(),
            nlink: m.nlink(),
            uid: m.uid(),
            gid: m.gid(),
            dev: m.dev(),
            ino: m.ino(),
            rdev: m.rdev(),
            atime: Timestamp::new(m.atime(), m.atime_nsec()),
            mtime: Timestamp::new(m.mtime(), m.mtime_nsec()),
            ctime: Timestamp::new(m.ctime(), m.ctime_nsec()),
            btime: m.created().ok().map(Timestamp::from),
        }
    }
}

/// ACL probe outcome for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AclState {
    #[default]
    None,
    Unknown,
    ContextOnly,
    Present,
}

/// Security label of an entry.
///
/// `Unknown` means the label was asked for and could not be determined;
/// `None` means it was never asked for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SecurityContext {
    #[default]
    None,
    Unknown,
    Label(String),
}

impl SecurityContext {
    pub fn as_display(&self) -> &str {
        match self {
            SecurityContext::Label(s) => s,
            _ => "?",
        }
    }
}

/// A value with an explicit "not yet determined" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tristate {
    #[default]
    Unknown,
    Yes,
    No,
}

/// Represents one listed name.
///
/// # Fields
/// * `name` - Name as read from the directory or given on the command line
/// * `link_target` - Symlink contents, when the link was read
/// * `absolute_path` - Resolved path used for hyperlinks
/// * `status` - Probe snapshot; `None` when the probe failed or was skipped
/// * `inode` - Inode number supplied by the directory read, if any
/// * `file_type` - Type tag, refined by the probe
/// * `link_mode` - Mode of the symlink referent when it was resolved
/// * `owner` / `group` - Display strings resolved for long format
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: OsString,
    pub link_target: Option<PathBuf>,
    pub absolute_path: Option<PathBuf>,
    pub status: Option<Status>,
    pub inode: Option<u64>,
    pub file_type: FileType,
    pub link_mode: Option<u32>,
    pub security_context: SecurityContext,
    pub acl_state: AclState,
    pub has_capability: bool,
    pub needs_quoting: Tristate,
    pub display_width: usize,
    pub owner: Option<String>,
    pub group: Option<String>,
}

impl FileEntry {
    /// Creates an unprobed entry carrying only what the directory read supplied.
    pub fn new(name: impl Into<OsString>, file_type: FileType, inode: Option<u64>) -> Self {
        FileEntry {
            name: name.into(),
            link_target: None,
            absolute_path: None,
            status: None,
            inode,
            file_type,
            link_mode: None,
            security_context: SecurityContext::None,
            acl_state: AclState::None,
            has_capability: false,
            needs_quoting: Tristate::Unknown,
            display_width: 0,
            owner: None,
            group: None,
        }
    }

    /// Inode from the probe, falling back to the directory-read hint.
    pub fn inode(&self) -> Option<u64> {
        self.status.as_ref().map(|s| s.ino).or(self.inode)
    }

    /// True for directories, and for symlinks whose referent was resolved to one.
    pub fn is_linked_directory(&self) -> bool {
        self.file_type.is_directory()
            || self
                .link_mode
                .is_some_and(|m| FileType::from_mode(m) == FileType::Directory)
    }

    /// Mode used for coloring: the referent's when `as_referent` is set and the
    /// link resolved, else the entry's own.
    pub fn effective_mode(&self, as_referent: bool) -> Option<u32> {
        match (as_referent, self.link_mode) {
            (true, Some(m)) => Some(m),
            _ => self.status.as_ref().map(|s| s.mode),
        }
    }
}
