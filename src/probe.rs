//! Filesystem probing.
//!
//! [`ProbeGate`] decides, before any I/O, how much needs to be learned about
//! an entry. [`Probe`] is the capability that actually asks the filesystem;
//! [`FsProbe`] is the real implementation and tests substitute their own.

use std::ffi::{CString, OsString};
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::DirEntryExt;
use std::path::{Path, PathBuf};

use crate::color::Indicator;
use crate::config::{Config, Dereference, IndicatorStyle, SortKey};
use crate::data::{AclState, FileType, SecurityContext, Status};

/// Pure decision logic for how much to probe an entry.
///
/// Built once per run from the configuration; the checks themselves never
/// touch the filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeGate {
    pub hyperlink: bool,
    /// Output shows or sorts by status fields (long format, size/time sort,
    /// block counts, security contexts).
    pub format_needs_stat: bool,
    /// Output needs every entry's type (recursion, color, indicators, grouping).
    pub format_needs_type: bool,
    /// Directory colors depend on sticky and other-writable bits.
    pub color_dir_bits: bool,
    /// Symlink referents matter for display.
    pub symlink_referent: bool,
    pub print_inode: bool,
    /// Regular-file display depends on executable or set-id bits.
    pub exec_bits: bool,
}

impl ProbeGate {
    pub fn from_config(config: &Config) -> Self {
        let format_needs_stat = matches!(config.sort.key, SortKey::Time | SortKey::Size)
            || config.is_long()
            || config.print_scontext
            || config.print_block_size;
        let format_needs_type = !format_needs_stat
            && (config.recursive
                || config.color.is_some()
                || config.indicator_style != IndicatorStyle::None
                || config.sort.directories_first);
        let colored = |ind: Indicator| config.color.as_ref().is_some_and(|c| c.is_colored(ind));
        let symlink_as_referent = config.color.as_ref().is_some_and(|c| c.symlink_as_referent);

        ProbeGate {
            hyperlink: config.hyperlink,
            format_needs_stat,
            format_needs_type,
            color_dir_bits: colored(Indicator::OtherWritable)
                || colored(Indicator::StickyOtherWritable)
                || colored(Indicator::Sticky),
            symlink_referent: config.dereference == Dereference::Always
                || symlink_as_referent
                || config.check_symlink_mode(),
            print_inode: config.print_inode,
            exec_bits: config.indicator_style == IndicatorStyle::Classify
                || colored(Indicator::Exec)
                || colored(Indicator::SetUid)
                || colored(Indicator::SetGid),
        }
    }

    /// Whether the entry needs a full status probe.
    ///
    /// # Arguments
    /// * `hint` - Type reported by the directory read, `Unknown` if none
    /// * `inode_known` - Whether the directory read supplied an inode number
    /// * `command_line_arg` - Whether the entry was named on the command line
    pub fn needs_full_probe(
        &self,
        hint: FileType,
        inode_known: bool,
        command_line_arg: bool,
    ) -> bool {
        let unknown = hint == FileType::Unknown;
        command_line_arg
            || self.hyperlink
            || self.format_needs_stat
            || ((hint == FileType::Directory || unknown) && self.color_dir_bits)
            || ((self.print_inode || self.format_needs_type)
                && (hint == FileType::Symlink || unknown)
                && self.symlink_referent)
            || (self.print_inode && !inode_known)
            || ((hint == FileType::Regular || unknown) && self.exec_bits)
    }

    /// Whether only the entry's type has to be determined.
    pub fn needs_light_probe(
        &self,
        hint: FileType,
        inode_known: bool,
        command_line_arg: bool,
    ) -> bool {
        self.format_needs_type
            && hint == FileType::Unknown
            && !self.needs_full_probe(hint, inode_known, command_line_arg)
    }
}

/// What a directory read reports about one name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirHint {
    pub name: OsString,
    pub file_type: FileType,
    pub inode: Option<u64>,
}

/// Result of the ACL / security-context / capability probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityInfo {
    pub acl: AclState,
    pub context: SecurityContext,
    pub capability: bool,
}

/// Entries produced by [`Probe::read_dir`].
pub type DirHints<'a> = Box<dyn Iterator<Item = io::Result<DirHint>> + 'a>;

/// Filesystem capability used by the catalog and the traversal.
pub trait Probe {
    /// Full status of `path`, following a final symlink when `follow` is set.
    fn stat(&self, path: &Path, follow: bool) -> io::Result<Status>;

    /// Type of `path` only.
    fn file_type(&self, path: &Path, follow: bool) -> io::Result<FileType> {
        self.stat(path, follow).map(|s| s.file_type())
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Absolute, symlink-free form of `path`, used for hyperlinks.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    /// Names in a directory, in directory order, without `.` and `..`.
    fn read_dir(&self, path: &Path) -> io::Result<DirHints<'_>>;

    /// ACL, security label and capability of `path` (never following links).
    ///
    /// An `Unsupported`-class error means the filesystem cannot answer for
    /// any file on it.
    fn security(&self, path: &Path, want_capability: bool) -> io::Result<SecurityInfo>;
}

/// Whether a security probe error means "not supported here" rather than a
/// problem with one file.
pub fn is_unsupported(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(code) if code == libc::ENOTSUP || code == libc::EOPNOTSUPP || code == libc::ENOSYS
    ) || err.kind() == io::ErrorKind::Unsupported
}

/// [`Probe`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl Probe for FsProbe {
    fn stat(&self, path: &Path, follow: bool) -> io::Result<Status> {
        let meta = if follow {
            fs::metadata(path)?
        } else {
            fs::symlink_metadata(path)?
        };
        Ok(Status::from(&meta))
    }

    fn file_type(&self, path: &Path, follow: bool) -> io::Result<FileType> {
        let meta = if follow {
            fs::metadata(path)?
        } else {
            fs::symlink_metadata(path)?
        };
        Ok(FileType::from_std(meta.file_type()))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<DirHints<'_>> {
        let iter = fs::read_dir(path)?.map(|res| {
            res.map(|entry| DirHint {
                name: entry.file_name(),
                // d_type when the filesystem supplies it; no extra stat
                file_type: entry
                    .file_type()
                    .map(FileType::from_std)
                    .unwrap_or(FileType::Unknown),
                inode: Some(entry.ino()),
            })
        });
        Ok(Box::new(iter))
    }

    fn security(&self, path: &Path, want_capability: bool) -> io::Result<SecurityInfo> {
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let acl = xattr_present(&c_path, "system.posix_acl_access")?
            || xattr_present(&c_path, "system.posix_acl_default")?;
        let label = xattr_value(&c_path, "security.selinux")?;
        let capability = want_capability && xattr_present(&c_path, "security.capability")?;

        let has_label = label.as_deref().is_some_and(|l| l != "unlabeled");
        let acl = match (acl, has_label) {
            (true, _) => AclState::Present,
            (false, true) => AclState::ContextOnly,
            (false, false) => AclState::None,
        };
        let context = match label {
            Some(l) => SecurityContext::Label(l),
            None => SecurityContext::Unknown,
        };
        Ok(SecurityInfo {
            acl,
            context,
            capability,
        })
    }
}

#[cfg(target_os = "linux")]
fn xattr_len(path: &CString, name: &str) -> io::Result<Option<usize>> {
    let c_name = CString::new(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let ret = unsafe { libc::lgetxattr(path.as_ptr(), c_name.as_ptr(), std::ptr::null_mut(), 0) };
    if ret >= 0 {
        return Ok(Some(ret as usize));
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::ENODATA) => Ok(None),
        _ => Err(err),
    }
}

#[cfg(not(target_os = "linux"))]
fn xattr_len(_path: &CString, _name: &str) -> io::Result<Option<usize>> {
    Err(io::Error::from_raw_os_error(libc::ENOTSUP))
}

fn xattr_present(path: &CString, name: &str) -> io::Result<bool> {
    Ok(xattr_len(path, name)?.is_some())
}

#[cfg(target_os = "linux")]
fn xattr_value(path: &CString, name: &str) -> io::Result<Option<String>> {
    let Some(len) = xattr_len(path, name)? else {
        return Ok(None);
    };
    let c_name = CString::new(name).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let mut buf = vec![0u8; len];
    let ret = unsafe {
        libc::lgetxattr(
            path.as_ptr(),
            c_name.as_ptr(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
        )
    };
    if ret < 0 {
        let err = io::Error::last_os_error();
        return match err.raw_os_error() {
            Some(libc::ENODATA) => Ok(None),
            _ => Err(err),
        };
    }
    buf.truncate(ret as usize);
    while buf.last() == Some(&0) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

#[cfg(not(target_os = "linux"))]
fn xattr_value(_path: &CString, _name: &str) -> io::Result<Option<String>> {
    Err(io::Error::from_raw_os_error(libc::ENOTSUP))
}
