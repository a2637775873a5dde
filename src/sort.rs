//! Entry ordering.
//!
//! A [`Comparator`] is composed at runtime from independent strategies: a
//! key order, an optional reversal and an optional directories-first wrap.
//! Comparisons are fallible because locale collation can reject a name; the
//! [`sort_entries`] driver then re-sorts once in byte order.

use std::cmp::Ordering;
use std::ffi::{CStr, CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::config::{SortKey, SortSpec, TimeKind};
use crate::data::{FileEntry, Timestamp};
use crate::error::{Diagnostics, ListError};
use crate::quote::quote_path;
use crate::version::version_cmp;

/// How names compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collation {
    /// The C library's collation for the active locale. Under a UTF-8
    /// codeset, names that are not valid UTF-8 cannot be compared.
    Locale { utf8: bool },
    /// Raw bytes.
    ByteOrder,
}

/// Two names the locale could not order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollationError {
    pub left: OsString,
    pub right: OsString,
}

impl From<CollationError> for ListError {
    fn from(e: CollationError) -> Self {
        ListError::Collation {
            left: quote_path(e.left.as_ref()),
            right: quote_path(e.right.as_ref()),
        }
    }
}

/// Whether the locale set in the process uses the UTF-8 codeset.
fn codeset_is_utf8() -> bool {
    let codeset = unsafe { libc::nl_langinfo(libc::CODESET) };
    if codeset.is_null() {
        return false;
    }
    let name = unsafe { CStr::from_ptr(codeset) }.to_bytes();
    name.eq_ignore_ascii_case(b"UTF-8") || name.eq_ignore_ascii_case(b"UTF8")
}

impl Collation {
    /// Locale collation for whatever `setlocale` last selected.
    pub fn from_current_locale() -> Self {
        let utf8 = codeset_is_utf8();
        log::debug!("locale collation, utf8 codeset: {utf8}");
        Collation::Locale { utf8 }
    }

    pub fn compare(self, a: &OsStr, b: &OsStr) -> Result<Ordering, CollationError> {
        match self {
            Collation::ByteOrder => Ok(a.as_bytes().cmp(b.as_bytes())),
            Collation::Locale { utf8 } => {
                let fail = || CollationError {
                    left: a.to_os_string(),
                    right: b.to_os_string(),
                };
                let invalid = |s: &OsStr| std::str::from_utf8(s.as_bytes()).is_err();
                if utf8 && (invalid(a) || invalid(b)) {
                    return Err(fail());
                }
                let ca = CString::new(a.as_bytes()).map_err(|_| fail())?;
                let cb = CString::new(b.as_bytes()).map_err(|_| fail())?;
                let r = unsafe { libc::strcoll(ca.as_ptr(), cb.as_ptr()) };
                Ok(r.cmp(&0))
            }
        }
    }
}

/// A total order over entries.
pub trait EntryOrder {
    fn compare(&self, a: &FileEntry, b: &FileEntry) -> Result<Ordering, CollationError>;
}

/// Primary key with a name tie-break.
struct KeyOrder {
    key: SortKey,
    time: TimeKind,
    collation: Collation,
}

fn timestamp(entry: &FileEntry, kind: TimeKind) -> Timestamp {
    let Some(st) = entry.status.as_ref() else {
        return Timestamp::default();
    };
    match kind {
        TimeKind::Mtime => st.mtime,
        TimeKind::Ctime => st.ctime,
        TimeKind::Atime => st.atime,
        TimeKind::Btime => st.btime.unwrap_or_default(),
    }
}

fn size(entry: &FileEntry) -> u64 {
    entry.status.as_ref().map_or(0, |s| s.size)
}

/// Text after the last `.`, or empty.
fn extension(name: &OsStr) -> &OsStr {
    let bytes = name.as_bytes();
    match bytes.iter().rposition(|&b| b == b'.') {
        Some(i) => OsStr::from_bytes(&bytes[i + 1..]),
        None => OsStr::new(""),
    }
}

impl EntryOrder for KeyOrder {
    fn compare(&self, a: &FileEntry, b: &FileEntry) -> Result<Ordering, CollationError> {
        let by_name = || self.collation.compare(&a.name, &b.name);
        let primary = match self.key {
            SortKey::None => return Ok(Ordering::Equal),
            SortKey::Name => return by_name(),
            SortKey::Version => {
                return Ok(version_cmp(a.name.as_bytes(), b.name.as_bytes())
                    .then_with(|| a.name.as_bytes().cmp(b.name.as_bytes())));
            }
            SortKey::Extension => self.collation.compare(extension(&a.name), extension(&b.name))?,
            SortKey::Width => a.display_width.cmp(&b.display_width),
            SortKey::Size => size(b).cmp(&size(a)),
            SortKey::Time => timestamp(b, self.time).cmp(&timestamp(a, self.time)),
        };
        match primary {
            Ordering::Equal => by_name(),
            decided => Ok(decided),
        }
    }
}

struct Reversed<O>(O);

impl<O: EntryOrder> EntryOrder for Reversed<O> {
    fn compare(&self, a: &FileEntry, b: &FileEntry) -> Result<Ordering, CollationError> {
        self.0.compare(b, a)
    }
}

/// Puts directories, and links resolved to directories, before everything else.
struct DirectoriesFirst<O>(O);

impl<O: EntryOrder> EntryOrder for DirectoriesFirst<O> {
    fn compare(&self, a: &FileEntry, b: &FileEntry) -> Result<Ordering, CollationError> {
        match (a.is_linked_directory(), b.is_linked_directory()) {
            (true, false) => Ok(Ordering::Less),
            (false, true) => Ok(Ordering::Greater),
            _ => self.0.compare(a, b),
        }
    }
}

/// Comparator built from a [`SortSpec`] and a collation.
pub struct Comparator {
    key: SortKey,
    order: Box<dyn EntryOrder>,
}

impl Comparator {
    pub fn build(spec: SortSpec, collation: Collation) -> Self {
        let base = KeyOrder {
            key: spec.key,
            time: spec.time_subkey,
            collation,
        };
        let order: Box<dyn EntryOrder> = match (spec.reverse, spec.directories_first) {
            (false, false) => Box::new(base),
            (true, false) => Box::new(Reversed(base)),
            (false, true) => Box::new(DirectoriesFirst(base)),
            (true, true) => Box::new(DirectoriesFirst(Reversed(base))),
        };
        Comparator { key: spec.key, order }
    }

    pub fn compare(&self, a: &FileEntry, b: &FileEntry) -> Result<Ordering, CollationError> {
        self.order.compare(a, b)
    }

    /// Sorts in place, stopping at the first failed comparison.
    ///
    /// `SortKey::None` keeps discovery order. On error the entries are left
    /// in their original order.
    pub fn sort(&self, entries: &mut Vec<FileEntry>) -> Result<(), CollationError> {
        if self.key == SortKey::None {
            return Ok(());
        }
        let order = merge_sort_indices(entries, |a, b| self.compare(a, b))?;
        let mut slots: Vec<Option<FileEntry>> = entries.drain(..).map(Some).collect();
        entries.extend(order.into_iter().filter_map(|i| slots[i].take()));
        Ok(())
    }
}

/// Stable bottom-up merge sort over indices with a fallible comparator.
///
/// Iterative, so stack depth does not grow with the input; aborts on the
/// first comparator error.
fn merge_sort_indices<T, E>(
    items: &[T],
    mut cmp: impl FnMut(&T, &T) -> Result<Ordering, E>,
) -> Result<Vec<usize>, E> {
    let n = items.len();
    let mut src: Vec<usize> = (0..n).collect();
    let mut dst: Vec<usize> = vec![0; n];
    let mut width = 1;
    while width < n {
        let mut start = 0;
        while start < n {
            let mid = (start + width).min(n);
            let end = (start + 2 * width).min(n);
            let (mut i, mut j, mut k) = (start, mid, start);
            while i < mid && j < end {
                // left wins ties: stability
                if cmp(&items[src[j]], &items[src[i]])? == Ordering::Less {
                    dst[k] = src[j];
                    j += 1;
                } else {
                    dst[k] = src[i];
                    i += 1;
                }
                k += 1;
            }
            dst[k..k + (mid - i)].copy_from_slice(&src[i..mid]);
            k += mid - i;
            dst[k..k + (end - j)].copy_from_slice(&src[j..end]);
            start = end;
        }
        std::mem::swap(&mut src, &mut dst);
        width *= 2;
    }
    Ok(src)
}

/// Sorts one directory's entries, retrying once in byte order when the
/// locale cannot compare two names.
///
/// The failure is reported as a warning; it does not change the exit status.
pub fn sort_entries(
    entries: &mut Vec<FileEntry>,
    spec: SortSpec,
    collation: Collation,
    diag: &mut Diagnostics,
) {
    match Comparator::build(spec, collation).sort(entries) {
        Ok(()) => {}
        Err(e) => {
            log::debug!("collation failed, falling back to byte order");
            diag.warn(ListError::from(e).to_string());
            if let Err(e) = Comparator::build(spec, Collation::ByteOrder).sort(entries) {
                // byte order never fails; keep discovery order if it somehow does
                log::debug!("byte-order sort failed: {e:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FileType, Status};
    use std::io;

    fn status(size: u64, mtime: i64) -> Status {
        Status {
            mode: 0o100644,
            size,
            blocks: 0,
            nlink: 1,
            uid: 0,
            gid: 0,
            dev: 1,
            ino: 1,
            rdev: 0,
            atime: Timestamp::default(),
            mtime: Timestamp::new(mtime, 0),
            ctime: Timestamp::default(),
            btime: None,
        }
    }

    fn file(name: &str, size: u64) -> FileEntry {
        let mut e = FileEntry::new(name, FileType::Regular, None);
        e.status = Some(status(size, 0));
        e
    }

    fn dir(name: &str) -> FileEntry {
        FileEntry::new(name, FileType::Directory, None)
    }

    fn names(entries: &[FileEntry]) -> Vec<String> {
        entries.iter().map(|e| e.name.to_string_lossy().into_owned()).collect()
    }

    fn sorted(mut entries: Vec<FileEntry>, spec: SortSpec) -> Vec<String> {
        let mut diag = Diagnostics::new("ruls", Box::new(io::sink()));
        sort_entries(&mut entries, spec, Collation::ByteOrder, &mut diag);
        names(&entries)
    }

    #[test]
    fn test_directories_first_by_name() {
        let spec = SortSpec {
            directories_first: true,
            ..SortSpec::default()
        };
        let result = sorted(vec![dir("zdir"), file("afile", 0), dir("bdir")], spec);
        assert_eq!(result, vec!["bdir", "zdir", "afile"]);
    }

    #[test]
    fn test_directories_first_survives_reverse() {
        let spec = SortSpec {
            directories_first: true,
            reverse: true,
            ..SortSpec::default()
        };
        let entries = vec![dir("bdir"), file("afile", 0), dir("zdir"), file("cfile", 0)];
        let result = sorted(entries, spec);
        assert_eq!(result, vec!["zdir", "bdir", "cfile", "afile"]);
    }

    #[test]
    fn test_size_largest_first() {
        let spec = SortSpec {
            key: SortKey::Size,
            ..SortSpec::default()
        };
        let result = sorted(vec![file("a.txt", 10), file("b.md", 5), file("c", 100)], spec);
        assert_eq!(result, vec!["c", "a.txt", "b.md"]);
    }

    #[test]
    fn test_equal_keys_fall_back_to_name() {
        let spec = SortSpec {
            key: SortKey::Size,
            ..SortSpec::default()
        };
        let result = sorted(vec![file("b", 5), file("c", 5), file("a", 5)], spec);
        assert_eq!(result, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_time_newest_first() {
        let mut old = file("old", 0);
        old.status = Some(status(0, 100));
        let mut new = file("new", 0);
        new.status = Some(status(0, 200));
        let spec = SortSpec {
            key: SortKey::Time,
            ..SortSpec::default()
        };
        assert_eq!(sorted(vec![old, new], spec), vec!["new", "old"]);
    }

    #[test]
    fn test_extension_and_version_keys() {
        let spec = SortSpec {
            key: SortKey::Extension,
            ..SortSpec::default()
        };
        let entries = vec![
            file("b.rs", 0),
            file("a.toml", 0),
            file("README", 0),
            file("c.md", 0),
        ];
        let result = sorted(entries, spec);
        assert_eq!(result, vec!["README", "c.md", "b.rs", "a.toml"]);

        let spec = SortSpec {
            key: SortKey::Version,
            ..SortSpec::default()
        };
        let result = sorted(vec![file("v10", 0), file("v9", 0), file("v09", 0)], spec);
        assert_eq!(result, vec!["v09", "v9", "v10"]);
    }

    #[test]
    fn test_none_keeps_discovery_order() {
        let spec = SortSpec {
            key: SortKey::None,
            reverse: true,
            directories_first: true,
            ..SortSpec::default()
        };
        let result = sorted(vec![file("b", 0), dir("a"), file("c", 0)], spec);
        assert_eq!(result, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sort_is_idempotent_and_stable_on_large_input() {
        let entries: Vec<FileEntry> = (0..1000)
            .map(|i| file(&format!("f{:04}", (i * 7919) % 1000), (i % 13) as u64))
            .collect();
        let spec = SortSpec {
            key: SortKey::Size,
            ..SortSpec::default()
        };
        let mut diag = Diagnostics::new("ruls", Box::new(io::sink()));
        let mut once = entries;
        sort_entries(&mut once, spec, Collation::ByteOrder, &mut diag);
        let first = names(&once);
        sort_entries(&mut once, spec, Collation::ByteOrder, &mut diag);
        assert_eq!(names(&once), first);
        for pair in once.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let sa = a.status.as_ref().unwrap().size;
            let sb = b.status.as_ref().unwrap().size;
            assert!(sa > sb || (sa == sb && a.name < b.name));
        }
    }

    #[test]
    fn test_collation_failure_falls_back_to_byte_order() {
        use std::os::unix::ffi::OsStringExt;
        let bad = OsString::from_vec(vec![b'b', 0xff]);
        let mut entries = vec![
            FileEntry::new(bad, FileType::Regular, None),
            FileEntry::new("a", FileType::Regular, None),
        ];
        let mut diag = Diagnostics::new("ruls", Box::new(io::sink()));
        let collation = Collation::Locale { utf8: true };
        sort_entries(&mut entries, SortSpec::default(), collation, &mut diag);
        assert_eq!(entries[0].name, "a");
        assert_eq!(diag.messages().len(), 1);
        assert!(diag.messages()[0].starts_with("cannot compare file names"));
        assert_eq!(diag.status(), crate::error::ExitStatus::Success);
    }

    #[test]
    fn test_single_byte_locale_compares_any_name() {
        use std::os::unix::ffi::OsStringExt;
        // the test harness never calls setlocale, so this is the C locale
        let collation = Collation::from_current_locale();
        assert_eq!(collation, Collation::Locale { utf8: false });

        let latin1 = OsString::from_vec(vec![b'b', 0xe9]);
        assert_eq!(collation.compare(&latin1, OsStr::new("a")), Ok(Ordering::Greater));

        let mut entries = vec![
            FileEntry::new(latin1, FileType::Regular, None),
            FileEntry::new("a", FileType::Regular, None),
        ];
        let mut diag = Diagnostics::new("ruls", Box::new(io::sink()));
        sort_entries(&mut entries, SortSpec::default(), collation, &mut diag);
        assert_eq!(entries[0].name, "a");
        assert!(diag.messages().is_empty());
    }

    #[test]
    fn test_merge_sort_aborts_on_error() {
        let items = [3, 1, 2];
        let result: Result<Vec<usize>, ()> = merge_sort_indices(&items, |_, _| Err(()));
        assert!(result.is_err());
        let ok: Result<Vec<usize>, ()> = merge_sort_indices(&items, |a, b| Ok(a.cmp(b)));
        assert_eq!(ok.unwrap(), vec![1, 2, 0]);
    }
}
