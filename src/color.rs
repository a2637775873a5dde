//! Color specification parsing and lookup.
//!
//! A color specification is the `LS_COLORS` format: `:`-separated tokens that
//! are either a two-letter category (`di=01;34`) or an extension pattern
//! (`*.tar=01;31`). Values may contain backslash and caret escapes. Any
//! malformed token rejects the whole specification; callers then disable
//! color instead of running with a partial table.

use std::os::unix::ffi::OsStrExt;
use thiserror::Error;

use crate::data::{FileEntry, FileType};

/// Color categories, in the order of their two-letter codes in [`INDICATOR_CODES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Indicator {
    Left,
    Right,
    End,
    Reset,
    Normal,
    File,
    Dir,
    Link,
    Fifo,
    Sock,
    Blk,
    Chr,
    Missing,
    Orphan,
    Exec,
    Door,
    SetUid,
    SetGid,
    Sticky,
    OtherWritable,
    StickyOtherWritable,
    Cap,
    MultiHardLink,
    ClrToEol,
}

const INDICATOR_COUNT: usize = 24;

/// Two-letter category codes accepted in a specification.
pub const INDICATOR_CODES: [&str; INDICATOR_COUNT] = [
    "lc", "rc", "ec", "rs", "no", "fi", "di", "ln", "pi", "so", "bd", "cd", "mi", "or", "ex", "do",
    "su", "sg", "st", "ow", "tw", "ca", "mh", "cl",
];

const ALL_INDICATORS: [Indicator; INDICATOR_COUNT] = [
    Indicator::Left,
    Indicator::Right,
    Indicator::End,
    Indicator::Reset,
    Indicator::Normal,
    Indicator::File,
    Indicator::Dir,
    Indicator::Link,
    Indicator::Fifo,
    Indicator::Sock,
    Indicator::Blk,
    Indicator::Chr,
    Indicator::Missing,
    Indicator::Orphan,
    Indicator::Exec,
    Indicator::Door,
    Indicator::SetUid,
    Indicator::SetGid,
    Indicator::Sticky,
    Indicator::OtherWritable,
    Indicator::StickyOtherWritable,
    Indicator::Cap,
    Indicator::MultiHardLink,
    Indicator::ClrToEol,
];

const DEFAULT_SEQUENCES: [&[u8]; INDICATOR_COUNT] = [
    b"\x1b[", b"m", b"", b"0", b"", b"", b"01;34", b"01;36", b"33", b"01;35", b"01;33", b"01;33",
    b"", b"", b"01;32", b"01;35", b"37;41", b"30;43", b"37;44", b"34;42", b"30;42", b"", b"",
    b"\x1b[K",
];

impl Indicator {
    pub fn code(self) -> &'static str {
        INDICATOR_CODES[self as usize]
    }

    pub fn from_code(code: &[u8]) -> Option<Self> {
        INDICATOR_CODES
            .iter()
            .position(|c| c.as_bytes() == code)
            .map(|i| ALL_INDICATORS[i])
    }
}

/// Reasons a color specification is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorSpecError {
    #[error("invalid escape sequence at byte {0}")]
    BadEscape(usize),
    #[error("missing '=' at byte {0}")]
    MissingEquals(usize),
    #[error("unrecognized prefix: {0}")]
    UnknownCategory(String),
}

/// One extension pattern of the specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionColor {
    pub ext: Vec<u8>,
    pub seq: Vec<u8>,
    /// Set when a case-insensitive collision with a different sequence exists.
    pub exact_match: bool,
    /// Shadowed by an equivalent, later definition.
    pub ignored: bool,
}

/// Parsed category and extension tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTable {
    sequences: Vec<Vec<u8>>,
    /// Most recently defined first.
    extensions: Vec<ExtensionColor>,
    /// `ln=target`: color symlinks as the type of their referent.
    pub symlink_as_referent: bool,
}

impl Default for ColorTable {
    fn default() -> Self {
        Self {
            sequences: DEFAULT_SEQUENCES.iter().map(|s| s.to_vec()).collect(),
            extensions: Vec::new(),
            symlink_as_referent: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    Ground,
    Backslash,
    Octal,
    Hex,
    Caret,
    End,
    Error,
}

/// Decodes one value starting at `*pos`, stopping before `:` or the end
/// of input (or before an unescaped `=` when `equals_end` is set).
fn decode_value(
    input: &[u8],
    pos: &mut usize,
    equals_end: bool,
) -> Result<Vec<u8>, ColorSpecError> {
    let mut out = Vec::new();
    let mut state = DecodeState::Ground;
    let mut num: u8 = 0;
    let mut digits = 0;

    while state != DecodeState::End && state != DecodeState::Error {
        let c = input.get(*pos).copied();
        match state {
            DecodeState::Ground => match c {
                None | Some(b':') => state = DecodeState::End,
                Some(b'=') if equals_end => state = DecodeState::End,
                Some(b'\\') => {
                    state = DecodeState::Backslash;
                    *pos += 1;
                }
                Some(b'^') => {
                    state = DecodeState::Caret;
                    *pos += 1;
                }
                Some(b) => {
                    out.push(b);
                    *pos += 1;
                }
            },
            DecodeState::Backslash => {
                let Some(b) = c else {
                    state = DecodeState::Error;
                    continue;
                };
                *pos += 1;
                state = DecodeState::Ground;
                match b {
                    b'0'..=b'7' => {
                        state = DecodeState::Octal;
                        num = b - b'0';
                        digits = 1;
                    }
                    b'x' | b'X' => {
                        state = DecodeState::Hex;
                        num = 0;
                        digits = 0;
                    }
                    b'a' => out.push(0x07),
                    b'b' => out.push(0x08),
                    b'e' => out.push(0x1b),
                    b'f' => out.push(0x0c),
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'v' => out.push(0x0b),
                    b'?' => out.push(0x7f),
                    b'_' => out.push(b' '),
                    b'\\' | b':' | b'=' | b'^' => out.push(b),
                    _ => state = DecodeState::Error,
                }
            }
            DecodeState::Octal => match c {
                Some(b @ b'0'..=b'7') if digits < 3 => {
                    num = num.wrapping_shl(3).wrapping_add(b - b'0');
                    digits += 1;
                    *pos += 1;
                }
                _ => {
                    out.push(num);
                    state = DecodeState::Ground;
                }
            },
            DecodeState::Hex => match c.and_then(|b| (b as char).to_digit(16)) {
                Some(d) if digits < 2 => {
                    num = num.wrapping_shl(4).wrapping_add(d as u8);
                    digits += 1;
                    *pos += 1;
                }
                _ if digits == 0 => state = DecodeState::Error,
                _ => {
                    out.push(num);
                    state = DecodeState::Ground;
                }
            },
            DecodeState::Caret => {
                state = DecodeState::Ground;
                match c {
                    Some(b @ b'@'..=b'~') => out.push(b & 0x1f),
                    Some(b'?') => out.push(0x7f),
                    _ => {
                        state = DecodeState::Error;
                        continue;
                    }
                }
                *pos += 1;
            }
            DecodeState::End | DecodeState::Error => {}
        }
    }

    if state == DecodeState::Error {
        Err(ColorSpecError::BadEscape(*pos))
    } else {
        Ok(out)
    }
}

/// Parses a specification on top of the built-in default table.
///
/// # Errors
/// Any malformed token fails the whole parse; nothing partial is returned.
pub fn parse(spec: &[u8]) -> Result<ColorTable, ColorSpecError> {
    let mut table = ColorTable::default();
    let mut defined = Vec::new();
    let mut pos = 0;

    while pos < spec.len() {
        match spec[pos] {
            b':' => pos += 1,
            b'*' => {
                pos += 1;
                let ext = decode_value(spec, &mut pos, true)?;
                if spec.get(pos) != Some(&b'=') {
                    return Err(ColorSpecError::MissingEquals(pos));
                }
                pos += 1;
                let seq = decode_value(spec, &mut pos, false)?;
                defined.push(ExtensionColor {
                    ext,
                    seq,
                    exact_match: false,
                    ignored: false,
                });
            }
            _ => {
                let label = spec
                    .get(pos..pos + 2)
                    .ok_or(ColorSpecError::MissingEquals(spec.len()))?;
                pos += 2;
                if spec.get(pos) != Some(&b'=') {
                    return Err(ColorSpecError::MissingEquals(pos));
                }
                pos += 1;
                let indicator = Indicator::from_code(label).ok_or_else(|| {
                    ColorSpecError::UnknownCategory(String::from_utf8_lossy(label).into_owned())
                })?;
                let seq = decode_value(spec, &mut pos, false)?;
                table.sequences[indicator as usize] = seq;
            }
        }
    }

    defined.reverse();
    dedup_extensions(&mut defined);
    table.extensions = defined;
    table.symlink_as_referent = table.sequence(Indicator::Link) == b"target";
    Ok(table)
}

/// Resolves collisions between extension patterns. `list` is most recent first.
fn dedup_extensions(list: &mut [ExtensionColor]) {
    for i in 0..list.len() {
        if list[i].ignored {
            continue;
        }
        let mut case_ignored = false;
        for j in i + 1..list.len() {
            if list[j].ignored || list[i].ext.len() != list[j].ext.len() {
                continue;
            }
            if list[i].ext == list[j].ext {
                list[j].ignored = true;
            } else if list[i].ext.eq_ignore_ascii_case(&list[j].ext) {
                if case_ignored {
                    list[j].ignored = true;
                } else if list[i].seq == list[j].seq {
                    list[j].ignored = true;
                    case_ignored = true;
                } else {
                    list[i].exact_match = true;
                    list[j].exact_match = true;
                }
            }
        }
    }
}

/// True unless the sequence is empty, `0` or `00`.
fn is_colored_seq(seq: &[u8]) -> bool {
    !(seq.is_empty() || seq == b"0" || seq == b"00")
}

impl ColorTable {
    pub fn sequence(&self, indicator: Indicator) -> &[u8] {
        &self.sequences[indicator as usize]
    }

    pub fn is_colored(&self, indicator: Indicator) -> bool {
        is_colored_seq(self.sequence(indicator))
    }

    /// Extension entries still in effect after de-duplication.
    pub fn extensions(&self) -> impl Iterator<Item = &ExtensionColor> {
        self.extensions.iter().filter(|e| !e.ignored)
    }

    fn extension_for(&self, name: &[u8]) -> Option<&ExtensionColor> {
        self.extensions().find(|e| {
            if e.ext.len() > name.len() {
                return false;
            }
            let tail = &name[name.len() - e.ext.len()..];
            if e.exact_match {
                tail == e.ext.as_slice()
            } else {
                tail.eq_ignore_ascii_case(&e.ext)
            }
        })
    }

    /// Whether symlink referents must be resolved for coloring.
    pub fn needs_symlink_mode(&self, long_format: bool) -> bool {
        self.is_colored(Indicator::Orphan)
            || (self.is_colored(Indicator::Exec) && self.symlink_as_referent)
            || (self.is_colored(Indicator::Missing) && long_format)
    }

    /// Picks the sequence for an entry, or for its symlink referent when
    /// `target` is set. `None` means the name is printed uncolored.
    pub fn sequence_for(&self, entry: &FileEntry, target: bool) -> Option<&[u8]> {
        let link_ok = entry.link_mode.is_some();
        let (name, mode) = if target {
            let name = entry
                .link_target
                .as_deref()
                .map(|p| p.as_os_str().as_bytes())
                .unwrap_or_default();
            (name, entry.link_mode)
        } else {
            (
                entry.name.as_bytes(),
                entry.effective_mode(self.symlink_as_referent),
            )
        };

        let indicator = if target && !link_ok && self.is_colored(Indicator::Missing) {
            Indicator::Missing
        } else if let Some(mode) = mode.filter(|_| target || entry.status.is_some()) {
            self.indicator_for_mode(entry, mode)
        } else if target {
            Indicator::Orphan
        } else {
            match entry.file_type {
                FileType::Unknown | FileType::Whiteout => Indicator::Orphan,
                FileType::Fifo => Indicator::Fifo,
                FileType::CharDevice => Indicator::Chr,
                FileType::Directory | FileType::ArgDirectory => Indicator::Dir,
                FileType::BlockDevice => Indicator::Blk,
                FileType::Regular => Indicator::File,
                FileType::Symlink => Indicator::Link,
                FileType::Socket => Indicator::Sock,
            }
        };

        let ext = if indicator == Indicator::File {
            self.extension_for(name)
        } else {
            None
        };

        let indicator = if indicator == Indicator::Link
            && !link_ok
            && (self.symlink_as_referent || self.is_colored(Indicator::Orphan))
        {
            Indicator::Orphan
        } else {
            indicator
        };

        let seq = match ext {
            Some(e) => e.seq.as_slice(),
            None => self.sequence(indicator),
        };
        if seq.is_empty() { None } else { Some(seq) }
    }

    fn indicator_for_mode(&self, entry: &FileEntry, mode: u32) -> Indicator {
        const EXEC_BITS: u32 = 0o111;
        let setuid = libc::S_ISUID as u32;
        let setgid = libc::S_ISGID as u32;
        let sticky = libc::S_ISVTX as u32;
        let other_write = libc::S_IWOTH as u32;

        match FileType::from_mode(mode) {
            FileType::Regular => {
                let nlink = entry.status.as_ref().map_or(1, |s| s.nlink);
                if mode & setuid != 0 && self.is_colored(Indicator::SetUid) {
                    Indicator::SetUid
                } else if mode & setgid != 0 && self.is_colored(Indicator::SetGid) {
                    Indicator::SetGid
                } else if entry.has_capability {
                    Indicator::Cap
                } else if mode & EXEC_BITS != 0 && self.is_colored(Indicator::Exec) {
                    Indicator::Exec
                } else if nlink > 1 && self.is_colored(Indicator::MultiHardLink) {
                    Indicator::MultiHardLink
                } else {
                    Indicator::File
                }
            }
            FileType::Directory => {
                if mode & sticky != 0
                    && mode & other_write != 0
                    && self.is_colored(Indicator::StickyOtherWritable)
                {
                    Indicator::StickyOtherWritable
                } else if mode & other_write != 0 && self.is_colored(Indicator::OtherWritable) {
                    Indicator::OtherWritable
                } else if mode & sticky != 0 && self.is_colored(Indicator::Sticky) {
                    Indicator::Sticky
                } else {
                    Indicator::Dir
                }
            }
            FileType::Symlink => Indicator::Link,
            FileType::Fifo => Indicator::Fifo,
            FileType::Socket => Indicator::Sock,
            FileType::BlockDevice => Indicator::Blk,
            FileType::CharDevice => Indicator::Chr,
            _ => Indicator::Orphan,
        }
    }

    /// Bytes that start a colored name.
    pub fn open(&self, seq: &[u8]) -> Vec<u8> {
        let mut out = self.sequence(Indicator::Left).to_vec();
        out.extend_from_slice(seq);
        out.extend_from_slice(self.sequence(Indicator::Right));
        out
    }

    /// Bytes that end a colored name.
    pub fn close(&self) -> Vec<u8> {
        let end = self.sequence(Indicator::End);
        if !end.is_empty() {
            return end.to_vec();
        }
        self.open(self.sequence(Indicator::Reset))
    }

    /// Bytes that bring the terminal back to its default style.
    pub fn restore(&self) -> Vec<u8> {
        let mut out = self.sequence(Indicator::Left).to_vec();
        out.extend_from_slice(self.sequence(Indicator::Right));
        out
    }

    /// True when [`ColorTable::restore`] would be a no-op after a normal run.
    pub fn restore_is_default(&self) -> bool {
        self.sequence(Indicator::Left) == b"\x1b[" && self.sequence(Indicator::Right) == b"m"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Status;

    fn regular(name: &str, mode: u32) -> FileEntry {
        let mut entry = FileEntry::new(name, FileType::Regular, None);
        entry.status = Some(Status {
            mode,
            size: 0,
            blocks: 0,
            nlink: 1,
            uid: 0,
            gid: 0,
            dev: 1,
            ino: 1,
            rdev: 0,
            atime: Default::default(),
            mtime: Default::default(),
            ctime: Default::default(),
            btime: None,
        });
        entry
    }

    #[test]
    fn test_parse_categories_and_extensions() {
        let table = parse(b"di=01;34:ln=01;36:*.tar=01;31:*.gz=01;31").unwrap();
        assert_eq!(table.sequence(Indicator::Dir), b"01;34");
        assert_eq!(table.extensions().count(), 2);
        assert!(!table.symlink_as_referent);
    }

    #[test]
    fn test_escapes_decode() {
        let table = parse(b"lc=\\e[:rc=\\x6d:ec=^[[0m:fi=\\101\\_").unwrap();
        assert_eq!(table.sequence(Indicator::Left), b"\x1b[");
        assert_eq!(table.sequence(Indicator::Right), b"m");
        assert_eq!(table.sequence(Indicator::End), b"\x1b[0m");
        assert_eq!(table.sequence(Indicator::File), b"A ");
    }

    #[test]
    fn test_extension_value_keeps_equals() {
        let table = parse(b"*.x=a=b").unwrap();
        let ext = table.extensions().next().unwrap();
        assert_eq!(ext.ext, b".x");
        assert_eq!(ext.seq, b"a=b");
    }

    #[test]
    fn test_malformed_escape_rejects_everything() {
        assert_eq!(parse(b"di=01;34:fi=\\q"), Err(ColorSpecError::BadEscape(14)));
        assert!(parse(b"di=^!").is_err());
        assert!(parse(b"di=abc\\").is_err());
        assert!(parse(b"zz=01").is_err());
        assert!(parse(b"di").is_err());
    }

    #[test]
    fn test_symlink_target_mode() {
        let table = parse(b"ln=target").unwrap();
        assert!(table.symlink_as_referent);
    }

    #[test]
    fn test_case_insensitive_duplicates() {
        // Same sequence: the older definition is shadowed.
        let table = parse(b"*.jpg=35:*.JPG=35").unwrap();
        assert_eq!(table.extensions().count(), 1);
        assert!(!table.extensions().any(|e| e.exact_match));

        // Different sequences: both are kept and require an exact match.
        let table = parse(b"*.jpg=35:*.JPG=36").unwrap();
        let kept: Vec<_> = table.extensions().collect();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|e| e.exact_match));

        let upper = regular("PHOTO.JPG", 0o100644);
        assert_eq!(table.sequence_for(&upper, false), Some(&b"36"[..]));
        let lower = regular("photo.jpg", 0o100644);
        assert_eq!(table.sequence_for(&lower, false), Some(&b"35"[..]));
    }

    #[test]
    fn test_exact_duplicate_later_wins() {
        let table = parse(b"*.md=31:*.md=32").unwrap();
        let entry = regular("README.md", 0o100644);
        assert_eq!(table.sequence_for(&entry, false), Some(&b"32"[..]));
    }

    #[test]
    fn test_mode_bits_select_category() {
        let table = ColorTable::default();
        assert_eq!(
            table.sequence_for(&regular("run.sh", 0o100755), false),
            Some(&b"01;32"[..])
        );
        assert_eq!(
            table.sequence_for(&regular("su", 0o104755), false),
            Some(&b"37;41"[..])
        );
        assert_eq!(table.sequence_for(&regular("plain", 0o100644), false), None);
    }

    #[test]
    fn test_close_prefers_end_sequence() {
        let table = ColorTable::default();
        assert_eq!(table.close(), b"\x1b[0m");
        let table = parse(b"ec=X").unwrap();
        assert_eq!(table.close(), b"X");
    }
}
