//! Long (`-l`) format.

use std::fmt::Write as _;
use std::io::Write;
use unicode_width::UnicodeWidthStr;

use super::{ListingView, Renderer};
use crate::config::TimeKind;
use crate::data::{AclState, FileEntry, FileType, Status, Timestamp};
use crate::error::ListError;
use crate::utils::{format_in_units, major, minor};

const S_ISUID: u32 = 0o4000;
const S_ISGID: u32 = 0o2000;
const S_ISVTX: u32 = 0o1000;

/// Ten-character mode string such as `drwxr-xr-x`.
pub fn mode_string(file_type: FileType, mode: u32) -> String {
    let bit = |mask: u32, c: char| if mode & mask != 0 { c } else { '-' };
    let special = |exec: u32, flag: u32, set: char, unset: char| {
        match (mode & exec != 0, mode & flag != 0) {
            (true, true) => set,
            (false, true) => unset,
            (true, false) => 'x',
            (false, false) => '-',
        }
    };
    let mut s = String::with_capacity(10);
    s.push(file_type.mode_char());
    s.push(bit(0o400, 'r'));
    s.push(bit(0o200, 'w'));
    s.push(special(0o100, S_ISUID, 's', 'S'));
    s.push(bit(0o040, 'r'));
    s.push(bit(0o020, 'w'));
    s.push(special(0o010, S_ISGID, 's', 'S'));
    s.push(bit(0o004, 'r'));
    s.push(bit(0o002, 'w'));
    s.push(special(0o001, S_ISVTX, 't', 'T'));
    s
}

fn timestamp(status: &Status, kind: TimeKind) -> Option<Timestamp> {
    match kind {
        TimeKind::Mtime => Some(status.mtime),
        TimeKind::Ctime => Some(status.ctime),
        TimeKind::Atime => Some(status.atime),
        TimeKind::Btime => status.btime,
    }
}

/// Pads a user or group field: names to the left, numbers to the right.
fn push_id(line: &mut String, text: &str, width: usize) {
    let gap = width.saturating_sub(UnicodeWidthStr::width(text));
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        let _ = write!(line, "{:gap$}{text} ", "");
    } else {
        let _ = write!(line, "{text}{:gap$} ", "");
    }
}

/// Everything before the name.
fn prefix(
    r: &Renderer,
    entry: &FileEntry,
    view: &ListingView<'_>,
    time: &str,
    time_width: usize,
) -> String {
    let w = view.widths;
    let mut line = String::new();

    if r.print_inode {
        let _ = write!(line, "{:>width$} ", Renderer::inode_text(entry), width = w.inode);
    }
    if r.print_block_size {
        let _ = write!(line, "{:>width$} ", r.blocks_text(entry), width = w.block_size);
    }

    let Some(st) = entry.status.as_ref() else {
        line.push(entry.file_type.mode_char());
        line.push_str(if view.any_has_acl { "?????????? " } else { "????????? " });
        let _ = write!(line, "{:>width$} ", "?", width = w.nlink);
        if r.print_owner {
            push_id(&mut line, "?", w.owner);
        }
        if r.print_group {
            push_id(&mut line, "?", w.group);
        }
        if r.print_author {
            push_id(&mut line, "?", w.author);
        }
        if r.print_scontext {
            push_id(&mut line, entry.security_context.as_display(), w.scontext);
        }
        let _ = write!(line, "{:>width$} ", "?", width = w.file_size);
        let _ = write!(line, "{:>time_width$} ", "?");
        return line;
    };

    line.push_str(&mode_string(entry.file_type, st.mode));
    if view.any_has_acl {
        line.push(match entry.acl_state {
            AclState::Present => '+',
            AclState::ContextOnly => '.',
            AclState::None | AclState::Unknown => ' ',
        });
    }
    let _ = write!(line, " {:>width$} ", st.nlink, width = w.nlink);

    let owner = entry.owner.clone().unwrap_or_else(|| st.uid.to_string());
    if r.print_owner {
        push_id(&mut line, &owner, w.owner);
    }
    if r.print_group {
        let group = entry.group.clone().unwrap_or_else(|| st.gid.to_string());
        push_id(&mut line, &group, w.group);
    }
    if r.print_author {
        push_id(&mut line, &owner, w.author);
    }
    if r.print_scontext {
        push_id(&mut line, entry.security_context.as_display(), w.scontext);
    }

    let ft = st.file_type();
    if ft == FileType::CharDevice || ft == FileType::BlockDevice {
        let blanks = w.file_size.saturating_sub(w.major + 2 + w.minor);
        let _ = write!(
            line,
            "{:>mw$}, {:>nw$} ",
            major(st.rdev),
            minor(st.rdev),
            mw = w.major + blanks,
            nw = w.minor
        );
    } else {
        let size = format_in_units(st.size, r.file_block_size);
        let _ = write!(line, "{size:>width$} ", width = w.file_size);
    }

    let _ = write!(line, "{time:>time_width$} ");
    line
}

/// Writes one line per entry.
pub fn write_long<W: Write + ?Sized>(
    r: &mut Renderer,
    out: &mut W,
    view: &ListingView<'_>,
) -> Result<(), ListError> {
    let times: Vec<String> = view
        .entries
        .iter()
        .map(|e| {
            e.status
                .as_ref()
                .and_then(|st| timestamp(st, r.time_kind))
                .map_or_else(|| "?".to_string(), |t| r.time.format(t))
        })
        .collect();
    let time_width = times
        .iter()
        .map(|t| UnicodeWidthStr::width(t.as_str()))
        .max()
        .unwrap_or(1);

    for (entry, time) in view.entries.iter().zip(&times) {
        r.checkpoint(out)?;
        let head = prefix(r, entry, view, time, time_width);
        out.write_all(head.as_bytes())?;
        let col = UnicodeWidthStr::width(head.as_str());
        r.write_name(out, entry, false, view.align_quotes, col)?;

        if entry.file_type == FileType::Symlink && entry.link_target.is_some() {
            out.write_all(b" -> ")?;
            r.write_name(out, entry, true, false, col)?;
            r.write_target_indicator(out, entry)?;
        } else if let Some(c) = r.entry_indicator(entry) {
            write!(out, "{c}")?;
        }
        out.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnWidths;
    use crate::config::{Config, Format, IndicatorStyle};
    use crate::timefmt::{TimeStyle, Zone};
    use std::path::PathBuf;

    fn status(mode: u32, size: u64) -> Status {
        Status {
            mode,
            size,
            blocks: 8,
            nlink: 2,
            uid: 1000,
            gid: 100,
            dev: 1,
            ino: 5,
            rdev: 0,
            atime: Timestamp::default(),
            mtime: Timestamp::new(1_577_836_800, 0),
            ctime: Timestamp::default(),
            btime: None,
        }
    }

    fn config() -> Config {
        Config {
            format: Format::Long,
            time_style: TimeStyle::LongIso,
            zone: Zone::Utc,
            ..Config::default()
        }
    }

    fn render(
        config: &Config,
        entries: &[FileEntry],
        widths: ColumnWidths,
        any_has_acl: bool,
    ) -> String {
        let mut renderer = Renderer::new(config, Timestamp::new(1_718_452_800, 0));
        let view = ListingView {
            entries,
            widths: &widths,
            any_has_acl,
            align_quotes: false,
        };
        let mut out = Vec::new();
        write_long(&mut renderer, &mut out, &view).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_mode_strings() {
        assert_eq!(mode_string(FileType::Directory, 0o040755), "drwxr-xr-x");
        assert_eq!(mode_string(FileType::Regular, 0o104755), "-rwsr-xr-x");
        assert_eq!(mode_string(FileType::Regular, 0o102644), "-rw-r-Sr--");
        assert_eq!(mode_string(FileType::Directory, 0o041777), "drwxrwxrwt");
        assert_eq!(mode_string(FileType::Directory, 0o041776), "drwxrwxrwT");
    }

    #[test]
    fn test_regular_line() {
        let mut entry = FileEntry::new("notes.txt", FileType::Regular, None);
        entry.status = Some(status(0o100644, 1234));
        entry.owner = Some("alice".to_string());
        entry.group = Some("users".to_string());
        let widths = ColumnWidths {
            nlink: 1,
            owner: 5,
            group: 5,
            file_size: 6,
            ..ColumnWidths::default()
        };
        let text = render(&config(), &[entry], widths, false);
        assert_eq!(text, "-rw-r--r-- 2 alice users   1234 2020-01-01 00:00 notes.txt\n");
    }

    #[test]
    fn test_symlink_line_shows_target() {
        let mut entry = FileEntry::new("ln", FileType::Symlink, None);
        entry.status = Some(status(0o120777, 3));
        entry.owner = Some("1000".to_string());
        entry.group = Some("100".to_string());
        entry.link_target = Some(PathBuf::from("dir"));
        entry.link_mode = Some(0o040755);
        let widths = ColumnWidths {
            nlink: 1,
            owner: 4,
            group: 4,
            file_size: 1,
            ..ColumnWidths::default()
        };
        let config = Config {
            indicator_style: IndicatorStyle::Classify,
            ..config()
        };
        let text = render(&config, &[entry], widths, false);
        assert_eq!(text, "lrwxrwxrwx 2 1000  100 3 2020-01-01 00:00 ln -> dir/\n");
    }

    #[test]
    fn test_failed_probe_renders_placeholders() {
        let entry = FileEntry::new("ghost", FileType::Regular, None);
        let widths = ColumnWidths {
            nlink: 1,
            owner: 1,
            group: 1,
            file_size: 1,
            ..ColumnWidths::default()
        };
        let text = render(&config(), &[entry], widths, false);
        assert_eq!(text, "-????????? ? ? ? ? ? ghost\n");
    }

    #[test]
    fn test_device_and_acl_columns() {
        let mut entry = FileEntry::new("sda", FileType::BlockDevice, None);
        let mut st = status(0o060660, 0);
        st.rdev = (8 << 8) | 1;
        entry.status = Some(st);
        entry.owner = Some("root".to_string());
        entry.group = Some("disk".to_string());
        entry.acl_state = AclState::Present;
        let widths = ColumnWidths {
            nlink: 1,
            owner: 4,
            group: 4,
            major: 1,
            minor: 1,
            file_size: 4,
            ..ColumnWidths::default()
        };
        let text = render(&config(), &[entry], widths, true);
        assert_eq!(text, "brw-rw----+ 2 root disk 8, 1 2020-01-01 00:00 sda\n");
    }
}
