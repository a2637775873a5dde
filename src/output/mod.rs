//! Rendering of a sorted listing.
//!
//! [`Renderer`] holds the display settings of a run and writes names with
//! their frills: inode, block count, security context, color, hyperlink and
//! type indicator. The layouts live in submodules:
//!
//! - [`long`]: the `-l` format
//! - [`columns`]: one-per-line, grid, horizontal and comma-separated output

pub mod columns;
pub mod long;

use std::io::Write;
use std::path::Path;
use unicode_width::UnicodeWidthStr;

use crate::cancel::CancelToken;
use crate::catalog::ColumnWidths;
use crate::color::{ColorTable, Indicator};
use crate::config::{Config, Format, IndicatorStyle, TimeKind};
use crate::data::{FileEntry, FileType, Timestamp, Tristate};
use crate::error::ListError;
use crate::layout::LayoutBudget;
use crate::quote::Quoter;
use crate::timefmt::TimeFormatter;
use crate::utils::{BlockSize, format_in_units, host_name};

const S_IXUGO: u32 = 0o111;

/// One directory's worth of entries, ready to render.
#[derive(Debug, Clone, Copy)]
pub struct ListingView<'a> {
    pub entries: &'a [FileEntry],
    pub widths: &'a ColumnWidths,
    /// Some entry carries an ACL or context marker.
    pub any_has_acl: bool,
    /// Unquoted names get a leading space to line up with quoted ones.
    pub align_quotes: bool,
}

/// Display settings plus the state that outlives one directory.
pub struct Renderer {
    format: Format,
    quoter: Quoter,
    color: Option<ColorTable>,
    indicator_style: IndicatorStyle,
    /// `file://` authority for hyperlinks; `None` disables them.
    hyperlink_host: Option<String>,
    time: TimeFormatter,
    time_kind: TimeKind,
    print_inode: bool,
    print_block_size: bool,
    print_owner: bool,
    print_group: bool,
    print_author: bool,
    print_scontext: bool,
    block_size: BlockSize,
    file_block_size: BlockSize,
    budget: LayoutBudget,
    cancel: CancelToken,
    used_color: bool,
}

impl Renderer {
    pub fn new(config: &Config, now: Timestamp) -> Self {
        Renderer {
            format: config.format,
            quoter: config.quoting,
            color: config.color.clone(),
            indicator_style: config.indicator_style,
            hyperlink_host: config.hyperlink.then(host_name),
            time: TimeFormatter::new(config.time_style.clone(), config.zone, now),
            time_kind: config.sort.time_subkey,
            print_inode: config.print_inode,
            print_block_size: config.print_block_size,
            print_owner: config.print_owner,
            print_group: config.print_group,
            print_author: config.print_author,
            print_scontext: config.print_scontext,
            block_size: config.block_size,
            file_block_size: config.file_block_size,
            budget: config.layout,
            cancel: CancelToken::inert(),
            used_color: false,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel(&self) -> CancelToken {
        self.cancel
    }

    pub fn budget(&self) -> &LayoutBudget {
        &self.budget
    }

    /// Bytes that reset the terminal style, or nothing if no color was used.
    pub fn restore_sequence(&self) -> Vec<u8> {
        match &self.color {
            Some(table) if self.used_color => table.restore(),
            _ => Vec::new(),
        }
    }

    /// Bytes written once the whole run is done: the restore sequence, but
    /// only when color was used and the table's reset differs from `\e[m`.
    pub fn closing_sequence(&self) -> Vec<u8> {
        match &self.color {
            Some(table) if self.used_color && !table.restore_is_default() => table.restore(),
            _ => Vec::new(),
        }
    }

    /// Honors a pending cancellation request.
    pub fn checkpoint<W: Write + ?Sized>(&self, out: &mut W) -> Result<(), ListError> {
        self.cancel.checkpoint(out, &self.restore_sequence())
    }

    /// Width of the quoted name, including the alignment space if any.
    pub fn name_width(&self, entry: &FileEntry, align_quotes: bool) -> usize {
        let width = self.quoter.width(&entry.name);
        width + usize::from(self.pads(entry, align_quotes))
    }

    fn pads(&self, entry: &FileEntry, align_quotes: bool) -> bool {
        if !align_quotes {
            return false;
        }
        match entry.needs_quoting {
            Tristate::Yes => false,
            Tristate::No => true,
            Tristate::Unknown => !self.quoter.needs_quoting(&entry.name),
        }
    }

    fn inode_text(entry: &FileEntry) -> String {
        entry.inode().map_or_else(|| "?".to_string(), |i| i.to_string())
    }

    fn blocks_text(&self, entry: &FileEntry) -> String {
        match entry.status.as_ref() {
            Some(st) => format_in_units(st.blocks.saturating_mul(512), self.block_size),
            None => "?".to_string(),
        }
    }

    /// Total for a `total N` line.
    pub fn total_text(&self, blocks: u64) -> String {
        format_in_units(blocks.saturating_mul(512), self.block_size)
    }

    /// Type indicator character for a mode (or type tag when unprobed).
    fn type_indicator(&self, mode: Option<u32>, file_type: FileType) -> Option<char> {
        if self.indicator_style == IndicatorStyle::None {
            return None;
        }
        let ft = match mode {
            Some(m) => FileType::from_mode(m),
            None => file_type,
        };
        match ft {
            FileType::Regular => {
                let exec = mode.is_some_and(|m| m & S_IXUGO != 0);
                (self.indicator_style == IndicatorStyle::Classify && exec).then_some('*')
            }
            FileType::Directory | FileType::ArgDirectory => Some('/'),
            _ if self.indicator_style == IndicatorStyle::Slash => None,
            FileType::Symlink => Some('@'),
            FileType::Fifo => Some('|'),
            FileType::Socket => Some('='),
            _ => None,
        }
    }

    fn entry_indicator(&self, entry: &FileEntry) -> Option<char> {
        self.type_indicator(entry.status.as_ref().map(|s| s.mode), entry.file_type)
    }

    /// Width taken by [`Renderer::write_name_and_frills`].
    ///
    /// Comma-separated output does not pad the inode, block and context
    /// fields, so their natural widths are used there.
    pub fn frills_width(&self, entry: &FileEntry, view: &ListingView<'_>) -> usize {
        let commas = self.format == Format::Commas;
        let mut len = 0;
        if self.print_inode {
            len += 1 + if commas {
                Self::inode_text(entry).len()
            } else {
                view.widths.inode
            };
        }
        if self.print_block_size {
            len += 1 + if commas {
                self.blocks_text(entry).len()
            } else {
                view.widths.block_size
            };
        }
        if self.print_scontext {
            len += 1 + if commas {
                UnicodeWidthStr::width(entry.security_context.as_display())
            } else {
                view.widths.scontext
            };
        }
        len += self.name_width(entry, view.align_quotes);
        len + usize::from(self.entry_indicator(entry).is_some())
    }

    /// Writes the prefix fields, the name and the indicator of a
    /// non-long listing; returns the width written.
    pub fn write_name_and_frills<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        entry: &FileEntry,
        view: &ListingView<'_>,
        start_col: usize,
    ) -> Result<usize, ListError> {
        let commas = self.format == Format::Commas;
        let mut col = start_col;
        if self.print_inode {
            let width = if commas { 0 } else { view.widths.inode };
            let text = format!("{:>width$} ", Self::inode_text(entry));
            col += text.len();
            out.write_all(text.as_bytes())?;
        }
        if self.print_block_size {
            let width = if commas { 0 } else { view.widths.block_size };
            let text = format!("{:>width$} ", self.blocks_text(entry));
            col += text.len();
            out.write_all(text.as_bytes())?;
        }
        if self.print_scontext {
            let width = if commas { 0 } else { view.widths.scontext };
            let text = format!("{:>width$} ", entry.security_context.as_display());
            col += UnicodeWidthStr::width(text.as_str());
            out.write_all(text.as_bytes())?;
        }
        let mut width = self.write_name(out, entry, false, view.align_quotes, col)?;
        if let Some(c) = self.entry_indicator(entry) {
            write!(out, "{c}")?;
            width += 1;
        }
        Ok(col - start_col + width)
    }

    /// Writes a quoted, possibly colored and hyperlinked name: the entry's
    /// own, or its symlink target when `target` is set. Returns its width.
    pub fn write_name<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        entry: &FileEntry,
        target: bool,
        align_quotes: bool,
        start_col: usize,
    ) -> Result<usize, ListError> {
        let (text, pad) = if target {
            let name = entry
                .link_target
                .as_deref()
                .unwrap_or_else(|| Path::new(""));
            (self.quoter.quote(name.as_os_str()), false)
        } else {
            (self.quoter.quote(&entry.name), self.pads(entry, align_quotes))
        };
        let width = UnicodeWidthStr::width(text.as_str()) + usize::from(pad);

        if pad {
            out.write_all(b" ")?;
        }

        let color = self.color.as_ref().and_then(|table| {
            let seq = table.sequence_for(entry, target).or_else(|| {
                table
                    .is_colored(Indicator::Normal)
                    .then(|| table.sequence(Indicator::Normal))
            })?;
            Some((table.open(seq), table.close(), table.sequence(Indicator::ClrToEol).to_vec()))
        });
        if let Some((open, _, _)) = &color {
            out.write_all(open)?;
            self.used_color = true;
        }

        let link = if target {
            None
        } else {
            self.hyperlink(entry)
        };
        if let Some(url) = &link {
            write!(out, "\x1b]8;;{url}\x1b\\")?;
        }
        out.write_all(text.as_bytes())?;
        if link.is_some() {
            out.write_all(b"\x1b]8;;\x1b\\")?;
        }

        if let Some((_, close, clear_to_eol)) = &color {
            out.write_all(close)?;
            let line = self.budget.line_length;
            if line > 0 && width > 0 && start_col / line != (start_col + width - 1) / line {
                out.write_all(clear_to_eol)?;
            }
        }
        Ok(width)
    }

    fn hyperlink(&self, entry: &FileEntry) -> Option<String> {
        let host = self.hyperlink_host.as_ref()?;
        let path = entry.absolute_path.as_ref()?;
        let mut url = url::Url::from_file_path(path).ok()?;
        if !host.is_empty() && url.set_host(Some(host)).is_err() {
            log::debug!("host name {host:?} rejected in file URL");
        }
        Some(url.to_string())
    }

    /// Writes the indicator for a symlink referent in long format.
    fn write_target_indicator<W: Write + ?Sized>(
        &self,
        out: &mut W,
        entry: &FileEntry,
    ) -> Result<(), ListError> {
        let indicator = entry
            .link_mode
            .and_then(|mode| self.type_indicator(Some(mode), FileType::Unknown));
        if let Some(c) = indicator {
            write!(out, "{c}")?;
        }
        Ok(())
    }

    /// Writes one directory's entries in the configured format.
    pub fn render<W: Write + ?Sized>(
        &mut self,
        out: &mut W,
        view: &ListingView<'_>,
    ) -> Result<(), ListError> {
        match self.format {
            Format::Long => long::write_long(self, out, view),
            Format::OnePerLine => columns::write_one_per_line(self, out, view),
            Format::Vertical => columns::write_grid(self, out, view),
            Format::Horizontal => columns::write_horizontal(self, out, view),
            Format::Commas => columns::write_commas(self, out, view),
        }
    }
}
