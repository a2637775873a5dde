//! Short formats: one per line, grid (`-C`), horizontal (`-x`) and
//! comma-separated (`-m`).

use std::io::Write;

use super::{ListingView, Renderer};
use crate::error::ListError;
use crate::layout::{Fill, choose_columns, comma_breaks, indent};

pub fn write_one_per_line<W: Write + ?Sized>(
    r: &mut Renderer,
    out: &mut W,
    view: &ListingView<'_>,
) -> Result<(), ListError> {
    for entry in view.entries {
        r.checkpoint(out)?;
        r.write_name_and_frills(out, entry, view, 0)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

fn frill_widths(r: &Renderer, view: &ListingView<'_>) -> Vec<usize> {
    view.entries.iter().map(|e| r.frills_width(e, view)).collect()
}

/// Columns filled top to bottom.
pub fn write_grid<W: Write + ?Sized>(
    r: &mut Renderer,
    out: &mut W,
    view: &ListingView<'_>,
) -> Result<(), ListError> {
    write_cells(r, out, view, Fill::DownThenAcross)
}

/// Rows filled left to right.
pub fn write_horizontal<W: Write + ?Sized>(
    r: &mut Renderer,
    out: &mut W,
    view: &ListingView<'_>,
) -> Result<(), ListError> {
    write_cells(r, out, view, Fill::AcrossThenDown)
}

fn write_cells<W: Write + ?Sized>(
    r: &mut Renderer,
    out: &mut W,
    view: &ListingView<'_>,
    fill: Fill,
) -> Result<(), ListError> {
    if view.entries.is_empty() {
        return Ok(());
    }
    let widths = frill_widths(r, view);
    let budget = *r.budget();
    let plan = choose_columns(&widths, &budget, fill);
    log::trace!("{} entries in {} columns", widths.len(), plan.columns);

    let mut pad = Vec::new();
    for row in plan.rows_of(widths.len(), fill) {
        r.checkpoint(out)?;
        let mut pos = 0;
        let last = row.len().saturating_sub(1);
        for (col, &i) in row.iter().enumerate() {
            r.write_name_and_frills(out, &view.entries[i], view, pos)?;
            if col == last {
                break;
            }
            let allotted = plan.widths[col];
            pad.clear();
            indent(pos + widths[i], pos + allotted, budget.tab_size, &mut pad);
            out.write_all(&pad)?;
            pos += allotted;
        }
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Comma-separated names wrapped at the line budget.
pub fn write_commas<W: Write + ?Sized>(
    r: &mut Renderer,
    out: &mut W,
    view: &ListingView<'_>,
) -> Result<(), ListError> {
    if view.entries.is_empty() {
        return Ok(());
    }
    let line_length = r.budget().line_length;
    let widths: Vec<usize> = if line_length == 0 {
        vec![0; view.entries.len()]
    } else {
        frill_widths(r, view)
    };
    let breaks = comma_breaks(&widths, line_length);

    let mut pos = 0;
    for (i, entry) in view.entries.iter().enumerate() {
        r.checkpoint(out)?;
        if i > 0 {
            if breaks[i] {
                out.write_all(b",\n")?;
                pos = 0;
            } else {
                out.write_all(b", ")?;
                pos += 2;
            }
        }
        r.write_name_and_frills(out, entry, view, pos)?;
        pos += widths[i];
    }
    out.write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnWidths;
    use crate::config::{Config, Format};
    use crate::data::{FileEntry, FileType, Timestamp};
    use crate::layout::LayoutBudget;

    fn names(list: &[&str]) -> Vec<FileEntry> {
        list.iter()
            .map(|n| FileEntry::new(*n, FileType::Regular, None))
            .collect()
    }

    fn render(
        format: Format,
        line_length: usize,
        tab_size: usize,
        entries: &[FileEntry],
    ) -> String {
        let config = Config {
            format,
            layout: LayoutBudget::new(line_length, tab_size),
            ..Config::default()
        };
        let mut renderer = Renderer::new(&config, Timestamp::default());
        let widths = ColumnWidths::default();
        let view = ListingView {
            entries,
            widths: &widths,
            any_has_acl: false,
            align_quotes: false,
        };
        let mut out = Vec::new();
        renderer.render(&mut out, &view).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_one_per_line() {
        let entries = names(&["a", "b c"]);
        assert_eq!(render(Format::OnePerLine, 80, 8, &entries), "a\nb c\n");
    }

    #[test]
    fn test_grid_goes_down_then_across() {
        let entries = names(&["one", "two", "three", "four", "five"]);
        let text = render(Format::Vertical, 14, 0, &entries);
        assert_eq!(text, "one    four\ntwo    five\nthree\n");
    }

    #[test]
    fn test_horizontal_goes_across_then_down() {
        let entries = names(&["one", "two", "three", "four", "five"]);
        let text = render(Format::Horizontal, 14, 0, &entries);
        assert_eq!(text, "one    two\nthree  four\nfive\n");
    }

    #[test]
    fn test_grid_uses_tabs_when_enabled() {
        let entries = names(&["alpha", "b"]);
        let text = render(Format::Vertical, 80, 8, &entries);
        assert_eq!(text, "alpha  b\n");
        let entries = names(&["a", "bbbbbbbbb", "c", "d"]);
        let text = render(Format::Vertical, 16, 4, &entries);
        assert_eq!(text, "a\t\t   c\nbbbbbbbbb  d\n");
    }

    #[test]
    fn test_commas_wrap() {
        let entries = names(&["aaaa", "bbbb", "cccc"]);
        assert_eq!(render(Format::Commas, 15, 8, &entries), "aaaa, bbbb,\ncccc\n");
        assert_eq!(render(Format::Commas, 0, 8, &entries), "aaaa, bbbb, cccc\n");
    }
}
