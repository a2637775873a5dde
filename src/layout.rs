//! Column layout for grid, horizontal and comma-separated output.
//!
//! Everything here works on display widths alone; the writers in
//! [`crate::output`] turn the resulting plans into bytes.

/// Narrowest possible column: one name column plus a two-column separator.
pub const MIN_COLUMN_WIDTH: usize = 3;

/// Width budget for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutBudget {
    /// Line width in columns; 0 means unbounded.
    pub line_length: usize,
    /// Tab stop size; 0 pads with spaces only.
    pub tab_size: usize,
}

impl LayoutBudget {
    pub fn new(line_length: usize, tab_size: usize) -> Self {
        Self { line_length, tab_size }
    }

    /// Upper bound on the column count for any set of names.
    pub fn max_columns(&self) -> usize {
        if self.line_length == 0 {
            usize::MAX
        } else {
            (self.line_length / MIN_COLUMN_WIDTH).max(1)
        }
    }
}

/// How entries are assigned to grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Fill each column top to bottom, then move right (`-C`).
    DownThenAcross,
    /// Fill each row left to right, then move down (`-x`).
    AcrossThenDown,
}

impl Fill {
    /// Column of entry `i` when `n` entries are laid out in `cols` columns.
    fn column_of(self, i: usize, n: usize, cols: usize) -> usize {
        match self {
            Fill::DownThenAcross => i / n.div_ceil(cols),
            Fill::AcrossThenDown => i % cols,
        }
    }
}

/// Chosen grid shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub columns: usize,
    pub rows: usize,
    /// Allotted width of each column, separator included.
    pub widths: Vec<usize>,
}

/// Per-candidate running state.
struct Candidate {
    valid: bool,
    line_len: usize,
    widths: Vec<usize>,
}

/// Picks the largest column count whose total width stays strictly below the
/// line budget.
///
/// Every candidate starts with all columns at [`MIN_COLUMN_WIDTH`]. Column
/// widths only grow as entries are folded in, so a candidate that reaches
/// the budget is never reconsidered. Returns a single column when nothing
/// else fits.
///
/// # Arguments
/// * `widths` - Display width of each entry, in display order
/// * `budget` - Line width and tab settings
/// * `fill` - Cell assignment order
pub fn choose_columns(widths: &[usize], budget: &LayoutBudget, fill: Fill) -> ColumnPlan {
    let n = widths.len();
    if n == 0 {
        return ColumnPlan {
            columns: 1,
            rows: 0,
            widths: vec![0],
        };
    }
    if budget.line_length == 0 {
        // every entry gets its own column on a single row
        let widths = widths
            .iter()
            .enumerate()
            .map(|(i, &w)| MIN_COLUMN_WIDTH.max(if i + 1 == n { w } else { w + 2 }))
            .collect();
        return ColumnPlan {
            columns: n,
            rows: 1,
            widths,
        };
    }
    let max_cols = budget.max_columns().min(n);

    let mut candidates: Vec<Candidate> = (1..=max_cols)
        .map(|cols| {
            let line_len = cols * MIN_COLUMN_WIDTH;
            Candidate {
                valid: line_len < budget.line_length,
                line_len,
                widths: vec![MIN_COLUMN_WIDTH; cols],
            }
        })
        .collect();

    for (i, &width) in widths.iter().enumerate() {
        for (c, cand) in candidates.iter_mut().enumerate() {
            if !cand.valid {
                continue;
            }
            let cols = c + 1;
            let idx = fill.column_of(i, n, cols);
            let real = width + if idx == c { 0 } else { 2 };
            if cand.widths[idx] < real {
                cand.line_len += real - cand.widths[idx];
                cand.widths[idx] = real;
                cand.valid = cand.line_len < budget.line_length;
            }
        }
    }

    let chosen = (1..=max_cols)
        .rev()
        .find(|&cols| candidates[cols - 1].valid)
        .unwrap_or(1);
    let widths = std::mem::take(&mut candidates[chosen - 1].widths);
    ColumnPlan {
        columns: chosen,
        rows: n.div_ceil(chosen),
        widths,
    }
}

impl ColumnPlan {
    /// Entry indices for each output row, in print order.
    pub fn rows_of(&self, n: usize, fill: Fill) -> Vec<Vec<usize>> {
        let mut rows = vec![Vec::with_capacity(self.columns); self.rows];
        match fill {
            Fill::DownThenAcross => {
                for i in 0..n {
                    rows[i % self.rows].push(i);
                }
            }
            Fill::AcrossThenDown => {
                for i in 0..n {
                    rows[i / self.columns].push(i);
                }
            }
        }
        rows
    }
}

/// Appends the whitespace that moves the cursor from column `from` to `to`,
/// using tabs where a tab stop lies in between.
pub fn indent(mut from: usize, to: usize, tab_size: usize, out: &mut Vec<u8>) {
    while from < to {
        if tab_size != 0 && to / tab_size > (from + 1) / tab_size {
            out.push(b'\t');
            from += tab_size - from % tab_size;
        } else {
            out.push(b' ');
            from += 1;
        }
    }
}

/// For comma-separated output: whether a line break (instead of a space)
/// follows the separator before each entry.
pub fn comma_breaks(widths: &[usize], line_length: usize) -> Vec<bool> {
    let mut breaks = Vec::with_capacity(widths.len());
    let mut pos = 0;
    for (i, &len) in widths.iter().enumerate() {
        if i == 0 {
            breaks.push(false);
        } else if line_length == 0 || pos + len + 2 < line_length {
            pos += 2;
            breaks.push(false);
        } else {
            pos = 0;
            breaks.push(true);
        }
        pos += len;
    }
    breaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(widths: &[usize], line_length: usize) -> usize {
        choose_columns(widths, &LayoutBudget::new(line_length, 8), Fill::DownThenAcross).columns
    }

    #[test]
    fn test_budget_is_strict_upper_bound() {
        // 10 columns of 3 would be exactly 30, which does not fit
        let widths = [1usize; 20];
        assert_eq!(cols(&widths, 30), 9);
        assert_eq!(cols(&widths, 31), 10);
    }

    #[test]
    fn test_shrinking_budget_never_adds_columns() {
        let widths = [4usize, 12, 7, 1, 9, 3, 15, 2, 8, 8, 5, 11, 6];
        let mut previous = usize::MAX;
        for line_length in (1..=120).rev() {
            let c = cols(&widths, line_length);
            assert!(c <= previous, "width {line_length}: {c} > {previous}");
            previous = c;
        }
        assert_eq!(cols(&widths, 1), 1);
    }

    #[test]
    fn test_plan_widths_include_separator() {
        let plan = choose_columns(&[3, 5, 2, 4], &LayoutBudget::new(80, 8), Fill::DownThenAcross);
        assert_eq!(plan.columns, 4);
        assert_eq!(plan.rows, 1);
        assert_eq!(plan.widths, vec![5, 7, 4, 4]);
    }

    #[test]
    fn test_down_then_across_rows() {
        let plan = choose_columns(&[5; 5], &LayoutBudget::new(18, 8), Fill::DownThenAcross);
        assert_eq!(plan.columns, 2);
        assert_eq!(plan.rows_of(5, Fill::DownThenAcross), vec![vec![0, 3], vec![1, 4], vec![2]]);
        let wider = choose_columns(&[5; 5], &LayoutBudget::new(20, 8), Fill::DownThenAcross);
        assert_eq!(wider.columns, 3);
        assert_eq!(wider.rows_of(5, Fill::DownThenAcross), vec![vec![0, 2, 4], vec![1, 3]]);
    }

    #[test]
    fn test_across_then_down_rows() {
        let plan = choose_columns(&[5; 5], &LayoutBudget::new(18, 8), Fill::AcrossThenDown);
        assert_eq!(plan.columns, 2);
        assert_eq!(plan.rows_of(5, Fill::AcrossThenDown), vec![vec![0, 1], vec![2, 3], vec![4]]);
    }

    #[test]
    fn test_unbounded_uses_one_line() {
        let plan = choose_columns(&[40, 50, 60], &LayoutBudget::new(0, 8), Fill::DownThenAcross);
        assert_eq!(plan.columns, 3);
        assert_eq!(plan.rows, 1);
        assert_eq!(plan.widths, vec![42, 52, 60]);
        assert_eq!(plan.rows_of(3, Fill::DownThenAcross), vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_unbounded_large_listing_is_one_row() {
        let widths = vec![1usize; 50_000];
        let plan = choose_columns(&widths, &LayoutBudget::new(0, 8), Fill::AcrossThenDown);
        assert_eq!(plan.columns, 50_000);
        assert_eq!(plan.rows, 1);
        assert_eq!(plan.widths.len(), 50_000);
        assert!(plan.widths.iter().all(|&w| w == MIN_COLUMN_WIDTH));
    }

    #[test]
    fn test_indent_with_tabs() {
        let mut out = Vec::new();
        indent(3, 17, 8, &mut out);
        assert_eq!(out, b"\t\t ");
        let mut out = Vec::new();
        indent(3, 6, 0, &mut out);
        assert_eq!(out, b"   ");
    }

    #[test]
    fn test_comma_breaks() {
        // "aaaa, bbbb, cccc" is 16 wide; a 15 budget breaks before the third
        let breaks = comma_breaks(&[4, 4, 4], 15);
        assert_eq!(breaks, vec![false, false, true]);
        assert_eq!(comma_breaks(&[4, 4, 4], 0), vec![false, false, false]);
    }
}
