//! Virtualized, filterable, sortable list shared by every resource view.

use std::cmp::Ordering;

use crate::view::truncate_str;

/// Anything a [`Table`] can display.
pub trait TableRow {
    /// Display strings, one per column.
    fn columns(&self) -> Vec<String>;

    /// Stable identifier used for actions and for keeping the selection
    /// across reloads. Synthetic rows have none.
    fn id(&self) -> Option<&str>;

    /// Section and group headers split the table into independently sorted
    /// segments.
    fn is_header(&self) -> bool {
        false
    }

    fn sort_key(&self, column: usize) -> SortKey {
        SortKey::Text(
            self.columns()
                .get(column)
                .map(|c| c.to_lowercase())
                .unwrap_or_default(),
        )
    }
}

/// Per-column comparison value.
#[derive(Clone, Debug, PartialEq)]
pub enum SortKey {
    Text(String),
    Number(f64),
}

impl SortKey {
    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Number(_), SortKey::Text(_)) => Ordering::Less,
            (SortKey::Text(_), SortKey::Number(_)) => Ordering::Greater,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Column {
    pub title: &'static str,
    /// `None` marks a flexible column that shares the leftover width.
    pub width: Option<usize>,
}

impl Column {
    pub const fn fixed(title: &'static str, width: usize) -> Self {
        Self { title, width: Some(width) }
    }

    pub const fn flex(title: &'static str) -> Self {
        Self { title, width: None }
    }
}

/// Rendered output of [`Table::view`].
#[derive(Debug, PartialEq)]
pub struct TableView {
    pub header: String,
    pub lines: Vec<TableLine>,
}

#[derive(Debug, PartialEq)]
pub struct TableLine {
    pub text: String,
    pub selected: bool,
    pub header: bool,
}

pub const SORT_INDICATOR: &str = "▼";
const SEPARATOR: usize = 1;

pub struct Table<R> {
    columns: Vec<Column>,
    widths: Vec<usize>,
    rows: Vec<R>,
    filter: String,
    filtered: Vec<usize>,
    cursor: usize,
    offset: usize,
    height: usize,
    sort_field: usize,
    /// No indicator is drawn until the user picks a sort.
    sorted: bool,
}

impl<R: TableRow> Table<R> {
    pub fn new(columns: Vec<Column>) -> Self {
        let mut table = Self {
            widths: vec![0; columns.len()],
            columns,
            rows: Vec::new(),
            filter: String::new(),
            filtered: Vec::new(),
            cursor: 0,
            offset: 0,
            height: 1,
            sort_field: 0,
            sorted: false,
        };
        table.set_size(80, 1);
        table
    }

    /// Replace every row, keeping the selection on the same identifier when
    /// it is still present.
    pub fn set_rows(&mut self, rows: Vec<R>) {
        let selected_id = self.selected().and_then(|r| r.id()).map(str::to_owned);
        self.rows = rows;
        self.refilter();

        if let Some(id) = selected_id {
            if let Some(pos) = self
                .filtered
                .iter()
                .position(|&i| self.rows[i].id() == Some(id.as_str()))
            {
                self.cursor = pos;
            }
        }
        self.clamp();
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    /// Case-insensitive substring match over every column. An empty pattern
    /// shows all rows.
    pub fn set_filter(&mut self, pattern: &str) {
        self.filter = pattern.to_owned();
        self.refilter();
        self.clamp();
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Advance the active sort column, wrapping after the last one.
    pub fn next_sort(&mut self) -> usize {
        if !self.columns.is_empty() {
            self.sort_field = (self.sort_field + 1) % self.columns.len();
        }
        self.sorted = true;
        self.sort_field
    }

    pub fn sort_field(&self) -> usize {
        self.sort_field
    }

    /// Stable sort of every segment between header rows.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&R, &R) -> Ordering,
    {
        let selected_id = self.selected().and_then(|r| r.id()).map(str::to_owned);
        let mut start = 0;
        while start < self.rows.len() {
            if self.rows[start].is_header() {
                start += 1;
                continue;
            }
            let end = self.rows[start..]
                .iter()
                .position(|r| r.is_header())
                .map_or(self.rows.len(), |p| start + p);
            self.rows[start..end].sort_by(&mut compare);
            start = end;
        }
        self.refilter();
        if let Some(id) = selected_id {
            if let Some(pos) = self
                .filtered
                .iter()
                .position(|&i| self.rows[i].id() == Some(id.as_str()))
            {
                self.cursor = pos;
            }
        }
        self.clamp();
    }

    /// Sort by the active column using each row's [`SortKey`].
    pub fn sort_by_active_column(&mut self) {
        self.sorted = true;
        let field = self.sort_field;
        self.sort_by(|a, b| a.sort_key(field).compare(&b.sort_key(field)));
    }

    /// Recompute column widths and the visible window.
    pub fn set_size(&mut self, width: usize, height: usize) {
        self.height = height.max(1);

        let fixed: usize = self.columns.iter().filter_map(|c| c.width).sum();
        let separators = self.columns.len().saturating_sub(1) * SEPARATOR;
        let flex = self.columns.iter().filter(|c| c.width.is_none()).count();
        let leftover = width.saturating_sub(fixed + separators);
        let share = if flex > 0 { leftover / flex } else { 0 };

        self.widths = self
            .columns
            .iter()
            .map(|c| c.width.unwrap_or(share))
            .collect();
        self.clamp();
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn widths(&self) -> &[usize] {
        &self.widths
    }

    pub fn row_count(&self) -> usize {
        self.filtered.len()
    }

    pub fn total_row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cursor(&self) -> Option<usize> {
        if self.filtered.is_empty() { None } else { Some(self.cursor) }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn selected(&self) -> Option<&R> {
        self.filtered.get(self.cursor).map(|&i| &self.rows[i])
    }

    pub fn cursor_up(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_sub(n);
        self.clamp();
    }

    pub fn cursor_down(&mut self, n: usize) {
        self.cursor = self.cursor.saturating_add(n);
        self.clamp();
    }

    pub fn page_up(&mut self) {
        self.cursor_up(self.height);
    }

    pub fn page_down(&mut self) {
        self.cursor_down(self.height);
    }

    pub fn home(&mut self) {
        self.cursor = 0;
        self.clamp();
    }

    pub fn end(&mut self) {
        self.cursor = self.filtered.len().saturating_sub(1);
        self.clamp();
    }

    pub fn view(&self) -> TableView {
        let header_cells: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if self.sorted && i == self.sort_field {
                    format!("{} {}", c.title, SORT_INDICATOR)
                } else {
                    c.title.to_string()
                }
            })
            .collect();
        let header = self.format_cells(&header_cells);

        let end = (self.offset + self.height).min(self.filtered.len());
        let lines = (self.offset..end)
            .map(|pos| {
                let row = &self.rows[self.filtered[pos]];
                let text = if row.is_header() {
                    self.format_spanning(&row.columns())
                } else {
                    self.format_cells(&row.columns())
                };
                TableLine {
                    text,
                    selected: pos == self.cursor,
                    header: row.is_header(),
                }
            })
            .collect();

        TableView { header, lines }
    }

    fn format_cells(&self, cells: &[String]) -> String {
        let mut line = String::new();
        for (i, width) in self.widths.iter().enumerate() {
            if i > 0 {
                line.push(' ');
            }
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let cell = truncate_str(cell, *width);
            line.push_str(&cell);
            let used = cell.chars().count();
            line.extend(std::iter::repeat_n(' ', width.saturating_sub(used)));
        }
        line
    }

    /// Header rows ignore column boundaries and span the full width.
    fn format_spanning(&self, cells: &[String]) -> String {
        let total = self.widths.iter().sum::<usize>()
            + self.widths.len().saturating_sub(1) * SEPARATOR;
        let joined = cells
            .iter()
            .filter(|c| !c.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        let mut line = truncate_str(&joined, total);
        let used = line.chars().count();
        line.extend(std::iter::repeat_n(' ', total.saturating_sub(used)));
        line
    }

    fn refilter(&mut self) {
        if self.filter.is_empty() {
            self.filtered = (0..self.rows.len()).collect();
            return;
        }
        let needle = self.filter.to_lowercase();
        self.filtered = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| {
                row.columns()
                    .iter()
                    .any(|c| c.to_lowercase().contains(&needle))
            })
            .map(|(i, _)| i)
            .collect();
    }

    /// Restore `cursor < len` and `offset <= cursor < offset + height`.
    fn clamp(&mut self) {
        let len = self.filtered.len();
        if len == 0 {
            self.cursor = 0;
            self.offset = 0;
            return;
        }
        self.cursor = self.cursor.min(len - 1);
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + self.height {
            self.offset = self.cursor + 1 - self.height;
        }
        // Do not leave blank space at the bottom when rows shrank.
        let max_offset = len.saturating_sub(self.height);
        self.offset = self.offset.min(max_offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        id: String,
        name: String,
        size: f64,
        header: bool,
    }

    impl Item {
        fn new(id: &str, name: &str, size: f64) -> Self {
            Self { id: id.into(), name: name.into(), size, header: false }
        }

        fn header(name: &str) -> Self {
            Self { id: String::new(), name: name.into(), size: 0.0, header: true }
        }
    }

    impl TableRow for Item {
        fn columns(&self) -> Vec<String> {
            vec![self.id.clone(), self.name.clone(), format!("{}", self.size)]
        }

        fn id(&self) -> Option<&str> {
            if self.header { None } else { Some(&self.id) }
        }

        fn is_header(&self) -> bool {
            self.header
        }

        fn sort_key(&self, column: usize) -> SortKey {
            match column {
                2 => SortKey::Number(self.size),
                _ => SortKey::Text(self.columns()[column].to_lowercase()),
            }
        }
    }

    fn table_with(n: usize, height: usize) -> Table<Item> {
        let mut t = Table::new(vec![
            Column::fixed("ID", 4),
            Column::flex("NAME"),
            Column::fixed("SIZE", 6),
        ]);
        t.set_size(40, height);
        t.set_rows(
            (0..n)
                .map(|i| Item::new(&format!("id{i}"), &format!("row-{i}"), i as f64))
                .collect(),
        );
        t
    }

    fn assert_invariants(t: &Table<Item>) {
        if let Some(cursor) = t.cursor() {
            assert!(cursor < t.row_count());
            assert!(t.offset() <= cursor);
            assert!(cursor < t.offset() + t.height());
        }
    }

    #[test]
    fn filter_empty_pattern_is_identity() {
        let mut t = table_with(5, 3);
        t.set_filter("");
        assert_eq!(t.row_count(), 5);
        let ids: Vec<_> = t.view().lines.iter().map(|l| l.text.clone()).collect();
        assert!(ids[0].starts_with("id0"));
    }

    #[test]
    fn filter_is_case_insensitive_and_idempotent() {
        let mut t = table_with(12, 5);
        t.set_filter("ROW-1");
        let once = t.row_count();
        t.set_filter("ROW-1");
        assert_eq!(t.row_count(), once);
        // row-1, row-10, row-11
        assert_eq!(once, 3);
        assert_eq!(t.total_row_count(), 12);
    }

    #[test]
    fn filter_matching_nothing_renders_header_only() {
        let mut t = table_with(3, 5);
        t.set_filter("zzz");
        assert_eq!(t.row_count(), 0);
        assert!(t.selected().is_none());
        assert!(t.cursor().is_none());
        let view = t.view();
        assert!(view.header.contains("NAME"));
        assert!(view.lines.is_empty());
    }

    #[test]
    fn zero_rows_navigation_is_inert() {
        let mut t = table_with(0, 5);
        t.cursor_down(3);
        t.page_down();
        t.end();
        assert!(t.selected().is_none());
        assert_eq!(t.offset(), 0);
    }

    #[test]
    fn navigation_clamps_instead_of_wrapping() {
        let mut t = table_with(10, 4);
        t.cursor_up(1);
        assert_eq!(t.cursor(), Some(0));
        t.end();
        assert_eq!(t.cursor(), Some(9));
        t.cursor_down(1);
        assert_eq!(t.cursor(), Some(9));
        assert_eq!(t.offset(), 6);
    }

    #[test]
    fn cursor_stays_visible_through_mixed_navigation() {
        let mut t = table_with(37, 6);
        let ops: [fn(&mut Table<Item>); 6] = [
            |t| t.cursor_down(1),
            |t| t.page_down(),
            |t| t.cursor_up(2),
            |t| t.page_up(),
            |t| t.end(),
            |t| t.home(),
        ];
        for step in 0..200 {
            ops[(step * 7 + step / 3) % ops.len()](&mut t);
            assert_invariants(&t);
        }
    }

    #[test]
    fn shrinking_rows_reclamps_cursor() {
        let mut t = table_with(20, 5);
        t.end();
        t.set_rows(vec![Item::new("a", "a", 1.0), Item::new("b", "b", 2.0)]);
        assert_eq!(t.cursor(), Some(1));
        assert_eq!(t.offset(), 0);
        assert_invariants(&t);
    }

    #[test]
    fn set_rows_keeps_selection_on_same_id() {
        let mut t = table_with(5, 5);
        t.cursor_down(3);
        assert_eq!(t.selected().map(|r| r.id.as_str()), Some("id3"));
        let mut rows: Vec<Item> = t.rows().to_vec();
        rows.reverse();
        t.set_rows(rows);
        assert_eq!(t.selected().map(|r| r.id.as_str()), Some("id3"));
        assert_eq!(t.cursor(), Some(1));
    }

    #[test]
    fn next_sort_cycles_back_after_column_count() {
        let mut t = table_with(3, 3);
        let start = t.sort_field();
        for _ in 0..3 {
            t.next_sort();
        }
        assert_eq!(t.sort_field(), start);
    }

    #[test]
    fn sort_keeps_headers_in_place() {
        let mut t = table_with(0, 10);
        t.set_rows(vec![
            Item::header("first"),
            Item::new("b", "b", 3.0),
            Item::new("a", "a", 1.0),
            Item::header("second"),
            Item::new("d", "d", 9.0),
            Item::new("c", "c", 2.0),
        ]);
        t.next_sort();
        t.next_sort();
        t.sort_by_active_column();
        let names: Vec<_> = t.rows().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["first", "a", "b", "second", "c", "d"]);
    }

    #[test]
    fn view_marks_sort_column_and_pads_cells() {
        let mut t = table_with(2, 5);
        t.next_sort();
        let view = t.view();
        assert!(view.header.contains(&format!("NAME {SORT_INDICATOR}")));
        // 4 + 1 + flex + 1 + 6 == 40
        assert_eq!(t.widths(), &[4, 28, 6]);
        assert_eq!(view.lines[0].text.chars().count(), 40);
        assert!(view.lines[0].selected);
        assert!(!view.lines[1].selected);
    }

    #[test]
    fn unsorted_header_has_no_indicator() {
        let mut t = table_with(3, 5);
        assert!(!t.view().header.contains(SORT_INDICATOR));
        t.set_filter("id1");
        assert!(!t.view().header.contains(SORT_INDICATOR));
        t.sort_by_active_column();
        assert!(t.view().header.contains(&format!("ID {SORT_INDICATOR}")));
    }

    #[test]
    fn view_shows_only_the_window() {
        let mut t = table_with(10, 3);
        t.cursor_down(5);
        let view = t.view();
        assert_eq!(view.lines.len(), 3);
        assert!(view.lines[2].text.starts_with("id5"));
        assert!(view.lines[2].selected);
    }
}
