//! Fixed-width plain-text tables and section banners

/// Column alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone)]
struct Column {
    header: String,
    width: usize,
    align: Align,
}

/// Fixed-width table with caller-ordered columns
///
/// Cells wider than their column are printed in full; the table never
/// truncates data.
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    columns: Vec<Column>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn column(mut self, header: &str, width: usize, align: Align) -> Self {
        self.columns.push(Column {
            header: header.to_string(),
            width: width.max(header.chars().count()),
            align,
        });
        self
    }

    pub fn add_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn pad(text: &str, width: usize, align: Align) -> String {
        match align {
            Align::Left => format!("{text:<width$}"),
            Align::Right => format!("{text:>width$}"),
        }
    }

    fn line(&self, cells: &[String]) -> String {
        let line = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                Self::pad(cell, col.width, col.align)
            })
            .collect::<Vec<_>>()
            .join(" ");
        line.trim_end().to_string()
    }

    /// Render header, dashed separator and rows
    pub fn render(&self) -> String {
        let mut out = String::new();
        let headers: Vec<String> = self.columns.iter().map(|c| c.header.clone()).collect();
        out.push_str(&self.line(&headers));
        out.push('\n');
        let separator = self
            .columns
            .iter()
            .map(|c| "-".repeat(c.width))
            .collect::<Vec<_>>()
            .join(" ");
        out.push_str(&separator);
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.line(row));
            out.push('\n');
        }
        out
    }
}

/// Horizontal rule of `width` copies of `ch`
pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat(ch).take(width).collect()
}

/// Title framed by `=` rules
pub fn banner(title: &str, width: usize) -> String {
    let bar = rule('=', width);
    format!("{bar}\n{title}\n{bar}\n")
}

/// Title framed by `-` rules
pub fn section(title: &str, width: usize) -> String {
    let bar = rule('-', width);
    format!("{bar}\n{title}\n{bar}\n")
}
