//! Markdown document builder
//!
//! Findings documents are assembled section by section; tables pad every
//! cell to its column width so the raw text stays readable.

/// Pipe table with aligned columns
#[derive(Debug, Clone, Default)]
pub struct MarkdownTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn add_row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let widths: Vec<usize> = (0..self.headers.len())
            .map(|i| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .chain(std::iter::once(&self.headers[i]))
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| {
            let body = widths
                .iter()
                .enumerate()
                .map(|(i, &w)| {
                    let cell = cells.get(i).map(String::as_str).unwrap_or("");
                    let pad = w.saturating_sub(cell.chars().count());
                    format!(" {cell}{} ", " ".repeat(pad))
                })
                .collect::<Vec<_>>()
                .join("|");
            format!("|{body}|\n")
        };

        let mut out = line(&self.headers);
        let separator = widths
            .iter()
            .map(|&w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("|");
        out.push_str(&format!("|{separator}|\n"));
        for row in &self.rows {
            out.push_str(&line(row));
        }
        out
    }
}

/// Accumulates a Markdown document
#[derive(Debug, Clone, Default)]
pub struct MarkdownDoc {
    buf: String,
}

impl MarkdownDoc {
    pub fn new() -> Self {
        Self::default()
    }

    fn heading(&mut self, level: usize, text: &str) {
        self.buf.push_str(&"#".repeat(level));
        self.buf.push(' ');
        self.buf.push_str(text);
        self.buf.push_str("\n\n");
    }

    pub fn h1(&mut self, text: &str) {
        self.heading(1, text);
    }

    pub fn h2(&mut self, text: &str) {
        self.heading(2, text);
    }

    pub fn h3(&mut self, text: &str) {
        self.heading(3, text);
    }

    pub fn h4(&mut self, text: &str) {
        self.heading(4, text);
    }

    /// Paragraph followed by a blank line
    pub fn paragraph(&mut self, text: &str) {
        self.buf.push_str(text);
        self.buf.push_str("\n\n");
    }

    /// Single line without trailing blank line
    pub fn line(&mut self, text: &str) {
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    pub fn bullet(&mut self, text: &str) {
        self.buf.push_str("- ");
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// End a run of lines or bullets
    pub fn blank(&mut self) {
        self.buf.push('\n');
    }

    pub fn rule(&mut self) {
        self.buf.push_str("---\n\n");
    }

    pub fn table(&mut self, table: &MarkdownTable) {
        self.buf.push_str(&table.render());
        self.buf.push('\n');
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_alignment() {
        let mut table = MarkdownTable::new(&["Config", "Speedup"]);
        table.add_row(vec!["naive".to_string(), "1.0×".to_string()]);
        table.add_row(vec!["neon_4t".to_string(), "12.5×".to_string()]);
        let out = table.render();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "| Config  | Speedup |");
        assert_eq!(lines[1], "|---------|---------|");
        assert_eq!(lines[2], "| naive   | 1.0×    |");
        assert_eq!(lines[3], "| neon_4t | 12.5×   |");
    }

    #[test]
    fn test_document_sections() {
        let mut doc = MarkdownDoc::new();
        doc.h1("Findings");
        doc.h2("Executive Summary");
        doc.bullet("one");
        doc.blank();
        doc.rule();
        doc.paragraph("**Data source**: x.csv");
        let text = doc.finish();
        assert!(text.starts_with("# Findings\n\n## Executive Summary\n\n- one\n\n---\n\n"));
        assert!(text.ends_with("**Data source**: x.csv\n\n"));
    }
}
