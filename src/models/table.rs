use std::fmt;

use chrono::NaiveDateTime;

/// A single spreadsheet cell as delivered by the table source.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Build a text cell, mapping empty strings to [`Cell::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// The cell's value as an identifier (account key, model name).
    ///
    /// Numeric identifiers are rendered without a fractional part when they
    /// are whole numbers. Empty cells yield `None`.
    pub fn to_label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.clone()),
            Cell::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("{}", *f as i64)),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(x) => write!(f, "{x}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::text(value)
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// An in-memory table with named columns, as parsed from an uploaded
/// statement. Rows have no ordering or uniqueness guarantee.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    /// 1-based source line of each row, when it differs from the row's
    /// position under the header.
    row_numbers: Option<Vec<usize>>,
}

impl BillingTable {
    /// Create a table. Header names are trimmed of surrounding whitespace and
    /// any byte order mark.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let columns = columns
            .into_iter()
            .map(|c| c.trim_matches(|ch: char| ch.is_whitespace() || ch == '\u{feff}').to_string())
            .collect();
        Self {
            columns,
            rows,
            row_numbers: None,
        }
    }

    /// Record where each row sits in the source file. Used when blank rows
    /// were dropped or the data does not start at the first line.
    pub fn with_row_numbers(mut self, row_numbers: Vec<usize>) -> Self {
        self.row_numbers = Some(row_numbers);
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// 1-based source line of data row `row`, as a user would see it in a
    /// spreadsheet. Defaults to the row's position after a single header line.
    pub fn row_number(&self, row: usize) -> usize {
        self.row_numbers
            .as_ref()
            .and_then(|numbers| numbers.get(row).copied())
            .unwrap_or(row + 2)
    }

    /// Cell at `(row, column)`; short rows read as empty past their end.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_are_trimmed() {
        let table = BillingTable::new(vec!["\u{feff}apiKey".into(), " 用量 ".into()], vec![]);
        assert_eq!(table.columns(), ["apiKey", "用量"]);
        assert_eq!(table.column_index("用量"), Some(1));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let table = BillingTable::new(
            vec!["a".into(), "b".into()],
            vec![vec![Cell::from("x")]],
        );
        assert_eq!(table.cell(0, 0), &Cell::Text("x".into()));
        assert!(table.cell(0, 1).is_empty());
        assert!(table.cell(5, 0).is_empty());
    }

    #[test]
    fn test_row_numbers() {
        let rows = vec![vec![Cell::from("x")], vec![Cell::from("y")]];
        let table = BillingTable::new(vec!["a".into()], rows.clone());
        assert_eq!(table.row_number(0), 2);
        assert_eq!(table.row_number(1), 3);

        let table = BillingTable::new(vec!["a".into()], rows).with_row_numbers(vec![4, 7]);
        assert_eq!(table.row_number(0), 4);
        assert_eq!(table.row_number(1), 7);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Cell::from("key-1").to_label().as_deref(), Some("key-1"));
        assert_eq!(Cell::Int(42).to_label().as_deref(), Some("42"));
        assert_eq!(Cell::Float(42.0).to_label().as_deref(), Some("42"));
        assert_eq!(Cell::Float(1.5).to_label().as_deref(), Some("1.5"));
        assert_eq!(Cell::text("").to_label(), None);
    }
}
