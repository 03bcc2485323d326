use std::fmt;

/// A single spreadsheet value.
///
/// `Empty` is the "unset" value: a reconciliation step that finds no match
/// leaves the cell empty rather than writing zero or a blank string.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    /// No value.
    #[default]
    Empty,
    /// Text literal.
    Text(String),
    /// Numeric literal. Integer cells are widened to `f64`.
    Number(f64),
    /// Boolean literal.
    Bool(bool),
    /// Excel date-time serial number.
    DateTime(f64),
}

impl Cell {
    /// Creates a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Returns `true` for empty cells and for text that is only whitespace.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => value.trim().is_empty(),
            _ => false,
        }
    }

    /// Coerces the cell into a number. Text is parsed after trimming; empty or
    /// unparsable values yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) | Cell::DateTime(value) => Some(*value),
            Cell::Text(value) => value.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Cell::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            Cell::Empty => None,
        }
    }
}

/// Renders the cell as text. Whole numbers print without a fractional part so
/// identifiers stored as numbers keep their digits intact.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(value) => f.write_str(value),
            Cell::Number(value) | Cell::DateTime(value) => write!(f, "{value}"),
            Cell::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

/// A worksheet held in memory: a header row plus data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Creates an empty table with the given header.
    pub fn new(sheet_name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the column with the exact header `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Returns the index of `name`, appending an empty column when absent.
    pub fn ensure_column(&mut self, name: &str) -> usize {
        if let Some(index) = self.column_index(name) {
            return index;
        }
        self.columns.push(name.to_string());
        for row in &mut self.rows {
            row.push(Cell::Empty);
        }
        self.columns.len() - 1
    }

    /// Cell at `(row, column)`. Short rows read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Overwrites a cell, padding the row when it is shorter than the header.
    pub fn set(&mut self, row: usize, column: usize, value: Cell) {
        let width = self.columns.len().max(column + 1);
        if let Some(cells) = self.rows.get_mut(row) {
            if cells.len() < width {
                cells.resize(width, Cell::Empty);
            }
            cells[column] = value;
        }
    }

    /// Every value of one column, in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = &Cell> + '_ {
        (0..self.rows.len()).map(move |row| self.cell(row, column))
    }

    /// Appends a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Keeps only `names`, in the given order, renaming each to its paired label.
    pub fn select_renamed(&self, mapping: &[(String, String)]) -> Table {
        let indices: Vec<Option<usize>> = mapping
            .iter()
            .map(|(source, _)| self.column_index(source))
            .collect();
        let columns = mapping.iter().map(|(_, target)| target.clone()).collect();

        let mut table = Table::new(self.sheet_name.clone(), columns);
        for row in 0..self.rows.len() {
            let cells = indices
                .iter()
                .map(|index| match index {
                    Some(column) => self.cell(row, *column).clone(),
                    None => Cell::Empty,
                })
                .collect();
            table.rows.push(cells);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new("Sheet1", vec!["a".into(), "b".into(), "c".into()]);
        table.push_row(vec![Cell::from("x"), Cell::from(1.0), Cell::from("z")]);
        table.push_row(vec![Cell::from("y")]);
        table
    }

    #[test]
    fn whole_numbers_render_without_fraction() {
        assert_eq!(Cell::Number(12345678000199.0).to_string(), "12345678000199");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(Cell::Empty.to_string(), "");
    }

    #[test]
    fn text_numbers_coerce() {
        assert_eq!(Cell::from(" 10.5 ").as_number(), Some(10.5));
        assert_eq!(Cell::from("n/a").as_number(), None);
        assert_eq!(Cell::Empty.as_number(), None);
    }

    #[test]
    fn ensure_column_pads_existing_rows() {
        let mut table = sample();
        let index = table.ensure_column("d");
        assert_eq!(index, 3);
        assert!(table.rows.iter().all(|row| row.len() == 4));
        assert_eq!(table.ensure_column("a"), 0);
    }

    #[test]
    fn select_renamed_projects_columns() {
        let table = sample();
        let projected = table.select_renamed(&[
            ("c".to_string(), "C".to_string()),
            ("a".to_string(), "A".to_string()),
        ]);
        assert_eq!(projected.columns, vec!["C".to_string(), "A".to_string()]);
        assert_eq!(projected.rows[0], vec![Cell::from("z"), Cell::from("x")]);
    }
}
