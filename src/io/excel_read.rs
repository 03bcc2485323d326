use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{CellType, DataType, Range, Reader, Xlsx, open_workbook};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::model::{Cell, Table};

type Workbook = Xlsx<BufReader<File>>;

/// A worksheet read cell by cell, without a header or row filtering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawSheet {
    pub name: String,
    /// Used cells in row-major order.
    pub cells: Vec<RawCell>,
}

/// One used cell at its zero-based position in the worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCell {
    pub row: u32,
    pub col: u32,
    /// Cached value. Formula cells keep the last value Excel computed.
    pub value: Cell,
    /// Formula text without the leading `=`.
    pub formula: Option<String>,
}

/// Reads the worksheet `sheet` of the workbook at `path`. The first row is the
/// header; every following non-blank row becomes a record.
pub fn read_table(path: &Path, sheet: &str) -> Result<Table> {
    let mut workbook = open(path)?;
    read_required_sheet(&mut workbook, path, sheet)
}

/// Reads the first worksheet of the workbook at `path`.
pub fn read_first_table(path: &Path) -> Result<Table> {
    let mut workbook = open(path)?;
    let sheet = workbook
        .sheet_names()
        .to_vec()
        .into_iter()
        .next()
        .ok_or_else(|| {
            ToolError::InvalidWorkbook(format!("'{}' has no worksheets", path.display()))
        })?;
    read_required_sheet(&mut workbook, path, &sheet)
}

/// Reads every worksheet of the workbook, in workbook order.
pub fn read_workbook(path: &Path) -> Result<Vec<Table>> {
    let mut workbook = open(path)?;
    let names = workbook.sheet_names().to_vec();

    let mut tables = Vec::with_capacity(names.len());
    for name in &names {
        let range = workbook
            .worksheet_range(name)
            .ok_or_else(|| missing_sheet(path, name, &names))?
            .map_err(ToolError::from)?;
        let table =
            range_to_table(name, &range).unwrap_or_else(|| Table::new(name.clone(), Vec::new()));
        tables.push(table);
    }

    Ok(tables)
}

/// Reads every worksheet of the workbook exactly where its cells sit, so a
/// sheet can be written back without moving anything.
pub fn read_raw_sheets(path: &Path) -> Result<Vec<RawSheet>> {
    let mut workbook = open(path)?;
    let names = workbook.sheet_names().to_vec();

    let mut sheets = Vec::with_capacity(names.len());
    for name in &names {
        let values = workbook
            .worksheet_range(name)
            .ok_or_else(|| missing_sheet(path, name, &names))?
            .map_err(ToolError::from)?;
        let formulas = match workbook.worksheet_formula(name) {
            Some(range) => range.map_err(ToolError::from)?,
            None => Range::empty(),
        };

        let mut cells: BTreeMap<(u32, u32), RawCell> = BTreeMap::new();
        for (row, col, value) in absolute_cells(&values) {
            cells.insert(
                (row, col),
                RawCell {
                    row,
                    col,
                    value: to_cell(value),
                    formula: None,
                },
            );
        }
        for (row, col, formula) in absolute_cells(&formulas) {
            cells
                .entry((row, col))
                .or_insert_with(|| RawCell {
                    row,
                    col,
                    value: Cell::Empty,
                    formula: None,
                })
                .formula = Some(formula.clone());
        }

        debug!(sheet = %name, cells = cells.len(), "worksheet loaded raw");
        sheets.push(RawSheet {
            name: name.clone(),
            cells: cells.into_values().collect(),
        });
    }

    Ok(sheets)
}

fn open(path: &Path) -> Result<Workbook> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    debug!(path = %path.display(), "opening workbook");
    Ok(open_workbook(path)?)
}

fn read_required_sheet(workbook: &mut Workbook, path: &Path, name: &str) -> Result<Table> {
    let range = match workbook.worksheet_range(name) {
        Some(range) => range.map_err(ToolError::from)?,
        None => {
            let available = workbook.sheet_names().to_vec();
            return Err(missing_sheet(path, name, &available));
        }
    };

    let table = range_to_table(name, &range).ok_or_else(|| ToolError::EmptySheet {
        path: path.to_path_buf(),
        sheet: name.to_string(),
    })?;
    debug!(
        sheet = name,
        rows = table.len(),
        columns = table.columns.len(),
        "worksheet loaded"
    );
    Ok(table)
}

fn missing_sheet(path: &Path, name: &str, available: &[String]) -> ToolError {
    ToolError::MissingSheet {
        path: path.to_path_buf(),
        sheet: name.to_string(),
        available: available.to_vec(),
    }
}

/// Converts a calamine range into a table, or `None` when there is no header row.
fn range_to_table(name: &str, range: &Range<DataType>) -> Option<Table> {
    let mut rows = range.rows();
    let header = rows.next()?;

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(index, cell)| {
            let label = cell_to_string(Some(cell));
            if label.trim().is_empty() {
                format!("Unnamed: {index}")
            } else {
                label
            }
        })
        .collect();

    let mut table = Table::new(name, columns);
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(to_cell).collect();
        if cells.iter().all(Cell::is_empty) {
            continue;
        }
        table.push_row(cells);
    }

    Some(table)
}

/// calamine ranges start at the first used cell; this shifts positions back
/// to worksheet coordinates.
fn absolute_cells<T: CellType>(range: &Range<T>) -> impl Iterator<Item = (u32, u32, &T)> {
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    range
        .used_cells()
        .map(move |(row, col, value)| (start_row + row as u32, start_col + col as u32, value))
}

fn to_cell(value: &DataType) -> Cell {
    match value {
        DataType::String(text) => Cell::Text(text.clone()),
        DataType::Float(number) => Cell::Number(*number),
        DataType::Int(number) => Cell::Number(*number as f64),
        DataType::Bool(flag) => Cell::Bool(*flag),
        DataType::DateTime(serial) => Cell::DateTime(*serial),
        DataType::Empty => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

fn cell_to_string(cell: Option<&DataType>) -> String {
    match cell {
        Some(value) => to_cell(value).to_string(),
        None => String::new(),
    }
}
