use std::path::Path;

use rust_xlsxwriter::{Format, Formula, Workbook, Worksheet};
use tracing::{debug, info};

use crate::error::{Result, ToolError};
use crate::io::excel_read::{self, RawSheet};
use crate::model::{Cell, Table};

const DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// Writes the provided tables to a brand-new workbook at `path`, one sheet per
/// table, in order.
pub fn write_tables(path: &Path, tables: &[Table]) -> Result<()> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    for table in tables {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;
        write_sheet(worksheet, table, &header_format, &date_format)?;
    }

    save(&mut workbook, path, tables.len())
}

/// Replaces the sheet named after `table` inside the workbook at `path`. When
/// the sheet does not exist yet it is appended. Every other sheet is copied
/// cell by cell at its original positions, formulas included, and keeps its
/// place in the sheet order.
pub fn replace_sheet(path: &Path, table: &Table) -> Result<()> {
    let sheets = excel_read::read_raw_sheets(path)?;
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    let mut replaced = false;
    for sheet in &sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        if sheet.name == table.sheet_name {
            write_sheet(worksheet, table, &header_format, &date_format)?;
            replaced = true;
        } else {
            write_raw_sheet(worksheet, sheet, &date_format)?;
        }
    }
    if !replaced {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&table.sheet_name)?;
        write_sheet(worksheet, table, &header_format, &date_format)?;
    }
    debug!(sheet = %table.sheet_name, replaced, "sheet written back");

    let count = sheets.len() + usize::from(!replaced);
    save(&mut workbook, path, count)
}

fn save(workbook: &mut Workbook, path: &Path, sheets: usize) -> Result<()> {
    workbook
        .save(path)
        .map_err(|source| ToolError::SaveWorkbook {
            path: path.to_path_buf(),
            source,
        })?;
    info!(path = %path.display(), sheets, "workbook saved");
    Ok(())
}

fn write_raw_sheet(worksheet: &mut Worksheet, sheet: &RawSheet, date_format: &Format) -> Result<()> {
    for cell in &sheet.cells {
        let col = cell.col as u16;
        match &cell.formula {
            Some(formula) => {
                let text = format!("={formula}");
                worksheet.write_formula(cell.row, col, Formula::new(text.as_str()))?;
            }
            None => write_cell(worksheet, cell.row, col, &cell.value, date_format)?,
        }
    }
    Ok(())
}

fn write_sheet(
    worksheet: &mut Worksheet,
    table: &Table,
    header_format: &Format,
    date_format: &Format,
) -> Result<()> {
    for (col_idx, header) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col_idx as u16, header.as_str(), header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col_idx, cell) in row.iter().enumerate() {
            write_cell(worksheet, excel_row, col_idx as u16, cell, date_format)?;
        }
    }

    if !table.columns.is_empty() {
        let col_end = (table.columns.len() as u16).saturating_sub(1);
        let row_end = table.rows.len() as u32;
        worksheet.autofilter(0, 0, row_end, col_end)?;
    }

    Ok(())
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
    date_format: &Format,
) -> Result<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(value) => {
            worksheet.write_string(row, col, value.as_str())?;
        }
        Cell::Number(value) => {
            worksheet.write_number(row, col, *value)?;
        }
        Cell::Bool(value) => {
            worksheet.write_boolean(row, col, *value)?;
        }
        Cell::DateTime(serial) => {
            worksheet.write_number_with_format(row, col, *serial, date_format)?;
        }
    }
    Ok(())
}
