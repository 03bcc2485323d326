use std::fmt;
use std::path::PathBuf;

use tracing::{info, instrument};

use crate::aggregate::{Policy, aggregate};
use crate::config::InventoryConfig;
use crate::error::Result;
use crate::io::{excel_read, excel_write};
use crate::jobs::locate_columns;
use crate::model::{Cell, Table};
use crate::normalize;

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryReport {
    pub devices: usize,
    pub companies: usize,
    pub output: PathBuf,
}

impl fmt::Display for InventoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} devices counted for {} companies, saved to {}",
            self.devices,
            self.companies,
            self.output.display()
        )
    }
}

/// Counts inventory devices per `(company, CNPJ)` and writes the totals to a
/// new workbook, sorted by company then CNPJ.
#[instrument(level = "info", skip_all, err, fields(input = %config.input.path.display()))]
pub fn run(config: &InventoryConfig) -> Result<InventoryReport> {
    let source = excel_read::read_table(&config.input.path, &config.input.sheet)?;
    locate_columns(
        &source,
        &[
            config.company_column.as_str(),
            config.cnpj_column.as_str(),
            config.serial_column.as_str(),
        ],
        &config.input.sheet,
        &config.input.path,
    )?;

    let mut devices = source.select_renamed(&[
        (config.company_column.clone(), config.company_column.clone()),
        (config.cnpj_column.clone(), config.cnpj_column.clone()),
        (config.serial_column.clone(), config.device_label.clone()),
    ]);
    for row in 0..devices.len() {
        let company = devices.cell(row, 0).to_string().trim().to_string();
        let cnpj = normalize::cnpj(&devices.cell(row, 1).to_string());
        let serial = devices.cell(row, 2).to_string().trim().to_string();
        devices.set(row, 0, Cell::Text(company));
        devices.set(row, 1, Cell::Text(cnpj));
        devices.set(row, 2, Cell::Text(serial));
    }
    info!(rows = devices.len(), "inventory normalised");

    let counts = aggregate(
        &devices,
        |row| (devices.cell(row, 0).to_string(), devices.cell(row, 1).to_string()),
        &[Policy::count(config.count_column.as_str())],
    );

    let mut output = Table::new(
        config.output_sheet.as_str(),
        vec![
            config.company_column.clone(),
            config.cnpj_column.clone(),
            config.count_column.clone(),
        ],
    );
    for ((company, cnpj), payload) in counts.iter() {
        let count = payload.first().cloned().unwrap_or_default();
        output.push_row(vec![Cell::text(company.as_str()), Cell::text(cnpj.as_str()), count]);
    }

    excel_write::write_tables(&config.output, &[output])?;
    info!(companies = counts.len(), "device counts written");

    Ok(InventoryReport {
        devices: devices.len(),
        companies: counts.len(),
        output: config.output.clone(),
    })
}
