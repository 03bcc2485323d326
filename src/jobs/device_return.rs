use std::fmt;
use std::path::PathBuf;

use tracing::{info, instrument, warn};

use crate::aggregate::{Policy, Reduce, aggregate};
use crate::config::DeviceReturnConfig;
use crate::error::Result;
use crate::io::{excel_read, excel_write};
use crate::jobs::locate_columns;
use crate::matcher::Scorer;
use crate::normalize::{self, KeyKind};
use crate::reconcile::{FillReport, FuzzyFill, Target, fuzzy_fill};

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceReturnReport {
    pub fill: FillReport,
    pub reference_keys: usize,
    pub output: PathBuf,
}

impl fmt::Display for DeviceReturnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} rows updated by CNPJ (threshold {}, {} reference keys), saved to {}",
            self.fill.updated,
            self.fill.rows,
            self.fill.threshold,
            self.reference_keys,
            self.output.display()
        )
    }
}

/// Fills the device-return sheet with the device count of the closest CNPJ
/// in the inventory totals and saves that sheet alone to a new workbook.
#[instrument(level = "info", skip_all, err, fields(input = %config.input.path.display()))]
pub fn run(config: &DeviceReturnConfig) -> Result<DeviceReturnReport> {
    let mut destination = excel_read::read_table(&config.input.path, &config.input.sheet)?;
    let reference = match &config.reference_sheet {
        Some(sheet) => excel_read::read_table(&config.reference, sheet)?,
        None => excel_read::read_first_table(&config.reference)?,
    };

    let destination_columns = locate_columns(
        &destination,
        &[
            config.description_column.as_str(),
            config.cnpj_column.as_str(),
            config.target_column.as_str(),
        ],
        &config.input.sheet,
        &config.input.path,
    )?;
    let reference_columns = locate_columns(
        &reference,
        &[
            config.reference_company_column.as_str(),
            config.reference_cnpj_column.as_str(),
            config.reference_quantity_column.as_str(),
        ],
        &reference.sheet_name,
        &config.reference,
    )?;

    let (reference_cnpj, reference_quantity) = (reference_columns[1], reference_columns[2]);
    let quantities = aggregate(
        &reference,
        |row| normalize::cnpj(&reference.cell(row, reference_cnpj).to_string()),
        &[Policy::new(
            config.reference_quantity_column.as_str(),
            reference_quantity,
            Reduce::Sum,
        )],
    );
    info!(keys = quantities.len(), "device totals grouped by CNPJ");

    let fill = FuzzyFill {
        key_column: destination_columns[1],
        key_kind: KeyKind::Cnpj,
        scorer: Scorer::Ratio,
        threshold: config.threshold,
        targets: vec![Target::new(
            config.reference_quantity_column.as_str(),
            config.target_column.as_str(),
        )],
    };
    let report = fuzzy_fill(&mut destination, &quantities, &fill);
    info!(updated = report.updated, rows = report.rows, "CNPJ fill finished");
    if report.nothing_updated() {
        warn!(
            threshold = report.threshold,
            "no row was updated; the CNPJs may differ too much or the threshold may be too high"
        );
    }

    excel_write::write_tables(&config.output, &[destination])?;

    Ok(DeviceReturnReport {
        fill: report,
        reference_keys: quantities.len(),
        output: config.output.clone(),
    })
}
