use std::fmt;

use tracing::{info, instrument, warn};

use crate::aggregate::{Policy, Reduce, aggregate};
use crate::config::PosBiConfig;
use crate::error::Result;
use crate::io::{excel_read, excel_write};
use crate::jobs::locate_columns;
use crate::matcher::Scorer;
use crate::normalize::{self, KeyKind};
use crate::reconcile::{FillReport, FuzzyFill, Target, fuzzy_fill};

#[derive(Debug, Clone, PartialEq)]
pub struct PosBiReport {
    pub fill: FillReport,
    pub reference_keys: usize,
}

impl fmt::Display for PosBiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} rows updated by company name (threshold {}, {} reference names)",
            self.fill.updated, self.fill.rows, self.fill.threshold, self.reference_keys
        )
    }
}

/// Copies the allocated and unused POS totals of the BI export into the
/// device-return sheet by company name, replacing that sheet in place.
#[instrument(level = "info", skip_all, err, fields(destination = %config.destination.path.display()))]
pub fn run(config: &PosBiConfig) -> Result<PosBiReport> {
    let source = excel_read::read_table(&config.source.path, &config.source.sheet)?;
    let mut destination =
        excel_read::read_table(&config.destination.path, &config.destination.sheet)?;

    let source_columns = locate_columns(
        &source,
        &[
            config.source_name_column.as_str(),
            config.allocated_column.as_str(),
            config.unused_column.as_str(),
        ],
        &config.source.sheet,
        &config.source.path,
    )?;
    let destination_columns = locate_columns(
        &destination,
        &[config.destination_name_column.as_str()],
        &config.destination.sheet,
        &config.destination.path,
    )?;

    let name_column = source_columns[0];
    let totals = aggregate(
        &source,
        |row| normalize::name(&source.cell(row, name_column).to_string()),
        &[
            Policy::new(config.allocated_column.as_str(), source_columns[1], Reduce::Sum),
            Policy::new(config.unused_column.as_str(), source_columns[2], Reduce::Sum),
        ],
    );
    info!(names = totals.len(), "POS totals grouped by company name");

    let fill = FuzzyFill {
        key_column: destination_columns[0],
        key_kind: KeyKind::Name,
        scorer: Scorer::TokenSetRatio,
        threshold: config.threshold,
        targets: vec![
            Target::new(config.allocated_column.as_str(), config.allocated_target.as_str()),
            Target::new(config.unused_column.as_str(), config.unused_target.as_str()),
        ],
    };
    let report = fuzzy_fill(&mut destination, &totals, &fill);
    info!(updated = report.updated, rows = report.rows, "name fill finished");
    if report.nothing_updated() {
        warn!(
            threshold = report.threshold,
            "no row was updated; the company names may differ too much or the threshold may be too high"
        );
    }

    excel_write::replace_sheet(&config.destination.path, &destination)?;

    Ok(PosBiReport {
        fill: report,
        reference_keys: totals.len(),
    })
}
