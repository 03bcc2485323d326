use std::fmt;

use tracing::{info, instrument, warn};

use crate::aggregate::{Policy, Reduce, aggregate};
use crate::config::WeeklyConfig;
use crate::error::Result;
use crate::io::{excel_read, excel_write};
use crate::jobs::locate_columns;
use crate::model::Table;
use crate::normalize::{self, KeyKind};
use crate::reconcile::ledger::{
    self, AppendedRow, LedgerColumns, PaymentLabels, add_payments, append_missing, coerce_numeric,
    dedup, replace_forward,
};

const PAYMENT_LABELS: PaymentLabels<'static> = PaymentLabels {
    amount: "amount",
    id: "id",
    name: "name",
};
const SCHEDULE_LABEL: &str = "scheduled";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyReport {
    pub rows_before: usize,
    pub rows_after: usize,
    /// Existing rows that received a payment of the week.
    pub payments_added: usize,
    pub appended: Vec<AppendedRow>,
    pub duplicates_removed: usize,
    pub forward_replaced: usize,
    /// Numeric cells that were empty or unreadable and became zero.
    pub coerced_cells: usize,
    pub empty_cnpjs: usize,
}

impl fmt::Display for WeeklyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "rows: {} -> {}", self.rows_before, self.rows_after)?;
        writeln!(f, "settled totals increased: {}", self.payments_added)?;
        writeln!(f, "new merchants appended: {}", self.appended.len())?;
        for row in &self.appended {
            writeln!(f, "  + {} | {} | {:.2}", row.id, row.name, row.amount)?;
        }
        writeln!(f, "duplicate rows merged: {}", self.duplicates_removed)?;
        writeln!(f, "scheduled values replaced: {}", self.forward_replaced)?;
        write!(
            f,
            "numeric cells set to zero: {}, rows without CNPJ: {}",
            self.coerced_cells, self.empty_cnpjs
        )
    }
}

/// Brings the running settlement report up to date: adds the week's payments
/// to the settled totals, appends merchants seen for the first time, merges
/// duplicate rows and replaces the scheduled values from the latest schedule.
/// The report sheet is rewritten in place with its column order unchanged.
#[instrument(level = "info", skip_all, err, fields(report = %config.previous.path.display()))]
pub fn run(config: &WeeklyConfig) -> Result<WeeklyReport> {
    let mut previous = excel_read::read_table(&config.previous.path, &config.previous.sheet)?;
    let mut weekly = excel_read::read_table(&config.weekly.path, &config.weekly.sheet)?;
    let mut future = excel_read::read_table(&config.future.path, &config.future.sheet)?;
    info!(
        previous = previous.len(),
        weekly = weekly.len(),
        future = future.len(),
        "workbooks loaded"
    );

    let previous_columns = locate_columns(
        &previous,
        &[
            config.previous_cnpj_column.as_str(),
            config.previous_name_column.as_str(),
            config.previous_settled_column.as_str(),
            config.previous_scheduled_column.as_str(),
        ],
        "previous report",
        &config.previous.path,
    )?;
    let weekly_columns = locate_columns(
        &weekly,
        &[
            config.weekly_cnpj_column.as_str(),
            config.weekly_name_column.as_str(),
            config.weekly_payments_column.as_str(),
        ],
        "weekly payments",
        &config.weekly.path,
    )?;
    let future_columns = locate_columns(
        &future,
        &[
            config.future_cnpj_column.as_str(),
            config.future_name_column.as_str(),
            config.future_amount_column.as_str(),
        ],
        "future schedule",
        &config.future.path,
    )?;

    let columns = LedgerColumns {
        id: previous_columns[0],
        name: previous_columns[1],
        accumulator: previous_columns[2],
        forward: previous_columns[3],
    };

    let mut report = WeeklyReport {
        rows_before: previous.len(),
        ..WeeklyReport::default()
    };

    report.coerced_cells += coerce_logged(
        &mut previous,
        columns.accumulator,
        &config.previous_settled_column,
    );
    report.coerced_cells += coerce_logged(
        &mut previous,
        columns.forward,
        &config.previous_scheduled_column,
    );
    report.coerced_cells +=
        coerce_logged(&mut weekly, weekly_columns[2], &config.weekly_payments_column);
    report.coerced_cells +=
        coerce_logged(&mut future, future_columns[2], &config.future_amount_column);

    for (table, column, source) in [
        (&previous, columns.id, "previous report"),
        (&weekly, weekly_columns[0], "weekly payments"),
        (&future, future_columns[0], "future schedule"),
    ] {
        let empty = count_empty_cnpjs(table, column);
        if empty > 0 {
            warn!(source, rows = empty, "rows without CNPJ");
        }
        report.empty_cnpjs += empty;
    }

    let (weekly_id, weekly_name) = (weekly_columns[0], weekly_columns[1]);
    let payments = aggregate(
        &weekly,
        |row| ledger::key_at(&weekly, row, weekly_id, weekly_name),
        &[
            Policy::new(PAYMENT_LABELS.amount, weekly_columns[2], Reduce::Sum),
            Policy::new(PAYMENT_LABELS.id, weekly_id, Reduce::First),
            Policy::new(PAYMENT_LABELS.name, weekly_name, Reduce::First),
        ],
    );
    info!(keys = payments.len(), "weekly payments grouped by CNPJ and name");

    let future_id = future_columns[0];
    let schedule = aggregate(
        &future,
        |row| normalize::cnpj(&future.cell(row, future_id).to_string()),
        &[Policy::new(SCHEDULE_LABEL, future_columns[2], Reduce::First)],
    );
    info!(keys = schedule.len(), "future schedule grouped by CNPJ");

    // Duplicates already in the report are merged before payments are added so
    // a payment is never counted once per duplicate row.
    report.duplicates_removed += dedup(&mut previous, &columns);
    report.payments_added = add_payments(&mut previous, &columns, &payments, PAYMENT_LABELS);
    report.appended = append_missing(&mut previous, &columns, &payments, PAYMENT_LABELS);
    info!(appended = report.appended.len(), "new merchants appended");

    report.duplicates_removed += dedup(&mut previous, &columns);
    if report.duplicates_removed > 0 {
        warn!(rows = report.duplicates_removed, "duplicate rows consolidated");
    }

    report.forward_replaced = replace_forward(&mut previous, &columns, &schedule, SCHEDULE_LABEL);
    info!(
        settled = report.payments_added,
        scheduled = report.forward_replaced,
        "report values updated"
    );
    if report.forward_replaced == 0 && !future.is_empty() {
        warn!("no scheduled value was replaced from the future schedule");
    }

    report.rows_after = previous.len();
    excel_write::replace_sheet(&config.previous.path, &previous)?;
    info!(rows = report.rows_after, "weekly control saved");

    Ok(report)
}

fn coerce_logged(table: &mut Table, column: usize, label: &str) -> usize {
    let coerced = coerce_numeric(table, column);
    if coerced > 0 {
        warn!(column = label, cells = coerced, "non-numeric or empty values set to zero");
    }
    coerced
}

fn count_empty_cnpjs(table: &Table, column: usize) -> usize {
    normalize::normalize_column(table, column, KeyKind::Cnpj)
        .iter()
        .filter(|key| key.is_empty())
        .count()
}
