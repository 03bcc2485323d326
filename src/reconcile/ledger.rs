//! Exact-key reconciliation of a running report.
//!
//! The report is keyed by the normalised `(cnpj, name)` pair. Incoming
//! payments are added to an accumulator column, unknown merchants are
//! appended as new rows, duplicates are consolidated and a forward-looking
//! value is replaced from the latest schedule.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::aggregate::ReferenceTable;
use crate::model::{Cell, Table};
use crate::normalize;

/// Normalised `(cnpj, name)` pair.
pub type LedgerKey = (String, String);

/// Column positions of the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerColumns {
    pub id: usize,
    pub name: usize,
    /// Running total that incoming payments are added to.
    pub accumulator: usize,
    /// Value replaced by the latest schedule.
    pub forward: usize,
}

/// Payload labels of the aggregated payment reference.
#[derive(Debug, Clone, Copy)]
pub struct PaymentLabels<'a> {
    /// Summed payment amount.
    pub amount: &'a str,
    /// First identifier as written in the payment sheet.
    pub id: &'a str,
    /// First name as written in the payment sheet.
    pub name: &'a str,
}

/// A merchant that was not in the report before this run.
#[derive(Debug, Clone, PartialEq)]
pub struct AppendedRow {
    pub id: String,
    pub name: String,
    pub amount: f64,
}

/// Normalised key of the report row `row`.
pub fn row_key(table: &Table, row: usize, columns: &LedgerColumns) -> LedgerKey {
    key_at(table, row, columns.id, columns.name)
}

/// Normalised key built from any pair of identifier and name columns.
pub fn key_at(table: &Table, row: usize, id: usize, name: usize) -> LedgerKey {
    (
        normalize::cnpj(&table.cell(row, id).to_string()),
        normalize::name(&table.cell(row, name).to_string()),
    )
}

/// Turns every cell of `column` into a number, using zero for empty or
/// unparsable values. Returns how many cells needed the zero fallback.
pub fn coerce_numeric(table: &mut Table, column: usize) -> usize {
    let mut coerced = 0;
    for row in 0..table.len() {
        let value = match table.cell(row, column).as_number() {
            Some(value) => value,
            None => {
                coerced += 1;
                0.0
            }
        };
        table.set(row, column, Cell::Number(value));
    }
    coerced
}

/// Adds the aggregated payment of each existing row's key to its accumulator.
/// Returns the number of rows that received a payment.
pub fn add_payments(
    table: &mut Table,
    columns: &LedgerColumns,
    payments: &ReferenceTable<LedgerKey>,
    labels: PaymentLabels<'_>,
) -> usize {
    let mut summed = 0;
    for row in 0..table.len() {
        let key = row_key(table, row, columns);
        let Some(amount) = payments
            .value(&key, labels.amount)
            .and_then(Cell::as_number)
        else {
            continue;
        };
        let current = table.cell(row, columns.accumulator).as_number().unwrap_or(0.0);
        table.set(row, columns.accumulator, Cell::Number(current + amount));
        summed += 1;
    }
    summed
}

/// Appends one row per payment key that is absent from the report. The new
/// row carries the payment total in the accumulator, zero in the forward
/// column and nothing elsewhere.
pub fn append_missing(
    table: &mut Table,
    columns: &LedgerColumns,
    payments: &ReferenceTable<LedgerKey>,
    labels: PaymentLabels<'_>,
) -> Vec<AppendedRow> {
    let existing: HashSet<LedgerKey> = (0..table.len())
        .map(|row| row_key(table, row, columns))
        .collect();

    let mut appended = Vec::new();
    for (key, _) in payments.iter() {
        if existing.contains(key) {
            continue;
        }

        let id = match payments.value(key, labels.id) {
            Some(cell) if !cell.is_empty() => {
                normalize::strip_float_suffix(cell.to_string().trim()).to_string()
            }
            _ => key.0.clone(),
        };
        let name = match payments.value(key, labels.name) {
            Some(cell) if !cell.is_empty() => cell.to_string(),
            _ => key.1.clone(),
        };
        let amount = payments
            .value(key, labels.amount)
            .and_then(Cell::as_number)
            .unwrap_or(0.0);

        let mut row = vec![Cell::Empty; table.columns.len()];
        row[columns.id] = Cell::Text(id.clone());
        row[columns.name] = Cell::Text(name.clone());
        row[columns.accumulator] = Cell::Number(amount);
        row[columns.forward] = Cell::Number(0.0);
        table.push_row(row);

        debug!(id = %id, name = %name, amount, "merchant appended");
        appended.push(AppendedRow { id, name, amount });
    }
    appended
}

/// Merges rows that share a key. The accumulator is summed, every other
/// column keeps its first non-empty value, and groups stay in the order their
/// first row appeared. Returns the number of rows removed.
pub fn dedup(table: &mut Table, columns: &LedgerColumns) -> usize {
    let keys: Vec<LedgerKey> = (0..table.len())
        .map(|row| row_key(table, row, columns))
        .collect();
    let width = table.columns.len();
    let rows = std::mem::take(&mut table.rows);
    let before = rows.len();

    let mut positions: HashMap<LedgerKey, usize> = HashMap::new();
    let mut merged: Vec<Vec<Cell>> = Vec::with_capacity(rows.len());

    for (key, mut row) in keys.into_iter().zip(rows) {
        row.resize(width, Cell::Empty);
        match positions.get(&key) {
            None => {
                positions.insert(key, merged.len());
                merged.push(row);
            }
            Some(&position) => {
                let target = &mut merged[position];
                for (column, cell) in row.into_iter().enumerate() {
                    if column == columns.accumulator {
                        let total = target[column].as_number().unwrap_or(0.0)
                            + cell.as_number().unwrap_or(0.0);
                        target[column] = Cell::Number(total);
                    } else if target[column].is_empty() && !cell.is_empty() {
                        target[column] = cell;
                    }
                }
            }
        }
    }

    table.rows = merged;
    before - table.len()
}

/// Replaces the forward column of every row whose CNPJ appears in `schedule`
/// with the scheduled value. Rows without a usable CNPJ or without a scheduled
/// value keep what they had. Returns the number of rows replaced.
pub fn replace_forward(
    table: &mut Table,
    columns: &LedgerColumns,
    schedule: &ReferenceTable<String>,
    label: &str,
) -> usize {
    let mut replaced = 0;
    for row in 0..table.len() {
        let cnpj = normalize::cnpj(&table.cell(row, columns.id).to_string());
        if cnpj.is_empty() {
            continue;
        }
        let Some(value) = schedule.value(&cnpj, label) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        table.set(row, columns.forward, value.clone());
        replaced += 1;
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Policy, Reduce, aggregate};

    const COLUMNS: LedgerColumns = LedgerColumns {
        id: 0,
        name: 1,
        accumulator: 2,
        forward: 3,
    };

    const LABELS: PaymentLabels<'static> = PaymentLabels {
        amount: "pagamento",
        id: "cnpj",
        name: "nome",
    };

    fn report(rows: &[(&str, &str, f64, f64)]) -> Table {
        let mut table = Table::new(
            "Sheet1",
            vec![
                "CNPJ".to_string(),
                "Razão Social".to_string(),
                "Liquidado".to_string(),
                "A liquidar".to_string(),
                "Obs".to_string(),
            ],
        );
        for (id, name, paid, future) in rows {
            table.push_row(vec![
                Cell::from(*id),
                Cell::from(*name),
                Cell::Number(*paid),
                Cell::Number(*future),
                Cell::from("obs"),
            ]);
        }
        table
    }

    fn payments(rows: &[(&str, &str, f64)]) -> ReferenceTable<LedgerKey> {
        let mut table = Table::new(
            "Export",
            vec!["CPF/CNPJ".to_string(), "Razão Social".to_string(), "Pagamentos".to_string()],
        );
        for (id, name, amount) in rows {
            table.push_row(vec![Cell::from(*id), Cell::from(*name), Cell::Number(*amount)]);
        }
        aggregate(
            &table,
            |row| key_at(&table, row, 0, 1),
            &[
                Policy::new(LABELS.amount, 2, Reduce::Sum),
                Policy::new(LABELS.id, 0, Reduce::First),
                Policy::new(LABELS.name, 1, Reduce::First),
            ],
        )
    }

    #[test]
    fn payments_add_to_matching_rows() {
        let mut table = report(&[("11.222.333/0001-44", "Loja A", 100.0, 5.0)]);
        let reference = payments(&[("11222333000144", "LOJA A ", 20.0), ("11222333000144", "loja a", 5.0)]);

        let summed = add_payments(&mut table, &COLUMNS, &reference, LABELS);

        assert_eq!(summed, 1);
        assert_eq!(table.cell(0, 2), &Cell::Number(125.0));
    }

    #[test]
    fn unknown_merchant_is_appended_once() {
        let mut table = report(&[("11222333000144", "Loja A", 100.0, 5.0)]);
        let reference = payments(&[
            ("55666777000188.0", "Loja Nova", 30.0),
            ("55666777000188", "loja nova", 12.5),
        ]);

        let appended = append_missing(&mut table, &COLUMNS, &reference, LABELS);

        assert_eq!(appended.len(), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(1, 0), &Cell::from("55666777000188"));
        assert_eq!(table.cell(1, 1), &Cell::from("Loja Nova"));
        assert_eq!(table.cell(1, 2), &Cell::Number(42.5));
        assert_eq!(table.cell(1, 3), &Cell::Number(0.0));
        assert_eq!(table.cell(1, 4), &Cell::Empty);
    }

    #[test]
    fn known_merchants_are_not_appended() {
        let mut table = report(&[("11222333000144", "Loja A", 100.0, 5.0)]);
        let reference = payments(&[("11.222.333/0001-44", "LOJA A", 1.0)]);
        assert!(append_missing(&mut table, &COLUMNS, &reference, LABELS).is_empty());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn dedup_sums_accumulator_and_keeps_first_values() {
        let mut table = report(&[
            ("11222333000144", "Loja A", 10.0, 5.0),
            ("99888777000166", "Loja B", 1.0, 1.0),
            ("11.222.333/0001-44", "LOJA A", 15.0, 9.0),
        ]);

        let removed = dedup(&mut table, &COLUMNS);

        assert_eq!(removed, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), &Cell::from("11222333000144"));
        assert_eq!(table.cell(0, 2), &Cell::Number(25.0));
        assert_eq!(table.cell(0, 3), &Cell::Number(5.0));
        assert_eq!(table.cell(1, 1), &Cell::from("Loja B"));
    }

    #[test]
    fn dedup_is_idempotent() {
        let mut table = report(&[
            ("1", "a", 1.0, 1.0),
            ("1", "A", 2.0, 2.0),
            ("2", "b", 3.0, 3.0),
            ("2", "b", 4.0, 4.0),
            ("3", "c", 5.0, 5.0),
        ]);
        dedup(&mut table, &COLUMNS);
        let once = table.clone();
        assert_eq!(dedup(&mut table, &COLUMNS), 0);
        assert_eq!(table, once);
    }

    #[test]
    fn forward_value_replaced_only_on_match() {
        let mut table = report(&[
            ("11222333000144", "Loja A", 0.0, 5.0),
            ("99888777000166", "Loja B", 0.0, 7.0),
            ("", "Sem CNPJ", 0.0, 3.0),
        ]);
        let mut schedule = Table::new("Planilha1", vec!["Cnpj".to_string(), "Valor".to_string()]);
        schedule.push_row(vec![Cell::from("11.222.333/0001-44"), Cell::Number(50.0)]);
        schedule.push_row(vec![Cell::from("11222333000144"), Cell::Number(60.0)]);
        schedule.push_row(vec![Cell::from(""), Cell::Number(99.0)]);
        let schedule = aggregate(
            &schedule,
            |row| normalize::cnpj(&schedule.cell(row, 0).to_string()),
            &[Policy::new("valor", 1, Reduce::First)],
        );

        let replaced = replace_forward(&mut table, &COLUMNS, &schedule, "valor");

        assert_eq!(replaced, 1);
        assert_eq!(table.cell(0, 3), &Cell::Number(50.0));
        assert_eq!(table.cell(1, 3), &Cell::Number(7.0));
        assert_eq!(table.cell(2, 3), &Cell::Number(3.0));
    }

    #[test]
    fn coercion_counts_zero_fallbacks() {
        let mut table = Table::new("Sheet1", vec!["Valor".to_string()]);
        table.push_row(vec![Cell::from("12.5")]);
        table.push_row(vec![Cell::Empty]);
        table.push_row(vec![Cell::from("abc")]);
        assert_eq!(coerce_numeric(&mut table, 0), 2);
        assert_eq!(table.cell(0, 0), &Cell::Number(12.5));
        assert_eq!(table.cell(2, 0), &Cell::Number(0.0));
    }
}
