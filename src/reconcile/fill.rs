use tracing::{debug, trace};

use crate::aggregate::ReferenceTable;
use crate::matcher::{FuzzyMatcher, Scorer};
use crate::model::{Cell, Table};
use crate::normalize::KeyKind;

/// Copies one payload value of the reference into a destination column.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Payload label in the reference table.
    pub payload: String,
    /// Destination column, created when missing.
    pub column: String,
}

impl Target {
    pub fn new(payload: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            column: column.into(),
        }
    }
}

/// Parameters of one fuzzy fill pass.
#[derive(Debug, Clone)]
pub struct FuzzyFill {
    /// Destination column holding the raw key.
    pub key_column: usize,
    pub key_kind: KeyKind,
    pub scorer: Scorer,
    pub threshold: u8,
    pub targets: Vec<Target>,
}

/// Outcome of a fill pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillReport {
    pub rows: usize,
    pub updated: usize,
    pub threshold: u8,
}

impl FillReport {
    /// Zero updates usually means the threshold or the data needs a look.
    pub fn nothing_updated(&self) -> bool {
        self.updated == 0
    }
}

/// Fills the target columns of `destination` from the best reference match of
/// each row's normalised key.
///
/// Target columns are cleared first. A row only receives values when its best
/// candidate scores at least `fill.threshold`; otherwise its targets stay
/// empty. A row counts as updated when at least one non-empty value lands.
pub fn fuzzy_fill(
    destination: &mut Table,
    reference: &ReferenceTable<String>,
    fill: &FuzzyFill,
) -> FillReport {
    let columns: Vec<(usize, &str)> = fill
        .targets
        .iter()
        .map(|target| (destination.ensure_column(&target.column), target.payload.as_str()))
        .collect();

    for row in 0..destination.len() {
        for (column, _) in &columns {
            destination.set(row, *column, Cell::Empty);
        }
    }

    let matcher = FuzzyMatcher::new(reference.keys().cloned().collect(), fill.scorer, fill.threshold);
    let mut updated = 0;

    if matcher.candidates().is_empty() {
        debug!("reference has no keys, nothing to match");
    } else {
        for row in 0..destination.len() {
            let key = fill.key_kind.apply_cell(destination.cell(row, fill.key_column));
            let Some(found) = matcher.find(&key) else {
                continue;
            };
            trace!(row, query = %key, matched = %found.key, score = found.score, "match accepted");

            let mut wrote_value = false;
            for (column, payload) in &columns {
                if let Some(value) = reference.value(&found.key, payload) {
                    wrote_value |= !value.is_empty();
                    destination.set(row, *column, value.clone());
                }
            }
            if wrote_value {
                updated += 1;
            }
        }
    }

    FillReport {
        rows: destination.len(),
        updated,
        threshold: fill.threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Policy, Reduce, aggregate};
    use crate::matcher::CNPJ_THRESHOLD;
    use crate::normalize;

    fn quantities(rows: &[(&str, f64)]) -> ReferenceTable<String> {
        let mut table = Table::new("Sheet1", vec!["CNPJ".to_string(), "Qtd".to_string()]);
        for (key, quantity) in rows {
            table.push_row(vec![Cell::from(*key), Cell::Number(*quantity)]);
        }
        aggregate(
            &table,
            |row| normalize::cnpj(&table.cell(row, 0).to_string()),
            &[Policy::new("Qtd", 1, Reduce::Sum)],
        )
    }

    fn destination(keys: &[&str]) -> Table {
        let mut table = Table::new(
            "Devolução",
            vec!["CPF/CNPJ".to_string(), "POS Planilha".to_string()],
        );
        for key in keys {
            table.push_row(vec![Cell::from(*key), Cell::from("stale")]);
        }
        table
    }

    fn cnpj_fill() -> FuzzyFill {
        FuzzyFill {
            key_column: 0,
            key_kind: KeyKind::Cnpj,
            scorer: Scorer::Ratio,
            threshold: CNPJ_THRESHOLD,
            targets: vec![Target::new("Qtd", "POS Planilha")],
        }
    }

    #[test]
    fn formatted_cnpj_receives_summed_quantity() {
        let reference = quantities(&[("11222333000144", 5.0), ("11222333000144", 3.0)]);
        let mut table = destination(&["11.222.333/0001-44"]);

        let report = fuzzy_fill(&mut table, &reference, &cnpj_fill());

        assert_eq!(table.cell(0, 1), &Cell::Number(8.0));
        assert_eq!(report.updated, 1);
        assert_eq!(report.rows, 1);
    }

    #[test]
    fn below_threshold_rows_stay_unset() {
        let reference = quantities(&[("11111111000111", 1.0), ("22222222000122", 2.0)]);
        let mut table = destination(&["99999999000199"]);

        let report = fuzzy_fill(&mut table, &reference, &cnpj_fill());

        assert_eq!(table.cell(0, 1), &Cell::Empty);
        assert_eq!(report.updated, 0);
        assert!(report.nothing_updated());
    }

    #[test]
    fn filled_values_come_from_keys_above_threshold() {
        let reference = quantities(&[
            ("11222333000145", 7.0),
            ("55666777000188", 2.0),
            ("12345678000199", 4.0),
        ]);
        let keys = ["11222333000144", "00000000000000", "", "12.345.678/0001-99"];
        let mut table = destination(&keys);
        let fill = cnpj_fill();

        fuzzy_fill(&mut table, &reference, &fill);

        let matcher = FuzzyMatcher::new(reference.keys().cloned().collect(), Scorer::Ratio, 0);
        for (row, raw) in keys.iter().enumerate() {
            let value = table.cell(row, 1);
            if value.is_empty() {
                continue;
            }
            let best = matcher
                .best_match(&normalize::cnpj(raw))
                .expect("filled rows have a candidate");
            assert!(best.score >= fill.threshold);
            assert_eq!(reference.value(&best.key, "Qtd"), Some(value));
        }
        assert_eq!(table.cell(0, 1), &Cell::Number(7.0));
        assert_eq!(table.cell(2, 1), &Cell::Empty);
    }

    #[test]
    fn missing_target_column_is_created() {
        let reference = quantities(&[("11222333000144", 1.0)]);
        let mut table = Table::new("Devolução", vec!["CPF/CNPJ".to_string()]);
        table.push_row(vec![Cell::from("11222333000144")]);

        let mut fill = cnpj_fill();
        fill.targets = vec![Target::new("Qtd", "Nova")];
        fuzzy_fill(&mut table, &reference, &fill);

        assert_eq!(table.columns, vec!["CPF/CNPJ".to_string(), "Nova".to_string()]);
        assert_eq!(table.cell(0, 1), &Cell::Number(1.0));
    }

    #[test]
    fn empty_reference_clears_targets() {
        let reference = quantities(&[]);
        let mut table = destination(&["11222333000144"]);
        let report = fuzzy_fill(&mut table, &reference, &cnpj_fill());
        assert_eq!(table.cell(0, 1), &Cell::Empty);
        assert_eq!(report.updated, 0);
    }
}
