//! Group-by reduction of a source sheet into a keyed reference table.

use std::collections::BTreeMap;

use crate::model::{Cell, Table};

/// How duplicate rows of one key collapse into a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    /// Numeric total; non-numeric cells are skipped.
    Sum,
    /// First non-empty value in original row order.
    First,
    /// Number of rows in the group.
    Count,
}

/// One payload column of a reference table and its reduction.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    /// Output label of the payload value.
    pub label: String,
    /// Source column; ignored by [`Reduce::Count`].
    pub column: Option<usize>,
    pub reduce: Reduce,
}

impl Policy {
    pub fn new(label: impl Into<String>, column: usize, reduce: Reduce) -> Self {
        Self {
            label: label.into(),
            column: Some(column),
            reduce,
        }
    }

    pub fn count(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            column: None,
            reduce: Reduce::Count,
        }
    }
}

/// Aggregated payload for each normalised key, iterated in key order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable<K: Ord> {
    labels: Vec<String>,
    entries: BTreeMap<K, Vec<Cell>>,
}

impl<K: Ord> ReferenceTable<K> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[Cell])> + '_ {
        self.entries
            .iter()
            .map(|(key, payload)| (key, payload.as_slice()))
    }

    /// Payload value of `key` for the payload labelled `label`.
    pub fn value(&self, key: &K, label: &str) -> Option<&Cell> {
        let position = self.labels.iter().position(|existing| existing == label)?;
        self.entries.get(key).and_then(|payload| payload.get(position))
    }
}

/// Groups the rows of `table` by `key_fn` and reduces each payload column with
/// its policy. Reduction is applied in original row order, so `First` picks
/// the earliest row and `Sum` does not depend on order at all.
pub fn aggregate<K, F>(table: &Table, mut key_fn: F, policies: &[Policy]) -> ReferenceTable<K>
where
    K: Ord,
    F: FnMut(usize) -> K,
{
    let mut entries: BTreeMap<K, Vec<Cell>> = BTreeMap::new();

    for row in 0..table.len() {
        let key = key_fn(row);
        let payload = entries.entry(key).or_insert_with(|| {
            policies
                .iter()
                .map(|policy| match policy.reduce {
                    Reduce::Sum | Reduce::Count => Cell::Number(0.0),
                    Reduce::First => Cell::Empty,
                })
                .collect()
        });

        for (slot, policy) in payload.iter_mut().zip(policies) {
            let cell = policy.column.map(|column| table.cell(row, column));
            reduce_into(slot, policy.reduce, cell);
        }
    }

    ReferenceTable {
        labels: policies.iter().map(|policy| policy.label.clone()).collect(),
        entries,
    }
}

fn reduce_into(slot: &mut Cell, reduce: Reduce, cell: Option<&Cell>) {
    match reduce {
        Reduce::Sum => {
            if let (Cell::Number(total), Some(value)) = (slot, cell.and_then(Cell::as_number)) {
                *total += value;
            }
        }
        Reduce::First => {
            if let Some(value) = cell {
                if slot.is_empty() && !value.is_empty() {
                    *slot = value.clone();
                }
            }
        }
        Reduce::Count => {
            if let Cell::Number(count) = slot {
                *count += 1.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;

    fn reference(rows: &[(&str, Cell, &str)]) -> Table {
        let mut table = Table::new(
            "Sheet1",
            vec!["CNPJ".to_string(), "Qtd".to_string(), "Nome".to_string()],
        );
        for (key, quantity, name) in rows {
            table.push_row(vec![Cell::from(*key), quantity.clone(), Cell::from(*name)]);
        }
        table
    }

    fn by_cnpj(table: &Table) -> impl FnMut(usize) -> String + '_ {
        move |row| normalize::cnpj(&table.cell(row, 0).to_string())
    }

    #[test]
    fn duplicate_keys_sum_quantities() {
        let table = reference(&[
            ("11222333000144", Cell::Number(5.0), "Loja"),
            ("11.222.333/0001-44", Cell::Number(3.0), "Loja"),
        ]);
        let aggregated = aggregate(&table, by_cnpj(&table), &[Policy::new("Qtd", 1, Reduce::Sum)]);

        assert_eq!(aggregated.len(), 1);
        assert_eq!(
            aggregated.value(&"11222333000144".to_string(), "Qtd"),
            Some(&Cell::Number(8.0))
        );
    }

    #[test]
    fn sum_ignores_row_order() {
        let rows = [
            ("1", Cell::Number(1.5), "a"),
            ("2", Cell::Number(2.0), "b"),
            ("1", Cell::from("4"), "c"),
            ("1", Cell::Empty, "d"),
        ];
        let forward = reference(&rows);
        let mut reversed_rows = rows.to_vec();
        reversed_rows.reverse();
        let backward = reference(&reversed_rows);

        let policies = [Policy::new("Qtd", 1, Reduce::Sum)];
        let lhs = aggregate(&forward, by_cnpj(&forward), &policies);
        let rhs = aggregate(&backward, by_cnpj(&backward), &policies);
        assert_eq!(lhs, rhs);
        assert_eq!(lhs.value(&"1".to_string(), "Qtd"), Some(&Cell::Number(5.5)));
    }

    #[test]
    fn first_takes_earliest_non_empty_value() {
        let table = reference(&[
            ("1", Cell::Empty, ""),
            ("1", Cell::Number(1.0), "segunda"),
            ("1", Cell::Number(2.0), "terceira"),
        ]);
        let aggregated = aggregate(&table, by_cnpj(&table), &[Policy::new("Nome", 2, Reduce::First)]);
        assert_eq!(
            aggregated.value(&"1".to_string(), "Nome"),
            Some(&Cell::from("segunda"))
        );
    }

    #[test]
    fn count_and_compound_keys() {
        let table = reference(&[
            ("1", Cell::Empty, "a"),
            ("1", Cell::Empty, "a"),
            ("1", Cell::Empty, "b"),
        ]);
        let aggregated = aggregate(
            &table,
            |row| {
                (
                    normalize::cnpj(&table.cell(row, 0).to_string()),
                    table.cell(row, 2).to_string(),
                )
            },
            &[Policy::count("Quantidade")],
        );

        let keys: Vec<_> = aggregated.keys().cloned().collect();
        assert_eq!(
            keys,
            vec![("1".to_string(), "a".to_string()), ("1".to_string(), "b".to_string())]
        );
        assert_eq!(
            aggregated.value(&("1".to_string(), "a".to_string()), "Quantidade"),
            Some(&Cell::Number(2.0))
        );
    }

    #[test]
    fn empty_table_aggregates_to_nothing() {
        let table = reference(&[]);
        let aggregated = aggregate(&table, by_cnpj(&table), &[Policy::new("Qtd", 1, Reduce::Sum)]);
        assert!(aggregated.is_empty());
    }
}
