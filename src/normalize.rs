//! Canonicalisation of join keys.
//!
//! Identifiers arrive with punctuation (`12.345.678/0001-99`), as numbers that
//! were read back as floats (`12345678000199.0`), or with stray whitespace and
//! casing. Both sides of a join go through the same transform before they are
//! compared.

use crate::model::{Cell, Table};

/// Selects which normaliser applies to a key column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// CNPJ/CPF identifiers: digits only.
    Cnpj,
    /// Company names: lowercase, trimmed.
    Name,
}

impl KeyKind {
    pub fn apply(self, raw: &str) -> String {
        match self {
            KeyKind::Cnpj => cnpj(raw),
            KeyKind::Name => name(raw),
        }
    }

    pub fn apply_cell(self, cell: &Cell) -> String {
        self.apply(&cell.to_string())
    }
}

/// Keeps only the digits of a CNPJ/CPF. A trailing `.0` left by a numeric
/// misread is dropped first so it does not add a digit. An empty result means
/// the row has no usable identifier.
pub fn cnpj(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_float_suffix = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    without_float_suffix
        .chars()
        .filter(char::is_ascii_digit)
        .collect()
}

/// Lowercases and trims a company name.
pub fn name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Removes a trailing `.0` float artifact while keeping the rest of the text
/// as written.
pub fn strip_float_suffix(raw: &str) -> &str {
    raw.strip_suffix(".0").unwrap_or(raw)
}

/// Normalises every value of `column`. Tables without rows give an empty
/// vector.
pub fn normalize_column(table: &Table, column: usize, kind: KeyKind) -> Vec<String> {
    table
        .column_values(column)
        .map(|cell| kind.apply_cell(cell))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cnpj_keeps_only_digits() {
        assert_eq!(cnpj("12.345.678/0001-99"), "12345678000199");
        assert_eq!(cnpj(" 123.456.789-09 "), "12345678909");
    }

    #[test]
    fn cnpj_drops_float_artifact() {
        assert_eq!(cnpj("12345678000199.0"), "12345678000199");
        assert_eq!(cnpj("12345678000199.0 "), "12345678000199");
    }

    #[test]
    fn cnpj_is_idempotent() {
        for raw in ["12.345.678/0001-99", "12345678000199.0", "abc", "", "00.000.000/0001-00"] {
            let once = cnpj(raw);
            assert_eq!(cnpj(&once), once);
        }
    }

    #[test]
    fn cnpj_without_digits_is_empty() {
        assert_eq!(cnpj("nan"), "");
        assert_eq!(cnpj(""), "");
    }

    #[test]
    fn names_ignore_case_and_outer_whitespace() {
        assert_eq!(name("  ACME Ltda "), name("acme ltda"));
        assert_eq!(name("Padaria São João"), "padaria são joão");
        let once = name(" MiXeD ");
        assert_eq!(name(&once), once);
    }

    #[test]
    fn numeric_cells_normalise_like_text() {
        assert_eq!(
            KeyKind::Cnpj.apply_cell(&Cell::Number(11222333000144.0)),
            "11222333000144"
        );
        assert_eq!(KeyKind::Name.apply_cell(&Cell::Empty), "");
    }

    #[test]
    fn empty_table_gives_empty_column() {
        let table = Table::new("Sheet1", vec!["CNPJ".to_string()]);
        assert!(normalize_column(&table, 0, KeyKind::Cnpj).is_empty());
    }
}
