use std::path::Path;

use tracing::debug;

use crate::error::{Result, ToolError};
use crate::model::Table;

/// Checks that every name in `required` is a column of `table`. All missing
/// columns are reported at once together with the columns that were found.
pub fn require_columns<S: AsRef<str>>(
    table: &Table,
    required: &[S],
    source_name: &str,
    path: &Path,
) -> Result<()> {
    let missing: Vec<String> = required
        .iter()
        .map(|column| column.as_ref())
        .filter(|column| !table.has_column(column))
        .map(str::to_string)
        .collect();

    if !missing.is_empty() {
        return Err(ToolError::MissingColumns {
            source_name: source_name.to_string(),
            path: path.to_path_buf(),
            missing,
            available: table.columns.clone(),
        });
    }

    debug!(source = source_name, "required columns present");
    Ok(())
}

/// Strips leading and trailing whitespace from every header.
pub fn trim_headers(table: &mut Table) {
    for column in &mut table.columns {
        let trimmed = column.trim();
        if trimmed.len() != column.len() {
            *column = trimmed.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table {
        Table::new(
            "Export",
            vec!["CPF/CNPJ".to_string(), "Razão Social".to_string()],
        )
    }

    #[test]
    fn present_columns_pass() {
        let result = require_columns(&table(), &["CPF/CNPJ"], "weekly", Path::new("w.xlsx"));
        assert!(result.is_ok());
    }

    #[test]
    fn reports_every_missing_column_and_what_exists() {
        let error = require_columns(
            &table(),
            &["CPF/CNPJ", "Pagamentos", "Valor"],
            "weekly",
            Path::new("w.xlsx"),
        )
        .expect_err("columns are missing");

        match error {
            ToolError::MissingColumns {
                missing, available, ..
            } => {
                assert_eq!(missing, vec!["Pagamentos".to_string(), "Valor".to_string()]);
                assert_eq!(available, table().columns);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn headers_lose_surrounding_whitespace() {
        let mut table = Table::new("Planilha1", vec![" Conta ".to_string(), "Excluir".to_string()]);
        trim_headers(&mut table);
        assert_eq!(table.columns, vec!["Conta".to_string(), "Excluir".to_string()]);
    }
}
