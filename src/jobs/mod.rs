//! Batch pipelines, one per command.
//!
//! Each job takes its configuration by reference, reads its workbooks, runs
//! the reconciliation steps and writes the result. The returned report is
//! printed by the command line entry point.

pub mod account_closure;
pub mod device_return;
pub mod inventory;
pub mod pos_bi;
pub mod weekly;

use std::path::Path;

use crate::error::{Result, ToolError};
use crate::model::Table;
use crate::validate;

/// Validates `required` against `table` and returns their positions, in the
/// order given.
pub(crate) fn locate_columns(
    table: &Table,
    required: &[&str],
    source_name: &str,
    path: &Path,
) -> Result<Vec<usize>> {
    validate::require_columns(table, required, source_name, path)?;
    required
        .iter()
        .map(|name| {
            table.column_index(name).ok_or_else(|| ToolError::MissingColumns {
                source_name: source_name.to_string(),
                path: path.to_path_buf(),
                missing: vec![name.to_string()],
                available: table.columns.clone(),
            })
        })
        .collect()
}
