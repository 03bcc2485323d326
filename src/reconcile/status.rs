//! Close/keep decision derivation for bank accounts.

use std::collections::HashMap;

use crate::model::{Cell, Table};

pub const CLOSE: &str = "ENCERRAR";
pub const KEEP: &str = "NAO ENCERRAR";

const CLOSE_MARKER: &str = "encerrar";
const KEEP_MARKER: &str = "manter";

/// Column positions in the sheet listing each account's requested action.
#[derive(Debug, Clone, Copy)]
pub struct ActionColumns {
    pub account: usize,
    /// Free text such as "Encerrar" or "Manter conta".
    pub action: usize,
    /// Detail copied as justification when the account is kept.
    pub detail: usize,
}

/// Column positions in the sheet holding the decisions.
#[derive(Debug, Clone, Copy)]
pub struct DecisionColumns {
    pub account: usize,
    pub decision: usize,
    pub justification: usize,
}

/// An account of the decision sheet with no entry in the action sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAccount {
    pub account: String,
    /// Line in the worksheet, counting the header as line 1.
    pub line: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub derived: usize,
    pub justified: usize,
    pub unknown: Vec<UnknownAccount>,
}

/// Trims every value of the account column in place.
pub fn trim_accounts(table: &mut Table, column: usize) {
    for row in 0..table.len() {
        let trimmed = match table.cell(row, column) {
            Cell::Text(value) => Cell::Text(value.trim().to_string()),
            Cell::Empty => Cell::Empty,
            other => Cell::Text(other.to_string()),
        };
        table.set(row, column, trimmed);
    }
}

/// Fills empty decisions from the action text and copies the detail as
/// justification for kept accounts. When an account appears more than once in
/// the action sheet the last row is used.
pub fn derive_decisions(
    actions: &Table,
    action_columns: &ActionColumns,
    decisions: &mut Table,
    decision_columns: &DecisionColumns,
) -> StatusReport {
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in 0..actions.len() {
        let account = actions.cell(row, action_columns.account).to_string();
        index.insert(account.trim().to_string(), row);
    }

    let mut report = StatusReport::default();
    for row in 0..decisions.len() {
        let account = decisions
            .cell(row, decision_columns.account)
            .to_string()
            .trim()
            .to_string();
        let Some(&source) = index.get(&account) else {
            report.unknown.push(UnknownAccount {
                account,
                line: row + 2,
            });
            continue;
        };

        let action = actions
            .cell(source, action_columns.action)
            .to_string()
            .trim()
            .to_lowercase();
        let detail = actions
            .cell(source, action_columns.detail)
            .to_string()
            .trim()
            .to_string();

        if decisions.cell(row, decision_columns.decision).is_empty() {
            let derived = if action.contains(CLOSE_MARKER) {
                Some(CLOSE)
            } else if action.contains(KEEP_MARKER) {
                Some(KEEP)
            } else {
                None
            };
            if let Some(label) = derived {
                decisions.set(row, decision_columns.decision, Cell::from(label));
                report.derived += 1;
            }
        }

        let status = decisions
            .cell(row, decision_columns.decision)
            .to_string()
            .trim()
            .to_uppercase();
        let keeps_account = status == "NÃO" || status == KEEP;
        if keeps_account && decisions.cell(row, decision_columns.justification).is_empty() {
            let value = if detail.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(detail)
            };
            decisions.set(row, decision_columns.justification, value);
            report.justified += 1;
        }
    }

    report
}

/// Maps internal decision codes to their display labels.
pub fn relabel_decisions(decisions: &mut Table, column: usize) {
    for row in 0..decisions.len() {
        let label = match decisions.cell(row, column) {
            Cell::Text(value) if value == KEEP => "Não",
            Cell::Text(value) if value == CLOSE => "Sim",
            _ => continue,
        };
        decisions.set(row, column, Cell::from(label));
    }
}
