use std::fmt;
use std::path::PathBuf;

use tracing::{info, instrument, warn};

use crate::config::AccountClosureConfig;
use crate::error::Result;
use crate::io::{excel_read, excel_write};
use crate::jobs::locate_columns;
use crate::reconcile::status::{
    ActionColumns, DecisionColumns, StatusReport, derive_decisions, relabel_decisions,
    trim_accounts,
};
use crate::validate;

#[derive(Debug, Clone, PartialEq)]
pub struct AccountClosureReport {
    pub accounts: usize,
    pub status: StatusReport,
    pub output: PathBuf,
}

impl fmt::Display for AccountClosureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} accounts processed: {} decisions derived, {} justifications copied, saved to {}",
            self.accounts,
            self.status.derived,
            self.status.justified,
            self.output.display()
        )?;
        if self.status.unknown.is_empty() {
            return write!(f, "every account was found in the action sheet");
        }
        write!(f, "accounts not found in the action sheet (left unchanged):")?;
        for unknown in &self.status.unknown {
            write!(f, "\n  {} (line {})", unknown.account, unknown.line)?;
        }
        Ok(())
    }
}

/// Derives the close/keep decision of every account from the action sheet
/// and writes both sheets to a new workbook.
#[instrument(level = "info", skip_all, err, fields(input = %config.input.display()))]
pub fn run(config: &AccountClosureConfig) -> Result<AccountClosureReport> {
    let mut actions = excel_read::read_table(&config.input, &config.actions_sheet)?;
    let mut decisions = excel_read::read_table(&config.input, &config.decisions_sheet)?;
    validate::trim_headers(&mut actions);
    validate::trim_headers(&mut decisions);

    let action_positions = locate_columns(
        &actions,
        &[
            config.account_column.as_str(),
            config.action_column.as_str(),
            config.detail_column.as_str(),
        ],
        &config.actions_sheet,
        &config.input,
    )?;
    let decision_positions = locate_columns(
        &decisions,
        &[
            config.account_column.as_str(),
            config.decision_column.as_str(),
            config.justification_column.as_str(),
        ],
        &config.decisions_sheet,
        &config.input,
    )?;

    let action_columns = ActionColumns {
        account: action_positions[0],
        action: action_positions[1],
        detail: action_positions[2],
    };
    let decision_columns = DecisionColumns {
        account: decision_positions[0],
        decision: decision_positions[1],
        justification: decision_positions[2],
    };

    trim_accounts(&mut actions, action_columns.account);
    trim_accounts(&mut decisions, decision_columns.account);

    let status = derive_decisions(&actions, &action_columns, &mut decisions, &decision_columns);
    relabel_decisions(&mut decisions, decision_columns.decision);
    info!(
        derived = status.derived,
        justified = status.justified,
        "decisions derived"
    );
    for unknown in &status.unknown {
        warn!(account = %unknown.account, line = unknown.line, "account missing from the action sheet");
    }

    let accounts = decisions.len();
    excel_write::write_tables(&config.output, &[actions, decisions])?;

    Ok(AccountClosureReport {
        accounts,
        status,
        output: config.output.clone(),
    })
}
