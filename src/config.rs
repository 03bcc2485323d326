//! Job configuration.
//!
//! Every job is driven by an immutable configuration struct built once at
//! start-up. The `Default` of each struct holds the workbook, sheet and column
//! names the jobs were written for; a JSON file passed with `--config` may
//! override any subset of fields.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::matcher::{CNPJ_THRESHOLD, NAME_THRESHOLD};

/// Common behaviour of job configuration structs.
pub trait JobConfig: Serialize + DeserializeOwned + Default {
    /// Rejects values no run could succeed with.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Loads a configuration from `path`, or the defaults when no path is given.
pub fn load<T: JobConfig>(path: Option<&Path>) -> Result<T> {
    let config = match path {
        Some(path) => {
            if !path.exists() {
                return Err(ToolError::MissingInput(path.to_path_buf()));
            }
            debug!(path = %path.display(), "loading configuration file");
            let source = fs::read_to_string(path)?;
            serde_json::from_str::<T>(&source)?
        }
        None => T::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Pretty JSON rendering of a configuration, used by `defaults`.
pub fn to_json<T: JobConfig>(config: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

fn check_threshold(name: &str, value: u8) -> Result<()> {
    if value > 100 {
        return Err(ToolError::Config(format!(
            "{name} must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}

/// A worksheet inside a workbook file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRef {
    pub path: PathBuf,
    pub sheet: String,
}

impl SheetRef {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.into(),
        }
    }
}

/// Device count per company from the inventory sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InventoryConfig {
    pub input: SheetRef,
    pub company_column: String,
    pub cnpj_column: String,
    pub serial_column: String,
    /// Label the serial column is renamed to.
    pub device_label: String,
    pub count_column: String,
    pub output: PathBuf,
    pub output_sheet: String,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            input: SheetRef::new("principal.xlsx", "Inventário Analítico SPD"),
            company_column: "RAZÃO EMPRESARIAL".to_string(),
            cnpj_column: "CNPJ".to_string(),
            serial_column: "NÚMERO DE SÉRIE DA POS".to_string(),
            device_label: "MÁQUINA".to_string(),
            count_column: "Quantidade de Máquinas".to_string(),
            output: PathBuf::from("quantidade_maquinas_por_empresa.xlsx"),
            output_sheet: "Sheet1".to_string(),
        }
    }
}

impl JobConfig for InventoryConfig {}

/// Device-return sheet filled from the device count by CNPJ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceReturnConfig {
    pub input: SheetRef,
    pub description_column: String,
    pub cnpj_column: String,
    pub target_column: String,
    /// Device count workbook; its first sheet is read when `reference_sheet`
    /// is not set.
    pub reference: PathBuf,
    pub reference_sheet: Option<String>,
    pub reference_company_column: String,
    pub reference_cnpj_column: String,
    pub reference_quantity_column: String,
    pub threshold: u8,
    pub output: PathBuf,
}

impl Default for DeviceReturnConfig {
    fn default() -> Self {
        Self {
            input: SheetRef::new("principal.xlsx", "Devolução de Maquininhas - Inat"),
            description_column: "Descrição".to_string(),
            cnpj_column: "CPF/CNPJ".to_string(),
            target_column: "POS Planilha".to_string(),
            reference: PathBuf::from("quantidade_maquinas_por_empresa.xlsx"),
            reference_sheet: None,
            reference_company_column: "RAZÃO EMPRESARIAL".to_string(),
            reference_cnpj_column: "CNPJ".to_string(),
            reference_quantity_column: "Quantidade de Máquinas".to_string(),
            threshold: CNPJ_THRESHOLD,
            output: PathBuf::from("devolucao_maquininhas_atualizada_por_cnpj_fuzzy.xlsx"),
        }
    }
}

impl JobConfig for DeviceReturnConfig {
    fn validate(&self) -> Result<()> {
        check_threshold("threshold", self.threshold)
    }
}

/// Device-return sheet enriched from the BI export by company name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PosBiConfig {
    pub source: SheetRef,
    pub source_name_column: String,
    pub allocated_column: String,
    pub unused_column: String,
    /// Workbook updated in place; only this sheet is rewritten.
    pub destination: SheetRef,
    pub destination_name_column: String,
    pub allocated_target: String,
    pub unused_target: String,
    pub threshold: u8,
}

impl Default for PosBiConfig {
    fn default() -> Self {
        Self {
            source: SheetRef::new("pos_bi.xlsx", "Export"),
            source_name_column: "Razão Social".to_string(),
            allocated_column: "Total POS Alocadas".to_string(),
            unused_column: "Total POS Não Utilizadas".to_string(),
            destination: SheetRef::new(
                "devolucao_maquininhas_atualizada_por_cnpj_fuzzy.xlsx",
                "Devolução de Maquininhas - Inat",
            ),
            destination_name_column: "Descrição".to_string(),
            allocated_target: "POS Adiq".to_string(),
            unused_target: "POS NÃO UTILIZADA".to_string(),
            threshold: NAME_THRESHOLD,
        }
    }
}

impl JobConfig for PosBiConfig {
    fn validate(&self) -> Result<()> {
        check_threshold("threshold", self.threshold)
    }
}

/// Weekly settlement control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeeklyConfig {
    /// Parallel log file; `null` disables it.
    pub log_file: Option<PathBuf>,

    /// Running report, updated in place.
    pub previous: SheetRef,
    pub previous_cnpj_column: String,
    pub previous_name_column: String,
    pub previous_settled_column: String,
    pub previous_scheduled_column: String,

    /// Payments of the week, added to the settled total.
    pub weekly: SheetRef,
    pub weekly_cnpj_column: String,
    pub weekly_name_column: String,
    pub weekly_payments_column: String,

    /// Latest schedule, replacing the scheduled value.
    pub future: SheetRef,
    pub future_cnpj_column: String,
    pub future_name_column: String,
    pub future_amount_column: String,
}

impl Default for WeeklyConfig {
    fn default() -> Self {
        Self {
            log_file: Some(PathBuf::from("controle_semanal.log")),
            previous: SheetRef::new("anterior.xlsx", "Sheet1"),
            previous_cnpj_column: "CNPJ/CPF do EC \n(sem / ou -)".to_string(),
            previous_name_column: "Razão Social do EC".to_string(),
            previous_settled_column: "Valor já liquidado ao EC até a data base".to_string(),
            previous_scheduled_column:
                "Valor a liquidar ao EC a partir da data base \n(agenda futura)".to_string(),
            weekly: SheetRef::new("semana 18 a 25.xlsx", "Export"),
            weekly_cnpj_column: "CPF/CNPJ".to_string(),
            weekly_name_column: "Razão Social".to_string(),
            weekly_payments_column: "Pagamentos ECs Relatorio".to_string(),
            future: SheetRef::new("adicional2207.xlsx", "Planilha1"),
            future_cnpj_column: "Cnpj".to_string(),
            future_name_column: "Nome".to_string(),
            future_amount_column: "Valor a Antecipar".to_string(),
        }
    }
}

impl JobConfig for WeeklyConfig {
    fn validate(&self) -> Result<()> {
        if self.previous_settled_column == self.previous_scheduled_column {
            return Err(ToolError::Config(
                "settled and scheduled columns must differ".to_string(),
            ));
        }
        Ok(())
    }
}

/// Account closure decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountClosureConfig {
    pub input: PathBuf,
    pub actions_sheet: String,
    pub decisions_sheet: String,
    pub output: PathBuf,
    pub account_column: String,
    pub action_column: String,
    pub detail_column: String,
    pub decision_column: String,
    pub justification_column: String,
}

impl Default for AccountClosureConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("PAMELA MESCLAR.xlsx"),
            actions_sheet: "Planilha1".to_string(),
            decisions_sheet: "Planilha2".to_string(),
            output: PathBuf::from("PLANILHA FINAL.xlsx"),
            account_column: "Conta".to_string(),
            action_column: "Excluir".to_string(),
            detail_column: "DETALHAR MOTIVO".to_string(),
            decision_column: "ENCERRAR? (Sim ou Não)".to_string(),
            justification_column:
                "Informar na planilha, na linha da conta o motivo de não encerrar:".to_string(),
        }
    }
}

impl JobConfig for AccountClosureConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: DeviceReturnConfig =
            serde_json::from_str(r#"{ "threshold": 95 }"#).expect("partial config parses");
        assert_eq!(config.threshold, 95);
        assert_eq!(config.target_column, "POS Planilha");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = serde_json::from_str::<PosBiConfig>(r#"{ "treshold": 70 }"#);
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let config = PosBiConfig {
            threshold: 101,
            ..PosBiConfig::default()
        };
        assert!(matches!(config.validate(), Err(ToolError::Config(_))));
    }

    #[test]
    fn load_without_path_uses_defaults() {
        let config: AccountClosureConfig = load(None).expect("defaults load");
        assert_eq!(config, AccountClosureConfig::default());
    }
}
