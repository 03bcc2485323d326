use sheet_recon::config::{SheetRef, WeeklyConfig};
use sheet_recon::jobs::weekly;
use sheet_recon::{ToolError, logging};
use tempfile::tempdir;

// The subscriber is process-wide, so this file holds a single test.
#[test]
fn failed_weekly_run_is_written_to_the_log_file() {
    let dir = tempdir().expect("temporary directory");
    let log_path = dir.path().join("controle_semanal.log");
    logging::init(Some(&log_path)).expect("subscriber installed");

    let config = WeeklyConfig {
        previous: SheetRef::new(dir.path().join("ausente.xlsx"), "Sheet1"),
        ..WeeklyConfig::default()
    };
    let error = weekly::run(&config).expect_err("missing report is fatal");
    assert!(matches!(error, ToolError::MissingInput(_)), "{error}");

    let log = std::fs::read_to_string(&log_path).expect("log file readable");
    assert!(log.contains("ERROR"), "{log}");
    assert!(log.contains("input file not found"), "{log}");
    assert!(log.contains("ausente.xlsx"), "{log}");
}
