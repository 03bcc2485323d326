use std::fmt::Display;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use sheet_recon::config::{
    self, AccountClosureConfig, DeviceReturnConfig, InventoryConfig, JobConfig, PosBiConfig,
    WeeklyConfig,
};
use sheet_recon::jobs::{account_closure, device_return, inventory, pos_bi, weekly};
use sheet_recon::{Result, logging};

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            std::process::exit(usage_exit_code(&error));
        }
    };
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

/// Help and version requests succeed; any other parse failure exits with 1
/// like every other error.
fn usage_exit_code(error: &clap::Error) -> i32 {
    if error.use_stderr() { 1 } else { 0 }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Inventory(args) => {
            let config: InventoryConfig = load(&args)?;
            logging::init(None)?;
            report(inventory::run(&config)?)
        }
        Command::DeviceReturn(args) => {
            let config: DeviceReturnConfig = load(&args)?;
            logging::init(None)?;
            report(device_return::run(&config)?)
        }
        Command::PosBi(args) => {
            let config: PosBiConfig = load(&args)?;
            logging::init(None)?;
            report(pos_bi::run(&config)?)
        }
        Command::Weekly(args) => {
            let config: WeeklyConfig = load(&args)?;
            logging::init(config.log_file.as_deref())?;
            report(weekly::run(&config)?)
        }
        Command::AccountClosure(args) => {
            let config: AccountClosureConfig = load(&args)?;
            logging::init(None)?;
            report(account_closure::run(&config)?)
        }
        Command::Defaults { job } => print_defaults(job),
    }
}

fn load<T: JobConfig>(args: &JobArgs) -> Result<T> {
    config::load(args.config_path())
}

fn report(summary: impl Display) -> Result<()> {
    println!("{summary}");
    Ok(())
}

fn print_defaults(job: JobKind) -> Result<()> {
    let json = match job {
        JobKind::Inventory => config::to_json(&InventoryConfig::default())?,
        JobKind::DeviceReturn => config::to_json(&DeviceReturnConfig::default())?,
        JobKind::PosBi => config::to_json(&PosBiConfig::default())?,
        JobKind::Weekly => config::to_json(&WeeklyConfig::default())?,
        JobKind::AccountClosure => config::to_json(&AccountClosureConfig::default())?,
    };
    println!("{json}");
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Reconcile spreadsheet records by CNPJ/CPF and company name."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count inventory devices per company.
    Inventory(JobArgs),
    /// Fill the device-return sheet with device counts matched by CNPJ.
    DeviceReturn(JobArgs),
    /// Fill POS totals from the BI export matched by company name.
    PosBi(JobArgs),
    /// Update the weekly settlement control.
    Weekly(JobArgs),
    /// Derive close/keep decisions for bank accounts.
    AccountClosure(JobArgs),
    /// Print the default configuration of a job as JSON.
    Defaults {
        #[arg(value_enum)]
        job: JobKind,
    },
}

#[derive(clap::Args)]
struct JobArgs {
    /// JSON file overriding any of the default settings.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl JobArgs {
    fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum JobKind {
    Inventory,
    DeviceReturn,
    PosBi,
    Weekly,
    AccountClosure,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_exit_code(args: &[&str]) -> Option<i32> {
        Cli::try_parse_from(args).err().map(|error| usage_exit_code(&error))
    }

    #[test]
    fn usage_errors_exit_with_one() {
        assert_eq!(parse_exit_code(&["sheet-recon", "bogus"]), Some(1));
        assert_eq!(parse_exit_code(&["sheet-recon"]), Some(1));
        assert_eq!(parse_exit_code(&["sheet-recon", "defaults", "nope"]), Some(1));
    }

    #[test]
    fn help_and_version_exit_cleanly() {
        assert_eq!(parse_exit_code(&["sheet-recon", "--help"]), Some(0));
        assert_eq!(parse_exit_code(&["sheet-recon", "--version"]), Some(0));
    }

    #[test]
    fn job_arguments_parse() {
        assert_eq!(parse_exit_code(&["sheet-recon", "weekly", "--config", "w.json"]), None);
        assert_eq!(parse_exit_code(&["sheet-recon", "defaults", "pos-bi"]), None);
    }
}
