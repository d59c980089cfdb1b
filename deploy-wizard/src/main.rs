//! Deployment wizard CLI.
//!
//! Lists the wizard's fields, validates form files, drives a form through
//! every step to produce a deployment request, and replays recorded
//! deployment updates through the progress tracker.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use deploy_wizard::core::expiration::ExpirationWindow;
use deploy_wizard::core::explorer::Network;
use deploy_wizard::core::registry::FieldRegistry;
use deploy_wizard::core::types::{FieldId, FieldValue, Mode, Notification, NumericKind};
use deploy_wizard::core::validation::{ValidationReport, Validator, all_valid};
use deploy_wizard::exit_codes;
use deploy_wizard::io::catalog::Catalog;
use deploy_wizard::io::clock::{Clock, SystemClock};
use deploy_wizard::io::config::{WizardConfig, load_config};
use deploy_wizard::io::deployer::FileDeployer;
use deploy_wizard::io::form_store::load_form;
use deploy_wizard::logging;
use deploy_wizard::replay::{ReplayRecord, replay_file};
use deploy_wizard::wizard::{Advance, Dispatch, Wizard, WizardStep};

#[derive(Parser)]
#[command(
    name = "deploy-wizard",
    version,
    about = "Multi-step deployment wizard for derivative contracts"
)]
struct Cli {
    /// Wizard configuration file.
    #[arg(long, global = true, default_value = "wizard.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List fields per wizard step with their defaults.
    Fields {
        #[arg(long, value_enum, default_value_t = ModeArg::Guided)]
        mode: ModeArg,
    },
    /// Validate a form file (missing fields take their defaults).
    Validate {
        form: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::Guided)]
        mode: ModeArg,
        /// Live reference price for simplified-mode bounds.
        #[arg(long)]
        price: Option<f64>,
    },
    /// Walk a form through every step and write the deployment request.
    Deploy {
        form: PathBuf,
        /// Where the deployment request is written.
        #[arg(long)]
        out: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::Guided)]
        mode: ModeArg,
        #[arg(long)]
        price: Option<f64>,
    },
    /// Feed recorded deployment updates (JSON Lines) through the tracker.
    Replay { updates: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Guided,
    Simplified,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Guided => Mode::Guided,
            ModeArg::Simplified => Mode::Simplified,
        }
    }
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::ERROR
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    debug!(config = %cli.config.display(), "config loaded");
    match cli.command {
        Command::Fields { mode } => cmd_fields(&config, mode.into()),
        Command::Validate { form, mode, price } => {
            cmd_validate(&config, &form, mode.into(), price)
        }
        Command::Deploy {
            form,
            out,
            mode,
            price,
        } => cmd_deploy(&config, &form, &out, mode.into(), price),
        Command::Replay { updates } => cmd_replay(&config, &updates),
    }
}

fn cmd_fields(config: &WizardConfig, mode: Mode) -> Result<i32> {
    let registry = FieldRegistry::standard(config.expiration.default_days)?;
    let window = ExpirationWindow::new(SystemClock.now(), config.expiration.max_days);
    let defaults = registry.defaults(&window);
    for step in WizardStep::ORDER {
        println!("{}:", step.title());
        for &field in step.fields(mode) {
            let def = registry.definition(field)?;
            let default = defaults
                .get(field)
                .map_or_else(String::new, FieldValue::to_string);
            let kind = match def.numeric {
                Some(NumericKind::Integer) => "integer",
                Some(NumericKind::Decimal) => "decimal",
                None => "text",
            };
            println!(
                "  {field} label={:?} kind={kind} default={default:?}",
                def.label.unwrap_or("")
            );
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_validate(config: &WizardConfig, path: &Path, mode: Mode, price: Option<f64>) -> Result<i32> {
    let catalog = Catalog::load(config.catalog_path.as_deref())?;
    let registry = FieldRegistry::standard(config.expiration.default_days)?;
    let window = ExpirationWindow::new(SystemClock.now(), config.expiration.max_days);

    let mut form = registry.defaults(&window);
    for (field, value) in load_form(path)?.iter() {
        form.set(field, Some(value.clone()));
    }
    if let Some(price) = price {
        form.set(FieldId::Price, Some(FieldValue::Number(price)));
    }

    let validator = Validator::new(&registry, &catalog, config.price_bounds(), window);
    let report = validator.validate_all(&form, &WizardStep::session_fields(mode))?;
    print_report(&report);
    if all_valid(&report) {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::INVALID_FORM)
    }
}

fn cmd_deploy(
    config: &WizardConfig,
    path: &Path,
    out: &Path,
    mode: Mode,
    price: Option<f64>,
) -> Result<i32> {
    let catalog = Catalog::load(config.catalog_path.as_deref())?;
    let values = load_form(path)?;
    let mut wizard = Wizard::new(
        config,
        mode,
        Box::new(catalog),
        Box::new(SystemClock),
        FileDeployer::new(out),
    )?;
    wizard.fill(&values)?;
    if let Some(price) = price {
        wizard.set_reference_price(price)?;
    }

    while wizard.step() != WizardStep::Deploy {
        let step = wizard.step();
        if let Advance::Blocked(report) = wizard.next()? {
            println!("blocked at step '{}'", step.title());
            print_report(&report);
            return Ok(exit_codes::INVALID_FORM);
        }
    }
    if let Dispatch::Blocked(report) = wizard.deploy()? {
        println!("blocked at step '{}'", WizardStep::Deploy.title());
        print_report(&report);
        return Ok(exit_codes::INVALID_FORM);
    }
    println!("deploy: request written to {}", out.display());
    Ok(exit_codes::OK)
}

fn cmd_replay(config: &WizardConfig, path: &Path) -> Result<i32> {
    let outcome = replay_file(path, config.network.clone())?;
    for record in &outcome.records {
        print_record(record, &config.network);
    }
    if outcome.rejected() {
        Ok(exit_codes::REJECTED)
    } else {
        Ok(exit_codes::OK)
    }
}

fn print_report(report: &ValidationReport) {
    for (field, result) in report {
        match result.message() {
            None => println!("{field}: ok"),
            Some(message) => println!("{field}: {message}"),
        }
    }
}

fn print_record(record: &ReplayRecord, network: &Network) {
    let phase = record.phase.map_or("none", |p| p.as_str());
    println!(
        "line {}: step {} phase={phase}",
        record.line,
        record.step.index()
    );
    for (label, hash) in record.tx_hashes.iter() {
        match network.tx_url(hash) {
            Some(url) => println!("  {}: {hash} {url}", label.label()),
            None => println!("  {}: {hash}", label.label()),
        }
    }
    for notification in &record.notifications {
        match notification {
            Notification::DeploymentFailed { message } => println!("  failed: {message}"),
            Notification::ContractDeployed {
                address,
                explorer_url,
            } => match explorer_url {
                Some(url) => println!("  deployed: {address} {url}"),
                None => println!("  deployed: {address}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_validate_defaults() {
        let cli = Cli::parse_from(["deploy-wizard", "validate", "form.json"]);
        assert_eq!(cli.config, PathBuf::from("wizard.toml"));
        assert!(matches!(
            cli.command,
            Command::Validate {
                mode: ModeArg::Guided,
                price: None,
                ..
            }
        ));
    }

    #[test]
    fn parse_deploy_simplified_with_price() {
        let cli = Cli::parse_from([
            "deploy-wizard",
            "deploy",
            "form.json",
            "--out",
            "req.json",
            "--mode",
            "simplified",
            "--price",
            "2.5",
            "--config",
            "custom.toml",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        let Command::Deploy { mode, price, .. } = cli.command else {
            panic!("expected deploy");
        };
        assert_eq!(Mode::from(mode), Mode::Simplified);
        assert_eq!(price, Some(2.5));
    }
}
