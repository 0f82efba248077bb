//! delivery-gate: an independent release gate for generated training plans.
//!
//! A delivery package is the directory of artifacts produced for one athlete:
//! config documents, the rendered guide, one structured workout file per
//! calendar day, and the delivery extras (PDF, touchpoint schedule, email
//! templates). The gate never trusts the generator that produced them. It
//! reads the package, runs every validator family over it and reports
//! findings by severity; CRITICAL findings block release.
//!
//! # Crate Structure
//!
//! - [`core`]: artifact locator, parsers, rule book, findings, reports and
//!   the orchestrator ([`core::validate::validate_package`])
//! - [`gates`]: one module per validator family
//!
//! # Examples
//!
//! ```bash
//! # Validate one package
//! delivery-gate validate athletes/jane-doe-20260214
//!
//! # Validate every package under a directory, blocking on HIGH too
//! delivery-gate validate athletes --batch --strict
//!
//! # Print the effective rule book
//! delivery-gate rules
//! ```

mod cli;
pub mod core;
pub mod gates;

use cli::{Cli, Command, OutputFormat, RulesCli, ValidateCli};
use clap::Parser;
use crate::core::error::GateError;
use crate::core::report::Policy;
use crate::core::rules::RuleBook;
use crate::core::{telemetry, validate};

pub fn run() -> Result<(), GateError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Rules(args) => run_rules(args),
        Command::Validate(args) => run_validate(args),
    }
}

fn run_rules(args: RulesCli) -> Result<(), GateError> {
    let rules = RuleBook::load(args.rules.as_deref())?;
    print!("{}", rules.to_toml()?);
    Ok(())
}

fn run_validate(args: ValidateCli) -> Result<(), GateError> {
    telemetry::init_tracing(args.log_json, telemetry::level_for(args.verbose));
    if args.no_color {
        colored::control::set_override(false);
    }
    let rules = RuleBook::load(args.rules.as_deref())?;
    let policy = if args.strict {
        Policy::Strict
    } else {
        Policy::Lenient
    };

    if !args.batch {
        let report = validate::validate_package(&args.path, &rules, policy)?;
        match args.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&report.to_json())?)
            }
            OutputFormat::Text => print!("{}", report.render_text()),
        }
        return validate::run_validation(&report);
    }

    let batch = validate::validate_batch(&args.path, &rules, policy)?;
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&batch.to_json())?),
        OutputFormat::Text => {
            for report in &batch.reports {
                println!("{}", report.render_text());
            }
            println!("{}", batch.summary_line());
        }
    }
    if batch.passed() {
        Ok(())
    } else {
        Err(GateError::ValidationError(format!(
            "{} of {} package(s) blocked",
            batch.blocked(),
            batch.reports.len()
        )))
    }
}
