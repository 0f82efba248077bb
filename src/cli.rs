//! CLI struct definitions for the `delivery-gate` command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "delivery-gate",
    version = env!("CARGO_PKG_VERSION"),
    about = "Pre-release validation gate for generated training-plan delivery packages.",
    disable_version_flag = true
)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ValidateCli {
    /// Package root, or with --batch a directory of package roots.
    pub path: PathBuf,
    /// Validate every immediate child directory of PATH.
    #[clap(long)]
    pub batch: bool,
    /// Block release on HIGH findings as well as CRITICAL.
    #[clap(long)]
    pub strict: bool,
    /// Output format: 'text' or 'json'.
    #[clap(long, value_enum, default_value = "text")]
    pub format: OutputFormat,
    /// TOML rulebook overlay; keys left out keep their defaults.
    #[clap(long)]
    pub rules: Option<PathBuf>,
    /// Disable colored output.
    #[clap(long)]
    pub no_color: bool,
    /// Raise log verbosity (repeatable).
    #[clap(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Emit logs as JSON lines on stderr.
    #[clap(long)]
    pub log_json: bool,
}

#[derive(clap::Args, Debug)]
pub(crate) struct RulesCli {
    /// TOML rulebook overlay to merge before printing.
    #[clap(long)]
    pub rules: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Validate a delivery package (or a directory of packages)
    Validate(ValidateCli),
    /// Print the effective rulebook as TOML
    Rules(RulesCli),
    /// Print the version
    Version,
}
