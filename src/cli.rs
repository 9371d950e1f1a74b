use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::finding::{Language, Severity};

/// mint-risk CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "mint-risk",
    version,
    about = "Heuristic mint-risk analysis for EVM and Move token sources",
    args_conflicts_with_subcommands = true,
    subcommand_precedence_over_arg = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub analyze: AnalyzeArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze source files or directories.
    Analyze(AnalyzeArgs),

    /// Print the built-in pattern tables.
    Patterns,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct AnalyzeArgs {
    /// Source files or directories. Defaults to stdin when absent.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Source language. `auto` decides from file extensions or `--address`.
    #[arg(long, value_enum, default_value_t = LangArg::Auto)]
    pub lang: LangArg,

    /// Token decimals, overriding any decimals found in the code.
    #[arg(long)]
    pub decimals: Option<u8>,

    /// Contract name hint used to pick the primary file of a multi-file EVM contract.
    #[arg(long, value_name = "NAME")]
    pub primary: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Explicit config file. Otherwise `mint-risk.toml` is searched upwards.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Exit with code 1 when a finding is at or above this severity.
    #[arg(long, value_enum)]
    pub fail_on: Option<FailOn>,

    /// Token address; keys the finding store and helps language detection.
    #[arg(long, value_name = "ADDR")]
    pub address: Option<String>,

    /// JSON finding store used as a cache keyed by `--address`.
    #[arg(long, value_name = "FILE", requires = "address")]
    pub store: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LangArg {
    Auto,
    Evm,
    Move,
}

impl LangArg {
    pub fn language(&self) -> Option<Language> {
        match self {
            LangArg::Auto => None,
            LangArg::Evm => Some(Language::Evm),
            LangArg::Move => Some(Language::Move),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Markdown,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FailOn {
    Info,
    Medium,
    High,
    Critical,
}

impl FailOn {
    pub fn severity(&self) -> Severity {
        match self {
            FailOn::Info => Severity::Info,
            FailOn::Medium => Severity::Medium,
            FailOn::High => Severity::High,
            FailOn::Critical => Severity::Critical,
        }
    }
}
