use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keytable")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative lifecycle management for managed key-value tables", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Desired-state file (TOML or JSON)
    #[arg(
        short,
        long,
        global = true,
        env = "KEYTABLE_FILE",
        default_value = "keytable.toml"
    )]
    pub file: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate the desired-state file without contacting the provider
    Validate,

    /// Show what apply would change, including drift
    Plan(TargetArgs),

    /// Converge tables toward the desired-state file
    Apply(ApplyArgs),

    /// Destroy recorded tables
    Destroy(DestroyArgs),

    /// Show recorded and live table state
    Status,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct TargetArgs {
    /// Only these tables (default: all)
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Parallel reconcile workers (default from settings.toml)
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
