//! CLI module - argument parsing and command dispatch

pub mod commands;
pub mod helpers;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for show/list commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable tables and key/value output
    #[default]
    Pretty,
    Yaml,
    Json,
}

#[derive(clap::Args, Debug, Default)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty")]
    pub output: OutputFormat,

    /// Acting user for permission checks (defaults to the configured user)
    #[arg(long, global = true, env = "PST_USER")]
    pub user: Option<String>,

    /// Assume yes on confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "pst",
    about = "Plain-text Stock Toolkit - part catalogs, BOM-aware stock counts and item status workflows",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project in the current directory
    Init(commands::init::InitArgs),

    /// Manage catalog part definitions
    #[command(subcommand)]
    Part(commands::part::PartCommands),

    /// Manage stock counts, BOMs and batches
    #[command(subcommand)]
    Stock(commands::stock::StockCommands),

    /// Manage serialized items
    #[command(subcommand)]
    Item(commands::item::ItemCommands),

    /// Generate shell completions
    Completions(commands::completions::CompletionsArgs),
}
