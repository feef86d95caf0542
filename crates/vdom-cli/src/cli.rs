use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vdom",
    about = "Virtual tree reconciler: diff, apply and schedule tree updates",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum StrategyArg {
    #[default]
    Keyed,
    Positional,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum PriorityArg {
    #[default]
    Frame,
    Idle,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a tree file in traversal order
    Tree(TreeArgs),
    /// Show the patches that turn one tree into another
    Diff(DiffArgs),
    /// Mount the old tree, apply the patches and print the result
    Apply(ApplyArgs),
    /// Run a time-sliced diff and report each slice
    Schedule(ScheduleArgs),
}

#[derive(Args)]
pub struct TreeArgs {
    /// JSON element file
    pub path: PathBuf,
}

#[derive(Args)]
pub struct DiffArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    #[arg(long, value_enum, default_value = "keyed")]
    pub strategy: StrategyArg,
    /// Only show patches of this kind (INSERT, REMOVE, REPLACE, UPDATE, MOVE)
    #[arg(long)]
    pub only: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    #[arg(long, value_enum, default_value = "keyed")]
    pub strategy: StrategyArg,
}

#[derive(Args)]
pub struct ScheduleArgs {
    pub old: PathBuf,
    pub new: PathBuf,
    /// Scheduler config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Override the frame budget, in milliseconds
    #[arg(long)]
    pub frame_budget_ms: Option<f64>,
    /// Simulated cost of one diff unit, in microseconds
    #[arg(long, default_value = "1000")]
    pub unit_cost_us: u64,
    #[arg(long, value_enum, default_value = "frame")]
    pub priority: PriorityArg,
    /// Idle time offered per idle callback, in milliseconds
    #[arg(long, default_value = "50")]
    pub idle_ms: f64,
}
