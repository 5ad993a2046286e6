pub mod commands;

use clap::{Parser, Subcommand};

use crate::checker::DEFAULT_WORKERS;

#[derive(Parser)]
#[command(name = "reup")]
#[command(about = "Watches product pages and alerts when items come back in stock", long_about = None)]
pub struct Cli {
    /// Number of parallel workers for one-shot checks
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, global = true)]
    pub workers: usize,

    /// Config file to use instead of ~/.config/reup/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the product id found in each URL
    Resolve {
        /// Product page URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Check availability once
    Check {
        /// Product page URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },
    /// Monitor products until interrupted
    Watch {
        /// Product page URLs
        #[arg(required = true)]
        urls: Vec<String>,

        /// Check interval (e.g., "15", "30s", "2m")
        #[arg(short, long)]
        interval: Option<String>,

        /// Group the products under a task name
        #[arg(short, long)]
        task: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Monitor every product of a profile file until interrupted
    Profile {
        /// Path to the profile JSON file
        path: std::path::PathBuf,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Show the config file path and effective settings
    Config,
}

#[derive(clap::Args, Debug, Clone)]
pub struct OutputArgs {
    /// Log file path (default: stdout)
    #[arg(short, long)]
    pub log: Option<std::path::PathBuf>,

    /// Print every check, not only changes and failures
    #[arg(short, long)]
    pub verbose: bool,
}
