//! CLI interface for greek-stream
//!
//! Provides subcommands for:
//! - `run`: Stream the mock feed through the analytics engine
//! - `price`: One-off price, Greeks and implied vol
//! - `parse`: Break down an option symbol
//! - `config`: Show the effective configuration

mod parse;
mod price;
mod run;

pub use parse::ParseArgs;
pub use price::{OptionKind, PriceArgs};
pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "greek-stream")]
#[command(about = "Streaming options analytics: implied vol, higher-order Greeks, smiles and dislocations")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream ticks through the engine and run periodic analysis
    Run(RunArgs),
    /// Price an option and compute its Greeks
    Price(PriceArgs),
    /// Break down an option symbol
    Parse(ParseArgs),
    /// Show the effective configuration
    Config,
}
