//! Command-line interface for the application template.
use std::path::PathBuf;

use clap::Parser;

/// Command-line interface for the application template.
#[derive(Debug, Parser)]
#[command(name = "cli-template", version, author)]
#[command(about = "Command-line application template", long_about = None)]
pub struct Cli {
    /// Configuration file.
    #[arg(short, long, value_name = "PATH", default_value = "./config.ini")]
    pub config: PathBuf,
}

/// Parses command-line arguments and returns a `Cli` struct.
pub fn parse_args() -> Cli {
    Cli::parse()
}
