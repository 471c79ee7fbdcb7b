//! Command-line arguments shared by the intake and lander binaries.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version)]
pub struct CliArgs {
    /// Path to a YAML configuration file. Without it, configuration is read
    /// from environment variables.
    #[arg(short, long, env = "LANDING_CONFIG")]
    pub config: Option<PathBuf>,
}
