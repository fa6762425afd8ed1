//! Config command - View configuration

use anyhow::Result;
use clap::Subcommand;

use hauler_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Print the configuration file path
    Path,
}

impl ConfigCommand {
    pub async fn execute(&self, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        let path = Config::default_path();

        match self {
            Self::Show => {
                let config = Config::load_or_default(&path);
                if matches!(format, OutputFormat::Json) {
                    formatter.print_json(&serde_json::to_value(&config)?);
                } else {
                    print!("{}", serde_yaml::to_string(&config)?);
                }
            }
            Self::Path => {
                println!("{}", path.display());
            }
        }
        Ok(())
    }
}
