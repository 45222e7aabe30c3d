//! `puml encode` command implementation.

use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use puml_config::{CliSettings, Config};
use puml_diagrams::{DiagramFormat, try_encode};

use super::parse_format;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the encode command.
#[derive(Args)]
pub(crate) struct EncodeArgs {
    /// File containing diagram source (default: read stdin).
    file: Option<PathBuf>,

    /// Path to configuration file (default: auto-discover puml.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (overrides config).
    #[arg(short, long, value_parser = parse_format)]
    format: Option<DiagramFormat>,

    /// PlantUML server base URL (overrides config).
    #[arg(short, long, env = "PLANTUML_SERVER")]
    server: Option<String>,
}

impl EncodeArgs {
    /// Execute the encode command.
    ///
    /// Prints the full request URL for the diagram.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or configuration fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let source = match &self.file {
            Some(path) => std::fs::read_to_string(path)?,
            None => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };

        let cli_settings = CliSettings {
            server_url: self.server,
            format: self.format,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let encoded = try_encode(&source)?;
        Output::new().result(&format!("{}{encoded}", config.server_url()));
        Ok(())
    }
}
