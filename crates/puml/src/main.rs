//! puml CLI - `PlantUML` diagram generator.
//!
//! Provides commands for:
//! - `generate`: Render every diagram in matching markdown documents
//! - `encode`: Print the server URL for a diagram
//! - `decode`: Print the diagram source behind an encoded URL

mod commands;
mod error;
mod extract;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{DecodeArgs, EncodeArgs, GenerateArgs};
use output::Output;

/// puml - `PlantUML` diagram generator.
#[derive(Parser)]
#[command(name = "puml", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render diagrams from markdown documents into the output directory.
    Generate(GenerateArgs),
    /// Encode diagram source into a server URL.
    Encode(EncodeArgs),
    /// Decode an encoded diagram back into source.
    Decode(DecodeArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = matches!(&cli.command, Commands::Generate(args) if args.verbose);

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Generate(args) => args.execute(),
        Commands::Encode(args) => args.execute(),
        Commands::Decode(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
