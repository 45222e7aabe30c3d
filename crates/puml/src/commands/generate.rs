//! `puml generate` command implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use puml_cache::FileStore;
use puml_config::{CliSettings, Config};
use puml_diagrams::{
    BatchMaterializer, BatchReport, DiagramBlock, DiagramError, DiagramFormat, HttpRenderer,
    RenderResult, Resolver,
};

use super::parse_format;
use crate::error::CliError;
use crate::extract::{extract_blocks, find_documents};
use crate::output::Output;

/// Arguments for the generate command.
#[derive(Args)]
pub(crate) struct GenerateArgs {
    /// Glob selecting markdown documents (overrides config, default: **/*.md).
    pattern: Option<String>,

    /// Path to configuration file (default: auto-discover puml.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format (overrides config).
    #[arg(short, long, value_parser = parse_format)]
    format: Option<DiagramFormat>,

    /// PlantUML server base URL (overrides config).
    #[arg(short, long, env = "PLANTUML_SERVER")]
    server: Option<String>,

    /// Directory for rendered diagrams (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Request timeout in milliseconds (overrides config).
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Render every diagram even if an artifact already exists.
    #[arg(long)]
    no_cache: bool,

    /// Process documents in parallel.
    #[arg(long)]
    parallel: bool,

    /// Enable verbose output (cache decisions and request logs).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Blocks gathered from all documents plus per-document extraction failures.
struct Extracted {
    blocks: Vec<DiagramBlock>,
    failures: Vec<(PathBuf, DiagramError)>,
    documents: usize,
}

impl GenerateArgs {
    /// Execute the generate command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the pattern is invalid, or
    /// any diagram could not be resolved.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            server_url: self.server,
            timeout_ms: self.timeout,
            format: self.format,
            pattern: self.pattern,
            cache_dir: self.output,
            prefer_local: self.no_cache.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let server_url = config.server_url();
        output.highlight("PlantUML diagram generation");
        output.info(&format!("Server: {server_url}"));
        output.info(&format!(
            "Output directory: {}",
            config.cache_resolved.dir.display()
        ));
        if !config.cache_resolved.prefer_local {
            output.info("Cache: disabled, rendering every diagram");
        }

        let extracted = extract_all(&config)?;
        if extracted.documents == 0 {
            output.warning(&format!(
                "No documents match {}",
                config.diagrams_resolved.pattern
            ));
            return Ok(());
        }

        let renderer = HttpRenderer::new(server_url, config.server_resolved.timeout);
        let resolver = Resolver::new(
            Arc::new(FileStore::new(&config.cache_resolved.dir)),
            Arc::new(renderer),
        )
        .with_config(config.resolver_config());
        let materializer = BatchMaterializer::new(resolver).parallel_documents(self.parallel);

        let report = materializer.process(&extracted.blocks);

        let mut print_result = |_index: usize, block: &DiagramBlock, result: &RenderResult| {
            let name = materializer.resolver().artifact_name(block);
            match result {
                RenderResult::Cached(_) => output.success(&format!("✓ {name} cached")),
                RenderResult::Rendered(_) => output.success(&format!("✓ {name} generated")),
                RenderResult::Failed(err) => output.error(&format!("✗ {name}: {err}")),
            }
        };
        report.deliver(&extracted.blocks, &mut print_result);

        for (path, err) in &extracted.failures {
            output.error(&format!("✗ {}: {err}", path.display()));
        }

        print_summary(&output, &report, &extracted);

        let failed = report.failed() + extracted.failures.len();
        if failed > 0 {
            return Err(CliError::DiagramsFailed(failed));
        }
        Ok(())
    }
}

/// Read every matching document and collect its diagram blocks.
fn extract_all(config: &Config) -> Result<Extracted, CliError> {
    let cwd = std::env::current_dir()?;
    let documents = find_documents(&config.diagrams_resolved.pattern)?;

    let mut extracted = Extracted {
        blocks: Vec::new(),
        failures: Vec::new(),
        documents: documents.len(),
    };

    for path in documents {
        let owner = cwd.join(&path);
        match std::fs::read_to_string(&owner) {
            Ok(markdown) => {
                let blocks = extract_blocks(
                    &markdown,
                    &owner,
                    &config.diagrams_resolved.language,
                    config.diagrams_resolved.format,
                );
                tracing::debug!(document = %path.display(), diagrams = blocks.len(), "extracted");
                extracted.blocks.extend(blocks);
            }
            Err(e) => {
                tracing::warn!(document = %path.display(), error = %e, "failed to read document");
                extracted
                    .failures
                    .push((path, DiagramError::Extraction(e.to_string())));
            }
        }
    }

    Ok(extracted)
}

fn print_summary(output: &Output, report: &BatchReport, extracted: &Extracted) {
    output.info("");
    output.info(&format!(
        "{} diagram(s) in {} document(s): {} generated, {} cached, {} failed",
        extracted.blocks.len(),
        extracted.documents,
        report.rendered(),
        report.cached(),
        report.failed() + extracted.failures.len(),
    ));

    for failure in report.failures() {
        output.detail(&format!(
            "  {} (diagram {}): \"{}\"",
            display_owner(&failure.owner),
            failure.index,
            failure.preview
        ));
    }
}

/// Owner path as given on the command line, when it lies under the working directory.
fn display_owner(owner: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| owner.strip_prefix(cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| owner.to_path_buf())
        .display()
        .to_string()
}
