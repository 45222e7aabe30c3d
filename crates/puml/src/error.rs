//! CLI error types.

use puml_config::ConfigError;
use puml_diagrams::DecodeError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("invalid encoded diagram: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid document pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("{0} diagram(s) failed")]
    DiagramsFailed(usize),
}
