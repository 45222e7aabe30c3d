//! Per-diagram failure causes.

use puml_cache::StoreError;

use crate::remote::RenderError;

/// Why a single diagram could not be resolved.
///
/// Every variant describes one block; none of them aborts a batch.
#[derive(Debug, thiserror::Error)]
pub enum DiagramError {
    /// The encoder failed to compress the source.
    #[error("failed to encode diagram source: {0}")]
    EncodingInputInvalid(String),
    /// A cached artifact could not be read.
    #[error(transparent)]
    StoreRead(StoreError),
    /// A rendered artifact could not be persisted.
    #[error(transparent)]
    StoreWrite(StoreError),
    /// The render request did not complete (network, timeout, unreadable body).
    #[error("render request failed: {0}")]
    RenderTransport(RenderError),
    /// The server rejected the diagram.
    #[error("server rejected diagram with HTTP {status}: {body}")]
    RenderService { status: u16, body: String },
    /// Document extraction failed before the diagram could be resolved
    /// (unreadable document, unresolved project root, ...).
    #[error("extraction failed: {0}")]
    Extraction(String),
    /// The block was extracted under a language tag other than the configured one.
    #[error("language '{found}' is not '{expected}'")]
    LanguageMismatch { expected: String, found: String },
    /// The batch was cancelled before this block was resolved.
    #[error("cancelled before rendering")]
    Cancelled,
}

impl From<RenderError> for DiagramError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Service { status, body, .. } => Self::RenderService { status, body },
            other => Self::RenderTransport(other),
        }
    }
}

impl From<StoreError> for DiagramError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Write { .. } => Self::StoreWrite(err),
            StoreError::NotFound(_) | StoreError::Read { .. } => Self::StoreRead(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_conversion() {
        let err = DiagramError::from(RenderError::Service {
            url: "http://x/abc".to_owned(),
            status: 400,
            body: "Syntax Error?".to_owned(),
        });
        assert!(matches!(err, DiagramError::RenderService { status: 400, .. }));
        assert_eq!(
            err.to_string(),
            "server rejected diagram with HTTP 400: Syntax Error?"
        );
    }

    #[test]
    fn test_transport_error_conversion() {
        let err = DiagramError::from(RenderError::Transport {
            url: "http://x/abc".to_owned(),
            message: "timeout".to_owned(),
        });
        assert!(matches!(err, DiagramError::RenderTransport(_)));
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_store_error_conversion() {
        let read = DiagramError::from(StoreError::NotFound("a.svg".to_owned()));
        assert!(matches!(read, DiagramError::StoreRead(_)));

        let write = DiagramError::from(StoreError::Write {
            name: "a.svg".to_owned(),
            source: std::io::Error::other("read-only"),
        });
        assert!(matches!(write, DiagramError::StoreWrite(_)));
    }
}
