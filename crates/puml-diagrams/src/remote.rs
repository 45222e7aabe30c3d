//! Diagram rendering via a remote `PlantUML` server.
//!
//! A diagram is requested with a single GET of `{server_url}{encoded}`, where
//! `encoded` comes from [`encode`](crate::encode). The encoding alphabet is
//! URL-safe, so the text is appended verbatim.
//!
//! There is no retry: one call is one attempt.

use std::time::Duration;

use ureq::Agent;

use crate::block::DiagramFormat;
use crate::consts::ERROR_BODY_LEN;

/// Failure of a single render request.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Connection, DNS, TLS or timeout failure.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    /// The server answered with a non-success status.
    #[error("server returned HTTP {status} for {url}: {body}")]
    Service {
        url: String,
        status: u16,
        body: String,
    },
    /// The response body could not be read or was not valid for the format.
    #[error("failed to read response from {url}: {message}")]
    Body { url: String, message: String },
}

/// Produces rendered artifact bytes for encoded diagram text.
///
/// Implementations must be thread-safe (`Send + Sync`) for use across documents.
pub trait Renderer: Send + Sync {
    /// Render one encoded diagram.
    ///
    /// Vector formats return UTF-8 text as bytes; raster formats return the
    /// raw image.
    fn render(&self, encoded: &str, format: DiagramFormat) -> Result<Vec<u8>, RenderError>;
}

/// Create HTTP agent with the specified timeout.
///
/// The timeout covers the whole call, from connecting to reading the body.
/// HTTP error statuses are returned as responses so their bodies can be
/// reported.
pub fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// [`Renderer`] talking to a `PlantUML` server over HTTP.
///
/// The agent is reused across calls for connection pooling.
pub struct HttpRenderer {
    server_url: String,
    timeout: Duration,
    agent: Agent,
}

impl HttpRenderer {
    /// Create a renderer for a server base URL such as
    /// `https://www.plantuml.com/plantuml/svg/`.
    #[must_use]
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            server_url: server_url.into(),
            timeout,
            agent: create_agent(timeout),
        }
    }

    /// Server base URL.
    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Full request URL for an encoded diagram.
    #[must_use]
    pub fn url_for(&self, encoded: &str) -> String {
        format!("{}{encoded}", self.server_url)
    }
}

impl std::fmt::Debug for HttpRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRenderer")
            .field("server_url", &self.server_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Renderer for HttpRenderer {
    fn render(&self, encoded: &str, format: DiagramFormat) -> Result<Vec<u8>, RenderError> {
        let url = self.url_for(encoded);
        tracing::debug!(%url, %format, "requesting diagram");

        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| RenderError::Transport {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let mut body = response.into_body();

        if !status.is_success() {
            let error_body = body
                .read_to_string()
                .unwrap_or_else(|_| String::from("(unable to read error body)"));
            return Err(RenderError::Service {
                url,
                status: status.as_u16(),
                body: truncate(error_body.trim(), ERROR_BODY_LEN),
            });
        }

        let data = if format.is_text() {
            body.read_to_string().map(String::into_bytes)
        } else {
            body.read_to_vec()
        };

        data.map_err(|e| RenderError::Body {
            url,
            message: e.to_string(),
        })
    }
}

/// Render one encoded diagram with a one-off renderer.
///
/// Prefer a shared [`HttpRenderer`] when rendering many diagrams.
pub fn render(
    encoded: &str,
    server_url: &str,
    timeout: Duration,
    format: DiagramFormat,
) -> Result<Vec<u8>, RenderError> {
    HttpRenderer::new(server_url, timeout).render(encoded, format)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_owned();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}
