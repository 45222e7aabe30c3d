//! Diagram blocks handed over by document extraction.

use std::path::{Path, PathBuf};

use crate::consts::{DEFAULT_LANGUAGE, PREVIEW_LEN, PUBLIC_SERVER, START_MARKER};
use crate::encoder::normalize;
use crate::key::ContentKey;

/// Output format for rendered diagrams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiagramFormat {
    /// Vector output, embedded directly into documents as text.
    #[default]
    Svg,
    /// Raster output, transferred as binary.
    Png,
}

impl DiagramFormat {
    /// Parse format from a configuration or attribute value.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "svg" => Some(Self::Svg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    /// Return format as string representation (also the artifact extension).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }

    /// Whether the server response is text rather than binary.
    #[must_use]
    pub fn is_text(self) -> bool {
        matches!(self, Self::Svg)
    }

    /// Public server URL for this format, ending with a slash.
    #[must_use]
    pub fn public_server_url(self) -> String {
        format!("{PUBLIC_SERVER}/{}/", self.as_str())
    }
}

impl std::fmt::Display for DiagramFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A diagram extracted from a document.
///
/// Immutable input unit of resolution. A document may contribute any number of
/// blocks, including several with identical text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramBlock {
    /// Raw diagram source as written in the document.
    pub source: String,
    /// Path of the document the block came from.
    pub owner: PathBuf,
    /// Requested output format.
    pub format: DiagramFormat,
    /// Fence language tag the block was extracted under.
    pub language: String,
}

impl DiagramBlock {
    /// Create a `PlantUML` block rendered as SVG.
    #[must_use]
    pub fn new(source: impl Into<String>, owner: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            owner: owner.into(),
            format: DiagramFormat::default(),
            language: DEFAULT_LANGUAGE.to_owned(),
        }
    }

    /// Set the requested output format.
    #[must_use]
    pub fn with_format(mut self, format: DiagramFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the fence language tag.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Owning document path.
    #[must_use]
    pub fn owner(&self) -> &Path {
        &self.owner
    }

    /// Source trimmed and wrapped in start/end markers.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize(&self.source)
    }

    /// Content key of the normalized source.
    #[must_use]
    pub fn content_key(&self) -> ContentKey {
        ContentKey::of(&self.normalized())
    }

    /// Short single-line preview of the source for diagnostics.
    ///
    /// Uses the first line that is neither blank nor a start marker.
    #[must_use]
    pub fn preview(&self) -> String {
        let line = self
            .source
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with(START_MARKER))
            .unwrap_or_default();

        if line.chars().count() > PREVIEW_LEN {
            let truncated: String = line.chars().take(PREVIEW_LEN).collect();
            format!("{truncated}...")
        } else {
            line.to_owned()
        }
    }
}
