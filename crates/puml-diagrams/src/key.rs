//! Diagram cache key computation.
//!
//! Provides [`ContentKey`], a digest of normalized diagram text, and
//! [`ArtifactName`], the file name a rendered diagram is stored under.

use std::path::{Component, Path};

use md5::{Digest, Md5};

use crate::block::DiagramFormat;

/// Document extensions stripped from owner paths.
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "mdx", "markdown"];

/// Owner name used when the owner path has no usable components.
const UNNAMED_OWNER: &str = "untitled";

/// Content hash of a normalized diagram source.
///
/// MD5 rendered as 32 lowercase hex characters. Used to avoid cache
/// collisions, not for security; it is stable across runs and platforms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentKey(String);

impl ContentKey {
    /// Compute the key of an already normalized source.
    #[must_use]
    pub fn of(normalized: &str) -> Self {
        Self(hex::encode(Md5::digest(normalized.as_bytes())))
    }

    /// Hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// File name of a rendered artifact in the cache root.
///
/// Format: `{sanitized_owner}-{content_key}.{format}`, e.g.
/// `guide-intro-5d41402abc4b2a76b9719d911017c592.svg` for a diagram in
/// `guide/intro.md`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName(String);

impl ArtifactName {
    /// Build the artifact name for a diagram.
    ///
    /// # Arguments
    /// * `owner` - Path of the owning document
    /// * `project_root` - Root the owner path is made relative to, if it lies under it
    /// * `key` - Content key of the normalized source
    /// * `format` - Output format, used as the extension
    #[must_use]
    pub fn new(
        owner: &Path,
        project_root: Option<&Path>,
        key: &ContentKey,
        format: DiagramFormat,
    ) -> Self {
        let owner = sanitize_owner(owner, project_root);
        Self(format!("{owner}-{key}.{}", format.as_str()))
    }

    /// File name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flatten an owner path into a file name prefix.
///
/// The path is made relative to `project_root` when it lies under it, path
/// separators become `-`, and a trailing document extension is stripped:
/// `docs/guide/intro.md` becomes `docs-guide-intro`.
#[must_use]
pub fn sanitize_owner(owner: &Path, project_root: Option<&Path>) -> String {
    let relative = project_root
        .and_then(|root| owner.strip_prefix(root).ok())
        .unwrap_or(owner);

    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().replace('\\', "-")),
            Component::ParentDir => Some("..".to_owned()),
            Component::Prefix(_) | Component::RootDir | Component::CurDir => None,
        })
        .collect();

    if segments.is_empty() {
        return UNNAMED_OWNER.to_owned();
    }

    let joined = segments.join("-");
    strip_document_extension(&joined).to_owned()
}

fn strip_document_extension(name: &str) -> &str {
    DOCUMENT_EXTENSIONS
        .iter()
        .find_map(|ext| {
            name.strip_suffix(ext)
                .and_then(|rest| rest.strip_suffix('.'))
                .filter(|stem| !stem.is_empty())
        })
        .unwrap_or(name)
}
