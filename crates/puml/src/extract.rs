//! Document discovery and diagram block extraction.
//!
//! Documents are selected with a glob pattern; fenced code blocks whose
//! language tag matches the configured language become [`DiagramBlock`]s.

use std::path::{Path, PathBuf};

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use puml_diagrams::{DiagramBlock, DiagramFormat};

use crate::error::CliError;

/// Directory names never searched for documents.
const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// Find documents matching `pattern`, in glob order.
///
/// Unreadable directory entries are logged and skipped.
pub(crate) fn find_documents(pattern: &str) -> Result<Vec<PathBuf>, CliError> {
    let mut documents = Vec::new();
    for entry in glob::glob(pattern)? {
        match entry {
            Ok(path) if path.is_file() && !is_skipped(&path) => documents.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!(path = %e.path().display(), error = %e, "skipping entry"),
        }
    }
    Ok(documents)
}

fn is_skipped(path: &Path) -> bool {
    path.components()
        .any(|c| SKIPPED_DIRS.iter().any(|skipped| c.as_os_str() == *skipped))
}

/// Extract diagram blocks from a markdown document.
///
/// A fenced block is a diagram when the first word of its info string equals
/// `language`. Fences with no diagram text are logged and skipped. Blocks are
/// returned in document order.
pub(crate) fn extract_blocks(
    markdown: &str,
    owner: &Path,
    language: &str,
    format: DiagramFormat,
) -> Vec<DiagramBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info)))
                if fence_language(&info) == Some(language) =>
            {
                current = Some(String::new());
            }
            Event::Text(text) => {
                if let Some(source) = current.as_mut() {
                    source.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(source) = current.take() {
                    if source.trim().is_empty() {
                        tracing::warn!(document = %owner.display(), "skipping empty diagram block");
                        continue;
                    }
                    blocks.push(
                        DiagramBlock::new(source, owner)
                            .with_format(format)
                            .with_language(language),
                    );
                }
            }
            _ => {}
        }
    }

    blocks
}

fn fence_language(info: &str) -> Option<&str> {
    info.split_whitespace().next()
}
