//! `PlantUML` diagram rendering with a persistent artifact cache.
//!
//! This crate turns diagram source extracted from documents into rendered
//! SVG or PNG artifacts:
//! - Text encoding for `PlantUML` server URLs (DEFLATE + 64-symbol alphabet)
//! - Content keys and artifact names scoped to the owning document
//! - Remote rendering over HTTP with a single bounded attempt per diagram
//! - Cache-first resolution backed by an [`ArtifactStore`](puml_cache::ArtifactStore)
//! - Batch processing that isolates per-diagram failures
//!
//! # Architecture
//!
//! The crate is organized into modules:
//! - [`encoder`]: Normalization and the server text encoding
//! - [`key`]: `ContentKey` and `ArtifactName`
//! - [`remote`]: `Renderer` trait and the HTTP implementation
//! - [`resolver`]: Cache-first resolution of a single block
//! - [`batch`]: Ordered batch resolution with a failure report
//! - [`embed`]: HTML snippets for resolved artifacts
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use puml_cache::FileStore;
//! use puml_diagrams::{BatchMaterializer, DiagramBlock, HttpRenderer, Resolver};
//!
//! let renderer = HttpRenderer::new(
//!     "https://www.plantuml.com/plantuml/svg/",
//!     std::time::Duration::from_secs(10),
//! );
//! let resolver = Resolver::new(Arc::new(FileStore::new("diagrams")), Arc::new(renderer));
//! let blocks = vec![DiagramBlock::new("Alice -> Bob: hi", "docs/guide.md")];
//!
//! let report = BatchMaterializer::new(resolver).process(&blocks);
//! assert_eq!(report.failed(), 0);
//! ```

pub mod batch;
mod block;
pub mod consts;
pub mod embed;
pub mod encoder;
mod error;
pub mod key;
pub mod remote;
pub mod resolver;

pub use batch::{BatchMaterializer, BatchReport, BlockFailure, DiagramSink};
pub use block::{DiagramBlock, DiagramFormat};
pub use embed::{EmbedOptions, error_figure, figure};
pub use encoder::{DecodeError, decode, decode64, encode, encode64, normalize, try_encode};
pub use error::DiagramError;
pub use key::{ArtifactName, ContentKey, sanitize_owner};
pub use remote::{HttpRenderer, RenderError, Renderer, create_agent, render};
pub use resolver::{RenderResult, Resolver, ResolverConfig};
