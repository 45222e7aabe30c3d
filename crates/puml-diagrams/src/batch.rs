//! Batch resolution of diagrams from many documents.
//!
//! By default blocks are resolved one at a time in input order, so store
//! writes and log lines follow the input and a repeated diagram hits the entry
//! written by its first occurrence. With parallel documents enabled, blocks are
//! grouped by owning document and distinct documents run on the rayon pool;
//! each document's blocks still resolve in input order.
//!
//! Every input block gets exactly one result, index-aligned with the input.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::block::DiagramBlock;
use crate::error::DiagramError;
use crate::key::ContentKey;
use crate::resolver::{RenderResult, Resolver};

/// Receives resolved diagrams, one call per input block.
pub trait DiagramSink {
    /// Accept the outcome for the block at `index`.
    fn accept(&mut self, index: usize, block: &DiagramBlock, result: &RenderResult);
}

impl<F> DiagramSink for F
where
    F: FnMut(usize, &DiagramBlock, &RenderResult),
{
    fn accept(&mut self, index: usize, block: &DiagramBlock, result: &RenderResult) {
        self(index, block, result);
    }
}

/// Diagnostic for one failed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFailure {
    /// Position of the block in the input.
    pub index: usize,
    /// Owning document.
    pub owner: PathBuf,
    /// Content key of the normalized source.
    pub key: ContentKey,
    /// First meaningful line of the source.
    pub preview: String,
    /// Failure message.
    pub cause: String,
}

impl std::fmt::Display for BlockFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] \"{}\": {}",
            self.owner.display(),
            self.key,
            self.preview,
            self.cause
        )
    }
}

/// Aggregate outcome of a batch.
#[derive(Debug)]
pub struct BatchReport {
    /// One result per input block, in input order.
    pub results: Vec<RenderResult>,
    failures: Vec<BlockFailure>,
}

impl BatchReport {
    /// Number of resolved blocks (cached or rendered).
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.len() - self.failures.len()
    }

    /// Number of failed blocks.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Number of blocks served from the store.
    #[must_use]
    pub fn cached(&self) -> usize {
        self.results.iter().filter(|r| r.is_cached()).count()
    }

    /// Number of blocks fetched from the server.
    #[must_use]
    pub fn rendered(&self) -> usize {
        self.succeeded() - self.cached()
    }

    /// Diagnostics for every failed block, in input order.
    #[must_use]
    pub fn failures(&self) -> &[BlockFailure] {
        &self.failures
    }

    /// Hand every result to `sink` in input order.
    ///
    /// `blocks` must be the slice the report was produced from.
    pub fn deliver(&self, blocks: &[DiagramBlock], sink: &mut dyn DiagramSink) {
        for (index, (block, result)) in blocks.iter().zip(&self.results).enumerate() {
            sink.accept(index, block, result);
        }
    }
}

/// Drives a [`Resolver`] over an ordered sequence of blocks.
///
/// # Example
///
/// ```ignore
/// let report = BatchMaterializer::new(resolver).process(&blocks);
/// for failure in report.failures() {
///     eprintln!("{failure}");
/// }
/// ```
#[derive(Debug)]
pub struct BatchMaterializer {
    resolver: Resolver,
    parallel_documents: bool,
    cancel: Option<Arc<AtomicBool>>,
}

impl BatchMaterializer {
    /// Create a sequential materializer.
    #[must_use]
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            parallel_documents: false,
            cancel: None,
        }
    }

    /// Resolve distinct documents concurrently.
    ///
    /// Blocks of one document are still resolved in order.
    #[must_use]
    pub fn parallel_documents(mut self, enabled: bool) -> Self {
        self.parallel_documents = enabled;
        self
    }

    /// Stop resolving once `flag` is set.
    ///
    /// The flag is checked between blocks; remaining blocks fail with
    /// [`DiagramError::Cancelled`].
    #[must_use]
    pub fn cancel_on(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Underlying resolver.
    #[must_use]
    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Resolve all blocks.
    pub fn process(&self, blocks: &[DiagramBlock]) -> BatchReport {
        tracing::debug!(
            blocks = blocks.len(),
            parallel = self.parallel_documents,
            "processing diagram batch"
        );

        let results: Vec<RenderResult> = if self.parallel_documents {
            self.process_documents(blocks)
        } else {
            blocks.iter().map(|block| self.resolve_block(block)).collect()
        };

        let failures = results
            .iter()
            .enumerate()
            .filter_map(|(index, result)| {
                let err = result.error()?;
                let block = &blocks[index];
                Some(BlockFailure {
                    index,
                    owner: block.owner.clone(),
                    key: block.content_key(),
                    preview: block.preview(),
                    cause: err.to_string(),
                })
            })
            .collect();

        BatchReport { results, failures }
    }

    /// Resolve documents concurrently, restoring input order afterwards.
    fn process_documents(&self, blocks: &[DiagramBlock]) -> Vec<RenderResult> {
        let groups = group_by_owner(blocks);
        tracing::debug!(documents = groups.len(), "resolving documents in parallel");

        let resolved: Vec<Vec<(usize, RenderResult)>> = groups
            .par_iter()
            .map(|indices| {
                indices
                    .iter()
                    .map(|&index| (index, self.resolve_block(&blocks[index])))
                    .collect()
            })
            .collect();

        let mut indexed: Vec<(usize, RenderResult)> = resolved.into_iter().flatten().collect();
        indexed.sort_by_key(|(index, _)| *index);
        indexed.into_iter().map(|(_, result)| result).collect()
    }

    fn resolve_block(&self, block: &DiagramBlock) -> RenderResult {
        if self.is_cancelled() {
            RenderResult::Failed(DiagramError::Cancelled)
        } else {
            self.resolver.resolve(block)
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Group block indices by owner, documents in order of first appearance.
fn group_by_owner(blocks: &[DiagramBlock]) -> Vec<Vec<usize>> {
    let mut positions: HashMap<&Path, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        let slot = *positions.entry(block.owner.as_path()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(index);
    }

    groups
}
