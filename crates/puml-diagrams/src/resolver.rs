//! Per-diagram resolution against the artifact store and the render server.
//!
//! [`Resolver::resolve`] never fails: every path ends in a [`RenderResult`].
//! Store problems are logged and absorbed (a broken cache entry is treated as
//! a miss, a failed cache write still returns the rendered bytes); render
//! problems become [`RenderResult::Failed`].

use std::path::PathBuf;
use std::sync::Arc;

use puml_cache::{ArtifactStore, NullStore};

use crate::block::DiagramBlock;
use crate::consts::DEFAULT_LANGUAGE;
use crate::encoder::{normalize, try_encode};
use crate::error::DiagramError;
use crate::key::{ArtifactName, ContentKey};
use crate::remote::Renderer;

/// Outcome of resolving one diagram.
#[derive(Debug)]
pub enum RenderResult {
    /// Served from the artifact store.
    Cached(Vec<u8>),
    /// Fetched from the server (and persisted when possible).
    Rendered(Vec<u8>),
    /// Could not be resolved.
    Failed(DiagramError),
}

impl RenderResult {
    /// Artifact bytes, if resolution succeeded.
    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Cached(bytes) | Self::Rendered(bytes) => Some(bytes),
            Self::Failed(_) => None,
        }
    }

    /// Failure cause, if resolution failed.
    #[must_use]
    pub fn error(&self) -> Option<&DiagramError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Cached(_) | Self::Rendered(_) => None,
        }
    }

    /// Whether resolution succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// Whether the artifact came from the store.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached(_))
    }
}

/// Resolution settings (immutable after setup).
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Serve existing artifacts from the store before asking the server.
    pub prefer_local_cache: bool,
    /// Only blocks extracted under this language tag are resolved.
    pub language: String,
    /// Root that owner paths are made relative to when naming artifacts.
    pub project_root: Option<PathBuf>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            prefer_local_cache: true,
            language: DEFAULT_LANGUAGE.to_owned(),
            project_root: None,
        }
    }
}

/// Resolves diagram blocks to artifact bytes.
///
/// Holds the store and renderer behind `Arc` so one resolver can be shared
/// across threads.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use std::time::Duration;
/// use puml_cache::FileStore;
/// use puml_diagrams::{DiagramBlock, HttpRenderer, Resolver};
///
/// let resolver = Resolver::new(
///     Arc::new(FileStore::new("diagrams")),
///     Arc::new(HttpRenderer::new(
///         "https://www.plantuml.com/plantuml/svg/",
///         Duration::from_secs(10),
///     )),
/// )
/// .project_root("/site");
///
/// let result = resolver.resolve(&DiagramBlock::new("Alice -> Bob", "/site/docs/intro.md"));
/// ```
pub struct Resolver {
    store: Arc<dyn ArtifactStore>,
    renderer: Arc<dyn Renderer>,
    config: ResolverConfig,
}

impl Resolver {
    /// Create a resolver with default settings.
    #[must_use]
    pub fn new(store: Arc<dyn ArtifactStore>, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            store,
            renderer,
            config: ResolverConfig::default(),
        }
    }

    /// Create a resolver that never touches the filesystem.
    #[must_use]
    pub fn uncached(renderer: Arc<dyn Renderer>) -> Self {
        Self::new(Arc::new(NullStore), renderer)
    }

    /// Replace all settings at once.
    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable serving artifacts from the store.
    #[must_use]
    pub fn prefer_local_cache(mut self, enabled: bool) -> Self {
        self.config.prefer_local_cache = enabled;
        self
    }

    /// Set the language tag that identifies diagram blocks.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.config.language = language.into();
        self
    }

    /// Set the root that owner paths are made relative to.
    #[must_use]
    pub fn project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.project_root = Some(root.into());
        self
    }

    /// Current settings.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Artifact store used by this resolver.
    #[must_use]
    pub fn store(&self) -> &dyn ArtifactStore {
        self.store.as_ref()
    }

    /// Name the block's artifact is stored under.
    #[must_use]
    pub fn artifact_name(&self, block: &DiagramBlock) -> ArtifactName {
        let key = ContentKey::of(&normalize(&block.source));
        self.name_for(block, &key)
    }

    fn name_for(&self, block: &DiagramBlock, key: &ContentKey) -> ArtifactName {
        ArtifactName::new(
            &block.owner,
            self.config.project_root.as_deref(),
            key,
            block.format,
        )
    }

    /// Resolve one block.
    pub fn resolve(&self, block: &DiagramBlock) -> RenderResult {
        if block.language != self.config.language {
            return RenderResult::Failed(DiagramError::LanguageMismatch {
                expected: self.config.language.clone(),
                found: block.language.clone(),
            });
        }

        let normalized = normalize(&block.source);
        let key = ContentKey::of(&normalized);
        let name = self.name_for(block, &key);

        if self.config.prefer_local_cache
            && let Some(bytes) = self.read_cached(&name)
        {
            tracing::debug!(%name, "diagram served from cache");
            return RenderResult::Cached(bytes);
        }

        let encoded = match try_encode(&normalized) {
            Ok(encoded) => encoded,
            Err(e) => {
                return RenderResult::Failed(DiagramError::EncodingInputInvalid(e.to_string()));
            }
        };

        let bytes = match self.renderer.render(&encoded, block.format) {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = DiagramError::from(e);
                tracing::warn!(%name, error = %err, "diagram rendering failed");
                return RenderResult::Failed(err);
            }
        };

        // A failed cache write does not downgrade the result
        match self.store.write(name.as_str(), &bytes) {
            Ok(()) => tracing::info!(%name, size = bytes.len(), "rendered diagram"),
            Err(e) => {
                tracing::warn!(%name, error = %DiagramError::from(e), "failed to cache diagram");
            }
        }

        RenderResult::Rendered(bytes)
    }

    /// Read a cached artifact, treating any read problem as a miss.
    fn read_cached(&self, name: &ArtifactName) -> Option<Vec<u8>> {
        if !self.store.has(name.as_str()) {
            return None;
        }
        match self.store.read(name.as_str()) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(%name, error = %DiagramError::from(e), "ignoring unreadable cache entry");
                None
            }
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::block::DiagramFormat;
    use crate::encoder::decode;
    use crate::remote::RenderError;
    use puml_cache::{FileStore, StoreError};
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Renderer double that records calls and fails on request.
    #[derive(Default)]
    pub(crate) struct FakeRenderer {
        pub calls: AtomicUsize,
        pub requests: Mutex<Vec<String>>,
        /// Decoded sources containing any of these substrings fail.
        pub fail_on: Mutex<HashSet<String>>,
        pub response: Vec<u8>,
    }

    impl FakeRenderer {
        pub(crate) fn returning(response: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                response: response.to_vec(),
                ..Self::default()
            })
        }

        pub(crate) fn failing_on(response: &[u8], needle: &str) -> Arc<Self> {
            let renderer = Self::returning(response);
            renderer.fail_on.lock().unwrap().insert(needle.to_owned());
            renderer
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Renderer for FakeRenderer {
        fn render(&self, encoded: &str, _format: DiagramFormat) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let source = decode(encoded).unwrap();
            self.requests.lock().unwrap().push(source.clone());

            if self
                .fail_on
                .lock()
                .unwrap()
                .iter()
                .any(|needle| source.contains(needle.as_str()))
            {
                return Err(RenderError::Service {
                    url: format!("http://fake/{encoded}"),
                    status: 400,
                    body: "Syntax Error?".to_owned(),
                });
            }
            Ok(self.response.clone())
        }
    }

    /// Store whose reads always fail.
    struct CorruptStore;

    impl ArtifactStore for CorruptStore {
        fn has(&self, _name: &str) -> bool {
            true
        }

        fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::Read {
                name: name.to_owned(),
                source: std::io::Error::other("corrupt"),
            })
        }

        fn write(&self, name: &str, _bytes: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Write {
                name: name.to_owned(),
                source: std::io::Error::other("read-only"),
            })
        }
    }

    fn file_resolver(root: &Path, renderer: Arc<FakeRenderer>) -> Resolver {
        Resolver::new(Arc::new(FileStore::new(root)), renderer)
    }

    #[test]
    fn test_end_to_end_render_then_cache() {
        let tmp = TempDir::new().unwrap();
        let renderer = FakeRenderer::returning(b"<svg>OK</svg>");
        let resolver = file_resolver(tmp.path(), Arc::clone(&renderer));
        let block = DiagramBlock::new(" Alice -> Bob: hi ", "guide.md");

        let first = resolver.resolve(&block);
        assert!(matches!(&first, RenderResult::Rendered(b) if b == b"<svg>OK</svg>"));

        let key = ContentKey::of("@startuml\nAlice -> Bob: hi\n@enduml");
        let expected = tmp.path().join(format!("guide-{key}.svg"));
        assert_eq!(std::fs::read(&expected).unwrap(), b"<svg>OK</svg>");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);

        let second = resolver.resolve(&block);
        assert!(matches!(&second, RenderResult::Cached(b) if b == b"<svg>OK</svg>"));
        assert_eq!(renderer.call_count(), 1);
    }

    #[test]
    fn test_renderer_receives_normalized_source() {
        let tmp = TempDir::new().unwrap();
        let renderer = FakeRenderer::returning(b"<svg/>");
        let resolver = file_resolver(tmp.path(), Arc::clone(&renderer));

        resolver.resolve(&DiagramBlock::new("  A -> B\n", "a.md"));

        assert_eq!(
            *renderer.requests.lock().unwrap(),
            vec!["@startuml\nA -> B\n@enduml".to_owned()]
        );
    }

    #[test]
    fn test_prefer_local_cache_disabled_always_renders() {
        let tmp = TempDir::new().unwrap();
        let renderer = FakeRenderer::returning(b"<svg/>");
        let resolver = file_resolver(tmp.path(), Arc::clone(&renderer)).prefer_local_cache(false);
        let block = DiagramBlock::new("A -> B", "a.md");

        assert!(matches!(resolver.resolve(&block), RenderResult::Rendered(_)));
        assert!(matches!(resolver.resolve(&block), RenderResult::Rendered(_)));
        assert_eq!(renderer.call_count(), 2);
        // Artifacts are still written
        assert!(resolver.store().has(resolver.artifact_name(&block).as_str()));
    }

    #[test]
    fn test_render_failure_is_a_value() {
        let tmp = TempDir::new().unwrap();
        let renderer = FakeRenderer::failing_on(b"<svg/>", "broken");
        let resolver = file_resolver(tmp.path(), renderer);

        let result = resolver.resolve(&DiagramBlock::new("broken ->", "a.md"));

        assert!(matches!(
            result.error(),
            Some(DiagramError::RenderService { status: 400, .. })
        ));
        // Nothing is cached for a failed render
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_cache_entry_falls_back_to_render() {
        let renderer = FakeRenderer::returning(b"<svg>fresh</svg>");
        let resolver =
            Resolver::new(Arc::new(CorruptStore), Arc::<FakeRenderer>::clone(&renderer));

        let result = resolver.resolve(&DiagramBlock::new("A -> B", "a.md"));

        // Read failure degrades to a miss; write failure does not downgrade the result
        assert!(matches!(&result, RenderResult::Rendered(b) if b == b"<svg>fresh</svg>"));
        assert_eq!(renderer.call_count(), 1);
    }

    #[test]
    fn test_same_text_different_owners_cached_separately() {
        let tmp = TempDir::new().unwrap();
        let renderer = FakeRenderer::returning(b"<svg/>");
        let resolver = file_resolver(tmp.path(), Arc::clone(&renderer));

        let a = DiagramBlock::new("A -> B", "one.md");
        let b = DiagramBlock::new("A -> B", "two.md");
        resolver.resolve(&a);
        resolver.resolve(&b);

        assert_ne!(resolver.artifact_name(&a), resolver.artifact_name(&b));
        assert_eq!(renderer.call_count(), 2);
    }

    #[test]
    fn test_project_root_shapes_artifact_name() {
        let renderer = FakeRenderer::returning(b"<svg/>");
        let resolver = Resolver::uncached(renderer).project_root("/site");
        let block =
            DiagramBlock::new("A -> B", "/site/docs/intro.md").with_format(DiagramFormat::Png);

        let name = resolver.artifact_name(&block);
        assert!(name.as_str().starts_with("docs-intro-"));
        assert!(name.as_str().ends_with(".png"));
    }

    #[test]
    fn test_uncached_resolver_always_renders() {
        let renderer = FakeRenderer::returning(b"<svg/>");
        let resolver = Resolver::uncached(Arc::<FakeRenderer>::clone(&renderer));
        let block = DiagramBlock::new("A -> B", "a.md");

        resolver.resolve(&block);
        resolver.resolve(&block);
        assert_eq!(renderer.call_count(), 2);
    }

    #[test]
    fn test_empty_source_renders_bare_markers() {
        let renderer = FakeRenderer::returning(b"<svg/>");
        let resolver = Resolver::uncached(Arc::<FakeRenderer>::clone(&renderer));

        let result = resolver.resolve(&DiagramBlock::new(" \n ", "a.md"));
        assert!(matches!(result, RenderResult::Rendered(_)));
        let requests = renderer.requests.lock().unwrap().clone();
        assert_eq!(requests, vec!["@startuml\n\n@enduml".to_owned()]);
    }

    #[test]
    fn test_language_mismatch_fails_without_request() {
        let renderer = FakeRenderer::returning(b"<svg/>");
        let resolver = Resolver::uncached(Arc::<FakeRenderer>::clone(&renderer)).language("puml");

        let result = resolver.resolve(&DiagramBlock::new("A -> B", "a.md"));
        assert!(matches!(
            result.error(),
            Some(DiagramError::LanguageMismatch { expected, found })
                if expected == "puml" && found == "plantuml"
        ));
        assert_eq!(renderer.call_count(), 0);
    }

    #[test]
    fn test_render_result_accessors() {
        let cached = RenderResult::Cached(b"x".to_vec());
        assert!(cached.is_success());
        assert!(cached.is_cached());
        assert_eq!(cached.bytes(), Some(&b"x"[..]));

        let failed = RenderResult::Failed(DiagramError::Cancelled);
        assert!(!failed.is_success());
        assert!(failed.bytes().is_none());
        assert!(failed.error().is_some());
    }
}
