//! Configuration management for puml.
//!
//! Parses `puml.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! The directory holding the config file is the project root: document paths
//! are named relative to it and a relative cache directory is resolved
//! against it. CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! `server.url` supports `${VAR}` and `${VAR:-default}` references.

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use puml_diagrams::consts::{DEFAULT_LANGUAGE, DEFAULT_TIMEOUT};
use puml_diagrams::{DiagramFormat, ResolverConfig};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "puml.toml";

/// Default artifact directory, relative to the project root.
const DEFAULT_CACHE_DIR: &str = "diagrams";

/// Default document glob.
const DEFAULT_PATTERN: &str = "**/*.md";

/// Upper bound for `server.timeout_ms`.
const MAX_TIMEOUT: Duration = Duration::from_secs(600);

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server base URL.
    pub server_url: Option<String>,
    /// Override request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Override output format.
    pub format: Option<DiagramFormat>,
    /// Override document glob.
    pub pattern: Option<String>,
    /// Override artifact directory.
    pub cache_dir: Option<PathBuf>,
    /// Override whether existing artifacts are reused.
    pub prefer_local: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    server: ServerConfigRaw,
    diagrams: DiagramsConfigRaw,
    cache: CacheConfigRaw,

    /// Resolved server configuration (set after loading).
    #[serde(skip)]
    pub server_resolved: ServerConfig,
    /// Resolved diagram configuration (set after loading).
    #[serde(skip)]
    pub diagrams_resolved: DiagramsConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Directory containing the config file, or the working directory.
    #[serde(skip)]
    pub project_root: PathBuf,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw `[server]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ServerConfigRaw {
    url: Option<String>,
    timeout_ms: Option<u64>,
}

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Explicit base URL; `None` means the public server for the format.
    pub url: Option<String>,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Raw `[diagrams]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DiagramsConfigRaw {
    format: Option<String>,
    language: Option<String>,
    pattern: Option<String>,
}

/// Resolved diagram configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramsConfig {
    /// Output format for every diagram.
    pub format: DiagramFormat,
    /// Fence language tag that marks a diagram block.
    pub language: String,
    /// Glob selecting documents, relative to the working directory.
    pub pattern: String,
}

impl Default for DiagramsConfig {
    fn default() -> Self {
        Self {
            format: DiagramFormat::default(),
            language: DEFAULT_LANGUAGE.to_owned(),
            pattern: DEFAULT_PATTERN.to_owned(),
        }
    }
}

/// Raw `[cache]` section.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    dir: Option<String>,
    prefer_local: Option<bool>,
}

/// Resolved artifact cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheConfig {
    /// Directory rendered artifacts are written to.
    pub dir: PathBuf,
    /// Serve existing artifacts before asking the server.
    pub prefer_local: bool,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.url`").
        field: String,
        /// Error message (e.g., "${`PLANTUML_URL`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `puml.toml` in current directory and parents,
    /// falling back to defaults rooted at the current directory.
    ///
    /// CLI settings are applied after loading and path resolution, and the
    /// result is validated.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Server base URL, defaulting to the public server for the configured format.
    #[must_use]
    pub fn server_url(&self) -> String {
        self.server_resolved
            .url
            .clone()
            .unwrap_or_else(|| self.diagrams_resolved.format.public_server_url())
    }

    /// Resolver settings derived from this configuration.
    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            prefer_local_cache: self.cache_resolved.prefer_local,
            language: self.diagrams_resolved.language.clone(),
            project_root: Some(self.project_root.clone()),
        }
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(url) = &settings.server_url {
            self.server_resolved.url = Some(url.clone());
        }
        if let Some(timeout_ms) = settings.timeout_ms {
            self.server_resolved.timeout = Duration::from_millis(timeout_ms);
        }
        if let Some(format) = settings.format {
            self.diagrams_resolved.format = format;
        }
        if let Some(pattern) = &settings.pattern {
            self.diagrams_resolved.pattern.clone_from(pattern);
        }
        if let Some(dir) = &settings.cache_dir {
            self.cache_resolved.dir.clone_from(dir);
        }
        if let Some(prefer_local) = settings.prefer_local {
            self.cache_resolved.prefer_local = prefer_local;
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_diagrams()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if let Some(url) = &self.server_resolved.url {
            require_non_empty(url, "server.url")?;
            require_http_url(url, "server.url")?;
        }

        let timeout = self.server_resolved.timeout;
        if timeout.is_zero() {
            return Err(ConfigError::Validation(
                "server.timeout_ms must be greater than 0".to_owned(),
            ));
        }
        if timeout > MAX_TIMEOUT {
            return Err(ConfigError::Validation(format!(
                "server.timeout_ms cannot exceed {}",
                MAX_TIMEOUT.as_millis()
            )));
        }

        Ok(())
    }

    fn validate_diagrams(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.diagrams_resolved.language, "diagrams.language")?;
        require_non_empty(&self.diagrams_resolved.pattern, "diagrams.pattern")?;
        Ok(())
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config rooted at the current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config rooted at the given directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server_resolved: ServerConfig::default(),
            diagrams_resolved: DiagramsConfig::default(),
            cache_resolved: CacheConfig {
                dir: base.join(DEFAULT_CACHE_DIR),
                prefer_local: true,
            },
            project_root: base.to_path_buf(),
            ..Self::default()
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before resolution
        config.expand_env_vars()?;

        // Owner paths are absolute, so the project root must be too
        let config_dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        config.resolve(&std::path::absolute(config_dir)?)?;
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.server.url {
            self.server.url = Some(expand::expand_env(url, "server.url")?);
        }
        Ok(())
    }

    /// Resolve raw sections against the config directory.
    fn resolve(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let format = match self.diagrams.format.as_deref() {
            Some(value) => DiagramFormat::parse(value).ok_or_else(|| {
                ConfigError::Validation(format!(
                    "diagrams.format must be \"svg\" or \"png\", got \"{value}\""
                ))
            })?,
            None => DiagramFormat::default(),
        };

        self.server_resolved = ServerConfig {
            url: self.server.url.clone(),
            timeout: self
                .server
                .timeout_ms
                .map_or(DEFAULT_TIMEOUT, Duration::from_millis),
        };
        self.diagrams_resolved = DiagramsConfig {
            format,
            language: self
                .diagrams
                .language
                .clone()
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned()),
            pattern: self
                .diagrams
                .pattern
                .clone()
                .unwrap_or_else(|| DEFAULT_PATTERN.to_owned()),
        };
        self.cache_resolved = CacheConfig {
            dir: config_dir.join(self.cache.dir.as_deref().unwrap_or(DEFAULT_CACHE_DIR)),
            prefer_local: self.cache.prefer_local.unwrap_or(true),
        };
        self.project_root = config_dir.to_path_buf();

        Ok(())
    }
}
