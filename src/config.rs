//! TeloView configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main TeloView configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeloViewConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Course indexer configuration
    #[serde(default)]
    pub indexer: IndexerConfig,

    /// Streaming proxy configuration
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Channel source configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl TeloViewConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the core misbehave
    pub fn validate(&self) -> Result<()> {
        if self.streaming.chunk_size == 0 {
            return Err(Error::Config("streaming.chunk_size must be > 0".to_string()));
        }
        if self.indexer.header_max_len == 0 {
            return Err(Error::Config("indexer.header_max_len must be > 0".to_string()));
        }
        if self.indexer.default_module.trim().is_empty() {
            return Err(Error::Config(
                "indexer.default_module must not be empty".to_string(),
            ));
        }
        if self.server.port_scan_limit == 0 {
            return Err(Error::Config("server.port_scan_limit must be > 0".to_string()));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// First port to try
    pub port: u16,

    /// How many consecutive ports to probe before giving up
    pub port_scan_limit: u16,

    /// Open the browser once indexing is done
    pub open_browser: bool,

    /// Allowed CORS origins (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            port_scan_limit: 100,
            open_browser: true,
            cors_origins: Vec::new(),
        }
    }
}

/// Content indexer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Module that receives lessons seen before any header
    pub default_module: String,

    /// Explicit marker token announcing a module header (matched case-insensitively)
    pub module_marker: String,

    /// Texts shorter than this many characters are treated as headers
    pub header_max_len: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            default_module: "Course Content".to_string(),
            module_marker: "MODULE:".to_string(),
            header_max_len: 60,
        }
    }
}

/// Streaming proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Size of each chunk pulled from the connector
    pub chunk_size: usize,

    /// Content type declared for every stream (containers are not inspected)
    pub content_type: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512 * 1024,
            content_type: "video/mp4".to_string(),
        }
    }
}

/// Where the channel messages come from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A local channel export: `messages.json` plus media files
    Local {
        /// Export directory
        dir: PathBuf,
    },

    /// A remote channel mirror reachable over HTTP
    Http {
        /// API base URL
        base_url: String,

        /// Channel reference (link, username or numeric id)
        channel: String,

        /// Environment variable holding the bearer token
        #[serde(default = "default_token_env")]
        token_env: String,
    },
}

fn default_token_env() -> String {
    "TELOVIEW_TOKEN".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Local {
            dir: PathBuf::from("."),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for local state
    pub base_dir: PathBuf,

    /// Course library file
    pub courses_file: PathBuf,

    /// Saved session token
    pub session_file: PathBuf,
}

impl StorageConfig {
    /// Storage rooted at a custom directory
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            courses_file: base.join("courses.json"),
            session_file: base.join("session.txt"),
            base_dir: base,
        }
    }

    /// Read the saved session token, if any
    pub fn read_session(&self) -> Option<String> {
        std::fs::read_to_string(&self.session_file)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs_next::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".course");
        Self::rooted_at(base)
    }
}
