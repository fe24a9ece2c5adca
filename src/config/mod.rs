//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`TOKCOUNT_*`)
//! - CLI arguments (for the server)
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 5000
//!
//! [vocab]
//! dir = "/opt/tokcount/vocab"
//! offline = true
//!
//! [framing]
//! reply_priming_tokens = 3
//!
//! [[framing.snapshots]]
//! name = "gpt-4-1106-preview"
//! tokens_per_message = 3
//! tokens_per_name = 1
//!
//! [[models]]
//! model = "my-finetune"
//! encoding = "cl100k_base"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::encoding::DEFAULT_BASE_URL;
use crate::error::{Result, TokCountError};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSection,

    /// Vocabulary loading configuration
    #[serde(default)]
    pub vocab: VocabConfig,

    /// Framing rule overrides
    #[serde(default)]
    pub framing: FramingConfig,

    /// Extra exact model -> encoding mappings
    #[serde(default)]
    pub models: Vec<ModelMapping>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| TokCountError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| TokCountError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Load from an optional file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        Ok(config.with_env())
    }

    /// Apply `TOKCOUNT_*` environment variables on top of this config
    pub fn with_env(mut self) -> Self {
        if let Ok(host) = std::env::var("TOKCOUNT_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("TOKCOUNT_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }

        if let Ok(dir) = std::env::var("TOKCOUNT_VOCAB_DIR") {
            self.vocab.dir = Some(PathBuf::from(dir));
        }
        if let Ok(dir) = std::env::var("TOKCOUNT_CACHE_DIR") {
            self.vocab.cache_dir = Some(PathBuf::from(dir));
        }
        if let Ok(url) = std::env::var("TOKCOUNT_VOCAB_URL") {
            self.vocab.base_url = url;
        }
        if let Ok(val) = std::env::var("TOKCOUNT_OFFLINE") {
            self.vocab.offline = matches!(val.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        self
    }
}

/// HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable permissive CORS
    pub cors: bool,

    /// Maximum request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            cors: true,
            max_body_size: 2 * 1024 * 1024, // 2 MB
        }
    }
}

impl ServerSection {
    /// Get the full listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Vocabulary loading configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabConfig {
    /// Local directory holding `*.tiktoken` rank files (checked first)
    pub dir: Option<PathBuf>,

    /// Directory downloaded rank files are cached in
    pub cache_dir: Option<PathBuf>,

    /// Base URL rank files are downloaded from
    pub base_url: String,

    /// Never download; only read `dir` and `cache_dir`
    pub offline: bool,

    /// Download timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self {
            dir: None,
            cache_dir: dirs::cache_dir().map(|p| p.join("tokcount")),
            base_url: DEFAULT_BASE_URL.to_string(),
            offline: false,
            timeout_secs: 60,
        }
    }
}

/// Framing rule overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FramingConfig {
    /// Reply priming overhead; the built-in value is used when unset
    pub reply_priming_tokens: Option<i64>,

    /// Extra or replacement snapshot rules
    pub snapshots: Vec<SnapshotRule>,

    /// Extra or replacement aliases
    pub aliases: Vec<AliasRule>,

    /// Extra family rules, checked before the built-in ones
    pub families: Vec<FamilyRuleConfig>,
}

/// Framing constants for one dated snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRule {
    /// Exact snapshot name
    pub name: String,
    /// Tokens added for every message
    pub tokens_per_message: i64,
    /// Adjustment added when a message carries a name
    pub tokens_per_name: i64,
}

/// Versionless alias for a dated snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasRule {
    /// Model name as supplied by callers
    pub alias: String,
    /// Snapshot it stands for
    pub snapshot: String,
}

/// Family substring and the snapshot whose rules it inherits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRuleConfig {
    /// Substring identifying the family
    pub pattern: String,
    /// Canonical snapshot of the family
    pub snapshot: String,
}

/// Exact model -> encoding mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMapping {
    /// Model identifier
    pub model: String,
    /// Encoding name (e.g. `cl100k_base`)
    pub encoding: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.vocab.base_url, DEFAULT_BASE_URL);
        assert!(!config.vocab.offline);
        assert!(config.framing.snapshots.is_empty());
        assert!(config.models.is_empty());
    }

    #[test]
    fn test_listen_addr() {
        let server = ServerSection::default();
        assert_eq!(server.listen_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 9090

            [vocab]
            dir = "/opt/vocab"
            offline = true

            [framing]
            reply_priming_tokens = 3

            [[framing.snapshots]]
            name = "gpt-4-1106-preview"
            tokens_per_message = 3
            tokens_per_name = 1

            [[framing.families]]
            pattern = "gpt-4-turbo"
            snapshot = "gpt-4-1106-preview"

            [[models]]
            model = "my-finetune"
            encoding = "cl100k_base"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert!(config.server.cors);
        assert_eq!(config.vocab.dir, Some(PathBuf::from("/opt/vocab")));
        assert!(config.vocab.offline);
        assert_eq!(config.vocab.timeout_secs, 60);
        assert_eq!(config.framing.reply_priming_tokens, Some(3));
        assert_eq!(config.framing.snapshots[0].name, "gpt-4-1106-preview");
        assert_eq!(config.framing.families[0].pattern, "gpt-4-turbo");
        assert_eq!(config.models[0].encoding, "cl100k_base");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokcount.toml");
        std::fs::write(&path, "[server]\nport = 7000\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "127.0.0.1");

        assert!(Config::from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, TokCountError::Config(_)));
    }
}
