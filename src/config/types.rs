//! Configuration types, defaults, loading, and validation.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// LLM provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Debate engine tunables
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: "127.0.0.1")
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Server port (default: 8787)
    #[serde(default = "default_port")]
    pub port: u16,

    /// CORS allowed origins; empty means same-origin only
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            allowed_origins: Vec::new(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file path. Defaults to the platform data dir.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agora")
        .join("agora.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// API key; falls back to the ANTHROPIC_API_KEY environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override the API endpoint (proxy / compatible gateway)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Model used for streamed debate turns
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Cheaper model used for memory extraction and episodic compression
    #[serde(default = "default_extraction_model")]
    pub extraction_model: String,
}

fn default_generation_model() -> String {
    "claude-sonnet-4-6".to_string()
}

fn default_extraction_model() -> String {
    "claude-haiku-4-5".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            generation_model: default_generation_model(),
            extraction_model: default_extraction_model(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }
}

/// Debate engine tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recent transcript turns replayed verbatim per model call
    #[serde(default = "default_recent_turns_window")]
    pub recent_turns_window: usize,

    /// A character's own-turn count must exceed this before episodic
    /// compression runs
    #[serde(default = "default_compression_threshold")]
    pub compression_threshold: i64,

    /// Token cap for a single streamed turn
    #[serde(default = "default_turn_max_tokens")]
    pub turn_max_tokens: u32,

    /// Token cap for memory-extraction calls
    #[serde(default = "default_extraction_max_tokens")]
    pub extraction_max_tokens: u32,

    /// Token cap for episodic summaries
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,

    /// Token cap for topic-suggestion calls
    #[serde(default = "default_topics_max_tokens")]
    pub topics_max_tokens: u32,
}

fn default_recent_turns_window() -> usize {
    6
}

fn default_compression_threshold() -> i64 {
    4
}

fn default_turn_max_tokens() -> u32 {
    1024
}

fn default_extraction_max_tokens() -> u32 {
    1024
}

fn default_summary_max_tokens() -> u32 {
    512
}

fn default_topics_max_tokens() -> u32 {
    512
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            recent_turns_window: default_recent_turns_window(),
            compression_threshold: default_compression_threshold(),
            turn_max_tokens: default_turn_max_tokens(),
            extraction_max_tokens: default_extraction_max_tokens(),
            summary_max_tokens: default_summary_max_tokens(),
            topics_max_tokens: default_topics_max_tokens(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (default: "info"); RUST_LOG overrides
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agora")
            .join("config.toml")
    }

    /// Load from `path`, or from the default location. A missing file yields
    /// the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Write the default configuration to `path`.
    pub fn write_default(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            anyhow::bail!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            );
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
        }
        let content =
            toml::to_string_pretty(&Config::default()).context("Failed to serialize defaults")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Sanity checks on tunables.
    pub fn validate(&self) -> Result<()> {
        if self.engine.recent_turns_window == 0 {
            anyhow::bail!("engine.recent_turns_window must be at least 1");
        }
        if self.engine.compression_threshold < 1 {
            anyhow::bail!("engine.compression_threshold must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.engine.recent_turns_window, 6);
        assert_eq!(config.engine.compression_threshold, 4);
        assert_eq!(config.provider.generation_model, "claude-sonnet-4-6");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9000

            [engine]
            recent_turns_window = 8
            "#,
        )
        .expect("parse");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, "127.0.0.1");
        assert_eq!(config.engine.recent_turns_window, 8);
        assert_eq!(config.engine.compression_threshold, 4);
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config: Config = toml::from_str(
            r#"
            [engine]
            recent_turns_window = 0
            "#,
        )
        .expect("parse");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_write_default_refuses_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        Config::write_default(&path, false).expect("first write");
        assert!(Config::write_default(&path, false).is_err());
        Config::write_default(&path, true).expect("forced overwrite");
    }
}
