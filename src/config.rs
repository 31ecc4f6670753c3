//! Configuration file parser for ~/.config/toplists/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, but we log a warning so typos are visible.
//! The API key may also come from the `TOPLISTS_API_KEY` environment variable,
//! which takes precedence over the file.
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `api_key` from the config file.
pub const API_KEY_ENV: &str = "TOPLISTS_API_KEY";

/// Public endpoint of the most-popular API.
pub const DEFAULT_BASE_URL: &str = "https://api.nytimes.com/svc/mostpopular/v2";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("No API key configured: set TOPLISTS_API_KEY or api_key in config.toml")]
    MissingApiKey,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// `Debug` masks `api_key` so the key never reaches logs.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key appended to every list request.
    pub api_key: Option<String>,

    /// Base URL of the ranked-list API (without the list segment).
    pub base_url: String,

    /// Minimum delay between a network fetch completing and the list being
    /// committed, so fast responses do not flash the loading indicator.
    pub settle_delay_ms: u64,

    /// Timeout for list and image requests.
    pub request_timeout_secs: u64,

    /// Largest image body the loader accepts.
    pub max_image_bytes: usize,

    /// Keybinding overrides: action name to key string (e.g. `retry = "R"`).
    pub keybindings: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            settle_delay_ms: 750,
            request_timeout_secs: 30,
            max_image_bytes: 5 * 1024 * 1024,
            keybindings: HashMap::new(),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("keybindings", &self.keybindings)
            .finish()
    }
}

impl Config {
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "api_key",
        "base_url",
        "settle_delay_ms",
        "request_timeout_secs",
        "max_image_bytes",
        "keybindings",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), base_url = %config.base_url, "Loaded configuration");
        Ok(config)
    }

    /// Resolve the API key: environment variable first, then the config file.
    pub fn resolve_api_key(&self) -> Result<SecretString, ConfigError> {
        let from_env = std::env::var(API_KEY_ENV).ok();
        Self::pick_api_key(from_env, self.api_key.clone())
    }

    fn pick_api_key(
        from_env: Option<String>,
        from_file: Option<String>,
    ) -> Result<SecretString, ConfigError> {
        from_env
            .filter(|k| !k.trim().is_empty())
            .or_else(|| from_file.filter(|k| !k.trim().is_empty()))
            .map(|k| SecretString::from(k.trim().to_string()))
            .ok_or(ConfigError::MissingApiKey)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn write_config(name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("toplists_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cleanup(path: &Path) {
        if let Some(dir) = path.parent() {
            std::fs::remove_dir_all(dir).ok();
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.settle_delay(), Duration::from_millis(750));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_image_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/toplists_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.settle_delay_ms, 750);
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let path = write_config("whitespace", "   \n  \n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        cleanup(&path);
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let path = write_config("partial", "settle_delay_ms = 0\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.settle_delay_ms, 0);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        cleanup(&path);
    }

    #[test]
    fn test_full_config() {
        let path = write_config(
            "full",
            r#"
api_key = "file-key"
base_url = "https://api.example.com/v2"
settle_delay_ms = 250
request_timeout_secs = 10
max_image_bytes = 1024

[keybindings]
retry = "R"
"#,
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.base_url, "https://api.example.com/v2");
        assert_eq!(config.settle_delay(), Duration::from_millis(250));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_image_bytes, 1024);
        assert_eq!(config.keybindings.get("retry").map(String::as_str), Some("R"));
        cleanup(&path);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let path = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        cleanup(&path);
    }

    #[test]
    fn test_wrong_type_returns_error() {
        let path = write_config("wrongtype", "settle_delay_ms = \"soon\"\n");
        assert!(Config::load(&path).is_err());
        cleanup(&path);
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let path = write_config("unknown", "settle_delay_ms = 5\nshiny = true\n");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.settle_delay_ms, 5);
        cleanup(&path);
    }

    #[test]
    fn test_too_large_file_rejected() {
        let path = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        cleanup(&path);
    }

    #[test]
    fn test_debug_masks_api_key() {
        let config = Config {
            api_key: Some("super-secret-key-12345".to_string()),
            ..Config::default()
        };
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super-secret-key-12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn test_env_key_takes_precedence() {
        let key = Config::pick_api_key(Some("env-key".into()), Some("file-key".into())).unwrap();
        assert_eq!(key.expose_secret(), "env-key");

        let key = Config::pick_api_key(Some("  ".into()), Some("file-key".into())).unwrap();
        assert_eq!(key.expose_secret(), "file-key");

        assert!(matches!(
            Config::pick_api_key(None, None),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn test_zero_timeout_clamped() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }
}
