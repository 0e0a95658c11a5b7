//! Configuration management.
//!
//! Settings are layered: an optional TOML file first, then `VECTORIZE_*`
//! environment variables on top.
//!
//! ```toml
//! org_id = "your-org-id"
//! token = "your-access-token"
//! pipeline_id = "default-pipeline"   # optional
//! api_url = "https://api.vectorize.io/v1"
//! poll_interval_ms = 1000
//! poll_timeout_secs = 300
//! poll_max_attempts = 600            # optional
//! chunk_size = 512
//! upload_file_name = "My File"
//! request_timeout_secs = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_API_URL;
use crate::utils::PollConfig;

/// Environment variable prefix for all settings
pub const ENV_PREFIX: &str = "VECTORIZE";

/// Configuration file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "vectorize-mcp.toml";

/// Application configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Vectorize organization id (`VECTORIZE_ORG_ID`)
    #[serde(default)]
    pub org_id: String,

    /// Vectorize access token (`VECTORIZE_TOKEN`)
    #[serde(default)]
    pub token: String,

    /// Pipeline used when a tool call does not name one (`VECTORIZE_PIPELINE_ID`)
    #[serde(default)]
    pub pipeline_id: Option<String>,

    /// API base URL (`VECTORIZE_API_URL`)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Delay between job status polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum time spent polling one job, in seconds (0 = no limit)
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,

    /// Maximum number of polls for one job
    #[serde(default)]
    pub poll_max_attempts: Option<u32>,

    /// Chunk size requested for extractions
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Name given to files uploaded for extraction
    #[serde(default = "default_upload_file_name")]
    pub upload_file_name: String,

    /// HTTP request timeout, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("org_id", &self.org_id)
            .field("token", &"<redacted>")
            .field("pipeline_id", &self.pipeline_id)
            .field("api_url", &self.api_url)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("chunk_size", &self.chunk_size)
            .field("upload_file_name", &self.upload_file_name)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            org_id: String::new(),
            token: String::new(),
            pipeline_id: None,
            api_url: default_api_url(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_secs: default_poll_timeout_secs(),
            poll_max_attempts: None,
            chunk_size: default_chunk_size(),
            upload_file_name: default_upload_file_name(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_secs() -> u64 {
    300
}

fn default_chunk_size() -> u32 {
    512
}

fn default_upload_file_name() -> String {
    "My File".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Configuration errors. Any of these prevents the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A mandatory setting is absent or blank
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    /// A setting has an unusable value
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// The file or environment could not be read
    #[error(transparent)]
    Load(#[from] config::ConfigError),
}

impl Config {
    /// Create a configuration with credentials and defaults for everything else
    pub fn new(org_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            token: token.into(),
            ..Default::default()
        }
    }

    /// Set the default pipeline id
    pub fn with_pipeline_id(mut self, pipeline_id: impl Into<String>) -> Self {
        self.pipeline_id = Some(pipeline_id.into());
        self
    }

    /// Set the API base URL
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// Default pipeline id, if one is configured and not blank
    pub fn default_pipeline_id(&self) -> Option<&str> {
        self.pipeline_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// Polling settings derived from the configuration
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.poll_max_attempts,
            timeout: (self.poll_timeout_secs > 0)
                .then(|| Duration::from_secs(self.poll_timeout_secs)),
        }
    }

    /// HTTP request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check mandatory settings and normalize optional ones.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        self.org_id = self.org_id.trim().to_string();
        self.token = self.token.trim().to_string();

        if self.org_id.is_empty() {
            return Err(ConfigError::Missing("VECTORIZE_ORG_ID"));
        }
        if self.token.is_empty() {
            return Err(ConfigError::Missing("VECTORIZE_TOKEN"));
        }

        self.pipeline_id = self.default_pipeline_id().map(str::to_string);

        url::Url::parse(&self.api_url)
            .map_err(|e| ConfigError::Invalid(format!("api_url '{}': {}", self.api_url, e)))?;

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.poll_max_attempts == Some(0) {
            return Err(ConfigError::Invalid(
                "poll_max_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(self)
    }
}

/// Look for a configuration file in the usual places
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("vectorize-mcp").join("config.toml"))
        .filter(|path| path.is_file())
}

/// Load configuration from an optional file and the environment.
///
/// The result is not validated; call [`Config::validate`] before serving.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll_interval_ms, 1000);
        assert_eq!(config.chunk_size, 512);
        assert_eq!(config.upload_file_name, "My File");
        assert!(config.pipeline_id.is_none());
    }

    #[test]
    fn test_validate_requires_org_id() {
        let result = Config::new("", "token").validate();
        assert!(matches!(result, Err(ConfigError::Missing("VECTORIZE_ORG_ID"))));
    }

    #[test]
    fn test_validate_requires_token() {
        let result = Config::new("org", "   ").validate();
        assert!(matches!(result, Err(ConfigError::Missing("VECTORIZE_TOKEN"))));
    }

    #[test]
    fn test_missing_message_names_variable() {
        let err = Config::new("org", "").validate().unwrap_err();
        assert_eq!(err.to_string(), "VECTORIZE_TOKEN environment variable is required");
    }

    #[test]
    fn test_blank_pipeline_is_dropped() {
        let config = Config::new("org", "token")
            .with_pipeline_id("  ")
            .validate()
            .unwrap();
        assert!(config.pipeline_id.is_none());
        assert!(config.default_pipeline_id().is_none());
    }

    #[test]
    fn test_pipeline_is_trimmed() {
        let config = Config::new("org", "token")
            .with_pipeline_id(" p1 ")
            .validate()
            .unwrap();
        assert_eq!(config.default_pipeline_id(), Some("p1"));
    }

    #[test]
    fn test_invalid_api_url() {
        let result = Config::new("org", "token").with_api_url("nope").validate();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = Config::new("org", "token");
        config.poll_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_poll_config_from_settings() {
        let mut config = Config::new("org", "token");
        config.poll_interval_ms = 250;
        config.poll_timeout_secs = 0;
        config.poll_max_attempts = Some(10);

        let poll = config.poll_config();
        assert_eq!(poll.interval, Duration::from_millis(250));
        assert_eq!(poll.timeout, None);
        assert_eq!(poll.max_attempts, Some(10));
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", Config::new("org", "very-secret"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectorize-mcp.toml");
        let mut file = File::create(&path).unwrap();
        file.write_all(
            br#"
org_id = "file-org"
token = "file-token"
upload_file_name = "Upload"
poll_interval_ms = 50
chunk_size = 256
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.upload_file_name, "Upload");
        assert_eq!(config.poll_interval_ms, 50);
        assert_eq!(config.chunk_size, 256);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let path = PathBuf::from("/nonexistent/vectorize-mcp.toml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();

        assert!(matches!(load_config(Some(&path)), Err(ConfigError::Load(_))));
    }
}
