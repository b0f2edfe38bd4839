use std::path::Path;

use serde::Deserialize;
use tracing::debug;

/// Tracker configuration. Loaded from environment variables with the prefix
/// `WEBTRACK__` and, optionally, a TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    /// Cookie holding the anonymous session identifier.
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Path attribute used when the session cookie is written.
    #[serde(default = "default_cookie_path")]
    pub cookie_path: String,
    /// Write the first identifier token back onto nodes whose `id` attribute
    /// holds several whitespace-separated values.
    #[serde(default = "default_normalize_identifiers")]
    pub normalize_identifiers: bool,
}

// Default functions
fn default_cookie_name() -> String {
    "common_web_guid".to_string()
}
fn default_cookie_path() -> String {
    "/".to_string()
}
fn default_normalize_identifiers() -> bool {
    true
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            cookie_path: default_cookie_path(),
            normalize_identifiers: default_normalize_identifiers(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_layered(None)
    }

    /// Load configuration from a file, with environment variables layered on top.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        Self::load_layered(Some(path.as_ref()))
    }

    fn load_layered(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "reading config file");
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("WEBTRACK")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
