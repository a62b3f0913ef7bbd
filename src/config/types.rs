use serde::{Deserialize, Serialize};

use super::defaults;
use super::logging::LoggingConfig;
use super::sessions::SessionEntry;

/// Root configuration, loaded from JSON with code defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    /// Sessions seeding the in-memory token validator.
    pub sessions: Vec<SessionEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            logging: LoggingConfig::default(),
            security: SecurityConfig::default(),
            sessions: Vec::new(),
        }
    }
}

/// Transport-adjacent settings. TLS is terminated upstream; only CORS
/// lives here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// `"*"` for permissive CORS, otherwise a comma-separated origin list.
    pub cors_origins: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: defaults::cors_origins(),
        }
    }
}
