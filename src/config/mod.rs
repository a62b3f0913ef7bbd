//! Configuration: JSON file with code defaults.
//!
//! The heartbeat cadence and all engine limits are protocol constants, not
//! configuration — see [`crate::protocol::types`] and [`crate::hub`].

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod sessions;
pub mod types;

pub use loader::{load, validate, CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};
pub use logging::{LogFormat, LogLevel, LoggingConfig};
pub use sessions::SessionEntry;
pub use types::{Config, SecurityConfig};
