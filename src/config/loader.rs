use std::path::Path;

use super::types::Config;

/// Environment variable naming an alternate config file path.
pub const CONFIG_PATH_ENV: &str = "GREENROOM_CONFIG";

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Load configuration: explicit env-var path, then `config.json` in the
/// working directory, then code defaults. A present-but-broken file is
/// reported and the defaults are used, matching the fail-open behavior of
/// a development server.
pub fn load() -> Config {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_from_path(Path::new(&path))
}

fn load_from_path(path: &Path) -> Config {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file found, using defaults");
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str::<Config>(&raw) {
            Ok(config) => config,
            Err(err) => {
                eprintln!(
                    "Failed to parse config file '{}': {err}; using defaults",
                    path.display()
                );
                Config::default()
            }
        },
        Err(err) => {
            eprintln!(
                "Failed to read config file '{}': {err}; using defaults",
                path.display()
            );
            Config::default()
        }
    }
}

/// Validate a loaded configuration. Returns a combined error message
/// listing every problem found.
pub fn validate(config: &Config) -> Result<(), String> {
    let mut problems = Vec::new();

    if config.port == 0 {
        problems.push("port must be non-zero".to_string());
    }

    match config.logging.rotation.to_lowercase().as_str() {
        "daily" | "hourly" | "never" => {}
        other => problems.push(format!(
            "logging.rotation must be daily, hourly, or never (got '{other}')"
        )),
    }

    for (idx, entry) in config.sessions.iter().enumerate() {
        if entry.token.is_empty() {
            problems.push(format!("sessions[{idx}].token is empty"));
        }
        if entry.user_id.is_empty() {
            problems.push(format!("sessions[{idx}].user_id is empty"));
        }
    }

    let mut seen = std::collections::HashSet::new();
    for entry in &config.sessions {
        if !entry.token.is_empty() && !seen.insert(&entry.token) {
            problems.push(format!(
                "duplicate session token for user '{}'",
                entry.user_id
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(problems.join("\n"))
    }
}
