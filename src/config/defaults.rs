//! Default values for configuration fields, kept in one place so the
//! serde `default` attributes and `Default` impls cannot drift apart.

pub fn port() -> u16 {
    3545
}

pub fn cors_origins() -> String {
    "*".to_string()
}

pub fn log_dir() -> String {
    "logs".to_string()
}

pub fn log_filename() -> String {
    "server.log".to_string()
}

pub fn log_rotation() -> String {
    "daily".to_string()
}
