//! Project-wide constants.

use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The only authorization scheme the gate accepts.
pub const BEARER_SCHEME: &str = "Bearer";

/// Env var holding the remote auth authority base URL.
pub const AUTH_URL_ENV: &str = "TASKGATE_AUTH_URL";

/// Env var holding static `token=subject` pairs, comma-separated.
pub const TOKENS_ENV: &str = "TASKGATE_TOKENS";

/// Default database path: `~/.taskgate/taskgate.db`.
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .expect("cannot determine home directory")
        .join(".taskgate")
        .join("taskgate.db")
}
