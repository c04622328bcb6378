//! Server configuration from the environment

use crate::floor::SessionDefaults;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Everything read from the environment at startup
#[derive(Debug, Clone)]
pub struct FloorConfig {
    pub db_path: PathBuf,
    pub port: u16,
    /// Bearer token for administrative routes; `None` leaves them open
    pub admin_token: Option<String>,
    pub session_defaults: SessionDefaults,
    pub busy_timeout: Duration,
}

impl FloorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable numbers fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let db_path = lookup("FLOOR_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.debate-floor/floor.db"))
            },
            PathBuf::from,
        );

        let port = lookup("FLOOR_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let busy_timeout_ms = lookup("FLOOR_BUSY_TIMEOUT_MS")
            .and_then(|ms| ms.parse().ok())
            .unwrap_or(DEFAULT_BUSY_TIMEOUT_MS);

        let mut session_defaults = SessionDefaults::default();
        if let Some(topic) =
            lookup("FLOOR_DEFAULT_SESSION_TOPIC").filter(|t| !t.trim().is_empty())
        {
            session_defaults.topic = topic;
        }

        Self {
            db_path,
            port,
            admin_token: lookup("FLOOR_ADMIN_TOKEN").filter(|t| !t.is_empty()),
            session_defaults,
            busy_timeout: Duration::from_millis(busy_timeout_ms),
        }
    }
}
