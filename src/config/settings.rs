//! Process settings from the environment, optionally seeded from an env file.

use super::registry::DEFAULT_MAX_BODY_BYTES;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const MEMORY_URL: &str = "memory://";

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Postgres URL, or `memory://` for the in-memory store.
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    /// Models to mount by name; `None` mounts the whole catalog.
    pub models: Option<Vec<String>>,
    pub max_body_bytes: usize,
    /// Env file that was loaded, if one existed.
    pub env_file: Option<PathBuf>,
}

impl Settings {
    /// Load `ENV_FILE` (default `.env`) over the process environment, then read settings.
    /// A missing env file is not an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = PathBuf::from(std::env::var("ENV_FILE").unwrap_or_else(|_| ".env".into()));
        let env_file = match dotenvy::from_path_override(&path) {
            Ok(()) => Some(path),
            Err(e) if e.not_found() => None,
            Err(e) => return Err(ConfigError::Load(format!("{}: {}", path.display(), e))),
        };
        Ok(Settings {
            env_file,
            ..Self::from_lookup(|key| std::env::var(key).ok())?
        })
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| MEMORY_URL.to_string());
        let models = lookup("MODELS").and_then(|raw| {
            let names: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
            (!names.is_empty()).then_some(names)
        });
        Ok(Settings {
            database_url,
            max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            bind_addr: parse(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            models,
            max_body_bytes: parse(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
            env_file: None,
        })
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with(MEMORY_URL)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidSetting {
            key,
            message: format!("'{}': {}", raw, e),
        }),
        _ => Ok(default),
    }
}
