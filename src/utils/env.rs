// src/utils/env.rs

use log::{info, warn};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Loads the first `.env` file found near the working directory. Variables
/// already present in the process environment win.
pub fn load_env() {
    let env_paths = [".env", ".env.local", "../.env"];
    for path in env_paths.iter() {
        if Path::new(path).exists() {
            match dotenv::from_path(path) {
                Ok(()) => {
                    info!("Loaded environment variables from {}", path);
                    return;
                }
                Err(e) => warn!("Failed to load environment from {}: {}", path, e),
            }
        }
    }
    info!("No .env file found, using environment variables from system");
}

/// Reads and parses an environment variable, falling back to `default` when
/// it is unset or malformed.
pub fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Ignoring unparsable value '{}' for {}", raw, key);
            default
        }),
        Err(_) => default,
    }
}

/// Reads an environment variable, treating blank values as unset.
pub fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
