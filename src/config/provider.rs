//! Shared env-var-with-config-fallback lookup, used by every config section
//! so each one only has to name its two sources (an explicit env var and a
//! dotted config-file entry) rather than re-implement the lookup.

use displaydoc::Display;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Display, Error)]
pub enum Error {
    /// neither env var {0:?} nor config entry {1:?} is set
    Missing(String, String),
    /// value for {0:?} could not be parsed: {1}
    Parse(String, String),
}

/// Wraps a loaded `config::Config` and resolves a setting by trying an
/// explicit environment variable first, then a dotted entry in the config
/// file.
pub struct Provider {
    inner: config::Config,
}

impl Provider {
    pub fn new(inner: config::Config) -> Self {
        Self { inner }
    }

    /// Reads `env_var`, falling back to `entry` in the config file. The raw
    /// string (from either source) is parsed as `T` via `T`'s `Deserialize`
    /// impl, so callers can read anything from `String` to structured types.
    pub fn read<T: DeserializeOwned>(&self, env_var: &str, entry: &str) -> Result<T, Error> {
        if let Ok(raw) = std::env::var(env_var) {
            return parse_str(&raw).map_err(|e| Error::Parse(env_var.to_string(), e));
        }
        self.inner
            .get::<T>(entry)
            .map_err(|_| Error::Missing(env_var.to_string(), entry.to_string()))
    }
}

fn parse_str<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    // Accept bare scalars (`16.0`, `"a,b"`) as well as JSON-ish values so
    // that a single string env var can feed a float, a list, or a struct.
    serde_json::from_str(raw)
        .or_else(|_| serde_json::from_str(&format!("{raw:?}")))
        .map_err(|e| e.to_string())
}
