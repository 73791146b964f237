use displaydoc::Display;
use serde::Deserialize;
use thiserror::Error;

use super::provider::{self, Provider};

const LISTEN_ADDR_VAR: &str = "SCHEDULER_LISTEN_ADDR";
const LISTEN_ADDR_ENTRY: &str = "server.listen_addr";
const DATABASE_URL_VAR: &str = "DATABASE_URL";
const DATABASE_URL_ENTRY: &str = "server.database_url";
const REFRESH_INTERVAL_VAR: &str = "SCHEDULER_REFRESH_INTERVAL";
const REFRESH_INTERVAL_ENTRY: &str = "server.refresh_interval_secs";

#[derive(Debug, Display, Error)]
pub enum Error {
    /// Failed to read {DATABASE_URL_ENTRY:?}: {0}
    DatabaseUrl(provider::Error),
}

/// Process-level options: where to listen, how to reach the inventory
/// database, and how often to refresh the host-state cache from it.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub listen_addr: String,
    pub database_url: String,
    pub refresh_interval_secs: u64,
}

impl TryFrom<&Provider> for Config {
    type Error = Error;

    fn try_from(provider: &Provider) -> Result<Self, Self::Error> {
        Ok(Config {
            listen_addr: provider
                .read(LISTEN_ADDR_VAR, LISTEN_ADDR_ENTRY)
                .unwrap_or_else(|_| "0.0.0.0:9095".to_string()),
            database_url: provider
                .read(DATABASE_URL_VAR, DATABASE_URL_ENTRY)
                .map_err(Error::DatabaseUrl)?,
            refresh_interval_secs: provider
                .read(REFRESH_INTERVAL_VAR, REFRESH_INTERVAL_ENTRY)
                .unwrap_or(10),
        })
    }
}
