use displaydoc::Display;
use serde::Deserialize;
use thiserror::Error;

use super::provider::{self, Provider};

const ATTESTATION_SERVER_VAR: &str = "ATTESTATION_SERVER";
const ATTESTATION_SERVER_ENTRY: &str = "trusted_computing.attestation_server";
const ATTESTATION_PORT_VAR: &str = "ATTESTATION_PORT";
const ATTESTATION_PORT_ENTRY: &str = "trusted_computing.attestation_port";
const ATTESTATION_API_URL_VAR: &str = "ATTESTATION_API_URL";
const ATTESTATION_API_URL_ENTRY: &str = "trusted_computing.attestation_api_url";
const ATTESTATION_CA_FILE_VAR: &str = "ATTESTATION_SERVER_CA_FILE";
const ATTESTATION_CA_FILE_ENTRY: &str = "trusted_computing.attestation_server_ca_file";
const ATTESTATION_AUTH_BLOB_VAR: &str = "ATTESTATION_AUTH_BLOB";
const ATTESTATION_AUTH_BLOB_ENTRY: &str = "trusted_computing.attestation_auth_blob";
const ATTESTATION_AUTH_TIMEOUT_VAR: &str = "ATTESTATION_AUTH_TIMEOUT";
const ATTESTATION_AUTH_TIMEOUT_ENTRY: &str = "trusted_computing.attestation_auth_timeout";

#[derive(Debug, Display, Error)]
pub enum Error {
    /// {ATTESTATION_SERVER_ENTRY:?} not present: {0}
    MissingServer(provider::Error),
    /// Failed to parse {ATTESTATION_PORT_ENTRY:?}: {0}
    ParsePort(provider::Error),
    /// Failed to parse {ATTESTATION_API_URL_ENTRY:?}: {0}
    ParseApiUrl(provider::Error),
    /// Failed to parse {ATTESTATION_AUTH_TIMEOUT_ENTRY:?}: {0}
    ParseAuthTimeout(provider::Error),
}

/// The `trusted_computing` block from spec.md §6, consulted by the
/// attestation cache and its HTTP client.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub attestation_server: String,
    pub attestation_port: u16,
    pub attestation_api_url: String,
    pub attestation_server_ca_file: Option<String>,
    pub attestation_auth_blob: Option<String>,
    pub attestation_auth_timeout_secs: u64,
}

impl TryFrom<&Provider> for Config {
    type Error = Error;

    fn try_from(provider: &Provider) -> Result<Self, Self::Error> {
        Ok(Config {
            attestation_server: provider
                .read(ATTESTATION_SERVER_VAR, ATTESTATION_SERVER_ENTRY)
                .map_err(Error::MissingServer)?,
            attestation_port: provider
                .read(ATTESTATION_PORT_VAR, ATTESTATION_PORT_ENTRY)
                .unwrap_or(8443),
            attestation_api_url: provider
                .read(ATTESTATION_API_URL_VAR, ATTESTATION_API_URL_ENTRY)
                .map_err(Error::ParseApiUrl)?,
            attestation_server_ca_file: provider
                .read(ATTESTATION_CA_FILE_VAR, ATTESTATION_CA_FILE_ENTRY)
                .ok(),
            attestation_auth_blob: provider
                .read(ATTESTATION_AUTH_BLOB_VAR, ATTESTATION_AUTH_BLOB_ENTRY)
                .ok(),
            attestation_auth_timeout_secs: provider
                .read(ATTESTATION_AUTH_TIMEOUT_VAR, ATTESTATION_AUTH_TIMEOUT_ENTRY)
                .map_err(Error::ParseAuthTimeout)?,
        })
    }
}
