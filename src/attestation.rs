//! Trust-level cache for the `Trusted`/`AggregateTrusted` filters, spec.md
//! §4.5. Grounded in `trusted_filter.py`'s `ComputeAttestationCache`: trust
//! levels are looked up from a remote attestation service and cached with
//! an expiry (`vtime`) the service itself hands back, not a locally chosen
//! TTL — the cache just decides when an entry is stale enough to re-ask.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::config::trust::Config as TrustConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustLevel {
    Trusted,
    Untrusted,
    Unknown,
}

impl TrustLevel {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "trusted" => TrustLevel::Trusted,
            "untrusted" => TrustLevel::Untrusted,
            _ => TrustLevel::Unknown,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct AttestationResult {
    pub host_name: String,
    pub trust_lvl: String,
    /// ISO-8601 validity timestamp the attestation server assigns; a
    /// missing or unparseable value collapses the entry to `Unknown` with
    /// `vtime = now`, so it's re-checked on the very next lookup rather
    /// than cached as if it were fresh.
    pub vtime: Option<String>,
}

#[async_trait]
pub trait AttestationClient: Send + Sync {
    async fn attest(&self, hosts: &[String]) -> anyhow::Result<Vec<AttestationResult>>;
}

/// `reqwest`-based client for the external attestation service, grounded
/// in the HTTP-client-as-a-trait pattern `LNVPS-api` uses for its external
/// API adapters.
pub struct HttpAttestationClient {
    http: reqwest::Client,
    api_url: String,
    auth_blob: Option<String>,
}

impl HttpAttestationClient {
    pub fn new(config: &TrustConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(
                config.attestation_auth_timeout_secs,
            ))
            .build()?;
        Ok(Self {
            http,
            api_url: config.attestation_api_url.clone(),
            auth_blob: config.attestation_auth_blob.clone(),
        })
    }
}

#[derive(serde::Serialize)]
struct AttestRequest<'a> {
    hosts: &'a [String],
}

#[derive(serde::Deserialize)]
struct AttestResponse {
    hosts: Vec<AttestationResult>,
}

#[async_trait]
impl AttestationClient for HttpAttestationClient {
    async fn attest(&self, hosts: &[String]) -> anyhow::Result<Vec<AttestationResult>> {
        let mut req = self.http.post(&self.api_url).json(&AttestRequest { hosts });
        if let Some(blob) = &self.auth_blob {
            req = req.bearer_auth(blob);
        }
        let resp: AttestResponse = req.send().await?.error_for_status()?.json().await?;
        Ok(resp.hosts)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    trust_lvl: TrustLevel,
    vtime: DateTime<Utc>,
}

/// Per-host trust levels, refreshed as a batch whenever any consulted host
/// is missing or stale. A single `tokio::sync::Mutex` guards the whole map
/// since nearly every access may need to write-refresh it — unlike the
/// host-state map, there's no meaningful read-only fast path here.
pub struct AttestationCache {
    client: Arc<dyn AttestationClient>,
    auth_timeout: chrono::Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl AttestationCache {
    pub fn new(client: Arc<dyn AttestationClient>, auth_timeout_secs: u64) -> Self {
        Self {
            client,
            auth_timeout: chrono::Duration::seconds(auth_timeout_secs as i64),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the trust level for `host`, refreshing the cache first if
    /// this (or any other currently-stale) host needs it.
    pub async fn trust_level(&self, host: &str) -> TrustLevel {
        let mut entries = self.entries.lock().await;
        if Self::is_stale(&entries, host, self.auth_timeout) {
            self.refresh_locked(&mut entries, host).await;
        }
        entries
            .get(host)
            .map(|e| e.trust_lvl)
            .unwrap_or(TrustLevel::Unknown)
    }

    fn is_stale(
        entries: &HashMap<String, CacheEntry>,
        host: &str,
        auth_timeout: chrono::Duration,
    ) -> bool {
        match entries.get(host) {
            None => true,
            Some(entry) => Utc::now() - entry.vtime >= auth_timeout,
        }
    }

    /// Re-attests the full current key set, not just the stale entries:
    /// every entry is first reset to `Unknown`, then the whole key set is
    /// re-queried in one call, since the attestation service call is no
    /// cheaper for one host than for many — `ComputeAttestationCache.
    /// _update_cache`'s `_invalidate_caches()` + `do_attestation(keys())`.
    async fn refresh_locked(&self, entries: &mut HashMap<String, CacheEntry>, requested: &str) {
        let now = Utc::now();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        if !keys.iter().any(|h| h == requested) {
            keys.push(requested.to_string());
        }

        for host in &keys {
            entries.insert(
                host.clone(),
                CacheEntry {
                    trust_lvl: TrustLevel::Unknown,
                    vtime: now,
                },
            );
        }

        match self.client.attest(&keys).await {
            Ok(results) => {
                for result in results {
                    let (trust_lvl, vtime) = match result.vtime.as_deref().map(parse_vtime) {
                        Some(Some(vtime)) => (TrustLevel::from_wire(&result.trust_lvl), vtime),
                        _ => (TrustLevel::Unknown, now),
                    };
                    entries.insert(result.host_name, CacheEntry { trust_lvl, vtime });
                }
            }
            Err(e) => {
                tracing::warn!("attestation service unavailable: {e:#}");
            }
        }
    }
}

fn parse_vtime(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeClient {
        response: Vec<AttestationResult>,
    }

    #[async_trait]
    impl AttestationClient for FakeClient {
        async fn attest(&self, _hosts: &[String]) -> anyhow::Result<Vec<AttestationResult>> {
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn unknown_host_defaults_unknown_until_attested() {
        let client = Arc::new(FakeClient { response: vec![] });
        let cache = AttestationCache::new(client, 300);
        assert_eq!(cache.trust_level("host-a").await, TrustLevel::Unknown);
    }

    #[tokio::test]
    async fn trusted_response_is_cached() {
        let client = Arc::new(FakeClient {
            response: vec![AttestationResult {
                host_name: "host-a".into(),
                trust_lvl: "trusted".into(),
                vtime: Some(Utc::now().to_rfc3339()),
            }],
        });
        let cache = AttestationCache::new(client, 300);
        assert_eq!(cache.trust_level("host-a").await, TrustLevel::Trusted);
    }

    struct RecordingClient {
        response: Vec<AttestationResult>,
        seen: std::sync::Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl AttestationClient for RecordingClient {
        async fn attest(&self, hosts: &[String]) -> anyhow::Result<Vec<AttestationResult>> {
            self.seen.lock().unwrap().push(hosts.to_vec());
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn refresh_requeries_the_full_key_set_not_just_the_stale_host() {
        let client = Arc::new(RecordingClient {
            response: vec![
                AttestationResult {
                    host_name: "host-a".into(),
                    trust_lvl: "trusted".into(),
                    vtime: Some(Utc::now().to_rfc3339()),
                },
                AttestationResult {
                    host_name: "host-b".into(),
                    trust_lvl: "trusted".into(),
                    vtime: Some(Utc::now().to_rfc3339()),
                },
            ],
            seen: std::sync::Mutex::new(vec![]),
        });
        // auth_timeout=0 so every lookup is immediately stale.
        let cache = AttestationCache::new(client.clone(), 0);
        assert_eq!(cache.trust_level("host-a").await, TrustLevel::Trusted);
        assert_eq!(cache.trust_level("host-b").await, TrustLevel::Trusted);

        // host-b is now cached and fresh; a refresh for a new, unrelated
        // host-c must still re-query host-b alongside host-a and host-c.
        cache.trust_level("host-c").await;
        let seen = client.seen.lock().unwrap();
        let last = seen.last().unwrap();
        assert!(last.contains(&"host-a".to_string()));
        assert!(last.contains(&"host-b".to_string()));
        assert!(last.contains(&"host-c".to_string()));
    }

    #[tokio::test]
    async fn missing_vtime_collapses_to_unknown() {
        let client = Arc::new(FakeClient {
            response: vec![AttestationResult {
                host_name: "host-a".into(),
                trust_lvl: "trusted".into(),
                vtime: None,
            }],
        });
        let cache = AttestationCache::new(client, 300);
        assert_eq!(cache.trust_level("host-a").await, TrustLevel::Unknown);
    }
}
