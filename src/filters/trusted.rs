use std::sync::Arc;

use async_trait::async_trait;

use super::{Filter, FilterContext};
use crate::attestation::{AttestationCache, TrustLevel};
use crate::models::{FilterProperties, HostState};

const TRUST_SPEC_KEY: &str = "trust:trusted_host";

/// Consults the attestation cache only when the flavor requests a trust
/// level via `extra_specs["trust:trusted_host"]`; a flavor that doesn't
/// care passes every host — `trusted_filter.py`'s `TrustedFilter`.
///
/// Deliberately excluded from `run_filter_once_per_request`: the
/// attestation cache refreshes on its own schedule, and a request that
/// spans a refresh should see the latest trust level on every slot rather
/// than the value captured before the first instance was placed.
pub struct Trusted {
    cache: Arc<AttestationCache>,
}

impl Trusted {
    pub fn new(cache: Arc<AttestationCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl Filter for Trusted {
    fn name(&self) -> &'static str {
        "Trusted"
    }

    async fn host_passes(
        &self,
        host: &mut HostState,
        props: &FilterProperties,
        _ctx: &FilterContext<'_>,
    ) -> bool {
        let Some(requested) = props.instance_type.extra_specs.get(TRUST_SPEC_KEY) else {
            return true;
        };
        let requested = TrustLevel::from_wire(requested);
        self.cache.trust_level(&host.host).await == requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::AttestationResult;
    use crate::models::AggregateMetadata;

    struct FakeClient {
        response: Vec<AttestationResult>,
    }

    #[async_trait]
    impl crate::attestation::AttestationClient for FakeClient {
        async fn attest(&self, _hosts: &[String]) -> anyhow::Result<Vec<AttestationResult>> {
            Ok(self.response.clone())
        }
    }

    fn ctx() -> FilterContext<'static> {
        FilterContext {
            aggregates: Box::leak(Box::new(AggregateMetadata::default())),
            is_up: &|_| true,
        }
    }

    #[tokio::test]
    async fn flavor_without_trust_spec_passes_any_host() {
        let cache = Arc::new(AttestationCache::new(
            Arc::new(FakeClient { response: vec![] }),
            300,
        ));
        let trusted = Trusted::new(cache);
        let mut host = HostState::new("h1".into(), "n1".into());
        let props = super::super::tests_support::empty_props();
        assert!(trusted.host_passes(&mut host, &props, &ctx()).await);
    }

    #[tokio::test]
    async fn requesting_trusted_requires_attested_host() {
        let cache = Arc::new(AttestationCache::new(
            Arc::new(FakeClient {
                response: vec![AttestationResult {
                    host_name: "h1".into(),
                    trust_lvl: "trusted".into(),
                    vtime: Some(chrono::Utc::now().to_rfc3339()),
                }],
            }),
            300,
        ));
        let trusted = Trusted::new(cache);
        let mut host = HostState::new("h1".into(), "n1".into());
        let mut props = super::super::tests_support::empty_props();
        Arc::get_mut(&mut props.instance_type)
            .unwrap()
            .extra_specs
            .insert(TRUST_SPEC_KEY.to_string(), "trusted".to_string());
        assert!(trusted.host_passes(&mut host, &props, &ctx()).await);
    }

    #[tokio::test]
    async fn requesting_trusted_rejects_untrusted_host() {
        let cache = Arc::new(AttestationCache::new(
            Arc::new(FakeClient {
                response: vec![AttestationResult {
                    host_name: "h1".into(),
                    trust_lvl: "untrusted".into(),
                    vtime: Some(chrono::Utc::now().to_rfc3339()),
                }],
            }),
            300,
        ));
        let trusted = Trusted::new(cache);
        let mut host = HostState::new("h1".into(), "n1".into());
        let mut props = super::super::tests_support::empty_props();
        Arc::get_mut(&mut props.instance_type)
            .unwrap()
            .extra_specs
            .insert(TRUST_SPEC_KEY.to_string(), "trusted".to_string());
        assert!(!trusted.host_passes(&mut host, &props, &ctx()).await);
    }

    #[tokio::test]
    async fn requesting_unknown_level_requires_an_actual_unknown_verdict() {
        let cache = Arc::new(AttestationCache::new(
            Arc::new(FakeClient {
                response: vec![AttestationResult {
                    host_name: "h1".into(),
                    trust_lvl: "trusted".into(),
                    vtime: Some(chrono::Utc::now().to_rfc3339()),
                }],
            }),
            300,
        ));
        let trusted = Trusted::new(cache);
        let mut host = HostState::new("h1".into(), "n1".into());
        let mut props = super::super::tests_support::empty_props();
        Arc::get_mut(&mut props.instance_type)
            .unwrap()
            .extra_specs
            .insert(TRUST_SPEC_KEY.to_string(), "unknown".to_string());
        assert!(!trusted.host_passes(&mut host, &props, &ctx()).await);
    }
}
