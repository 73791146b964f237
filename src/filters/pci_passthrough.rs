use async_trait::async_trait;

use super::{Filter, FilterContext};
use crate::models::{FilterProperties, HostState};

/// Defers entirely to `PciDeviceStats::support_requests` — a host with no
/// PCI requests attached always passes, one with requests but no
/// `pci_stats` reported never does. Grounded in `pci_passthrough_filter.py`.
pub struct PciPassthrough;

#[async_trait]
impl Filter for PciPassthrough {
    fn name(&self) -> &'static str {
        "PciPassthrough"
    }

    async fn host_passes(
        &self,
        host: &mut HostState,
        props: &FilterProperties,
        _ctx: &FilterContext<'_>,
    ) -> bool {
        if props.pci_requests.is_empty() {
            return true;
        }
        match &host.pci_stats {
            Some(stats) => stats.support_requests(&props.pci_requests),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::models::{AggregateMetadata, PciDeviceSpec, PciDeviceStats, PciRequest};

    fn ctx(aggregates: &AggregateMetadata) -> FilterContext<'_> {
        FilterContext {
            aggregates,
            is_up: &|_| true,
        }
    }

    fn host_with_pools(pools: HashMap<(String, String), u32>) -> HostState {
        let mut host = HostState::new("h1".into(), "n1".into());
        host.pci_stats = Some(PciDeviceStats::from_pools(pools));
        host
    }

    #[tokio::test]
    async fn no_requests_trivially_passes() {
        let mut host = HostState::new("h1".into(), "n1".into());
        let props = super::super::tests_support::empty_props();
        let aggregates = AggregateMetadata::default();
        assert!(PciPassthrough.host_passes(&mut host, &props, &ctx(&aggregates)).await);
    }

    #[tokio::test]
    async fn missing_pci_stats_fails_with_requests() {
        let mut host = HostState::new("h1".into(), "n1".into());
        let mut props = super::super::tests_support::empty_props();
        props.pci_requests = vec![PciRequest {
            count: 1,
            spec: vec![PciDeviceSpec {
                vendor_id: Some("8086".into()),
                product_id: Some("1520".into()),
            }],
        }];
        let aggregates = AggregateMetadata::default();
        assert!(!PciPassthrough.host_passes(&mut host, &props, &ctx(&aggregates)).await);
    }

    #[tokio::test]
    async fn sufficient_pool_passes() {
        let mut pools = HashMap::new();
        pools.insert(("8086".to_string(), "1520".to_string()), 2u32);
        let mut host = host_with_pools(pools);
        let mut props = super::super::tests_support::empty_props();
        props.pci_requests = vec![PciRequest {
            count: 2,
            spec: vec![PciDeviceSpec {
                vendor_id: Some("8086".into()),
                product_id: Some("1520".into()),
            }],
        }];
        let aggregates = AggregateMetadata::default();
        assert!(PciPassthrough.host_passes(&mut host, &props, &ctx(&aggregates)).await);
    }

    #[tokio::test]
    async fn insufficient_pool_fails() {
        let mut pools = HashMap::new();
        pools.insert(("8086".to_string(), "1520".to_string()), 1u32);
        let mut host = host_with_pools(pools);
        let mut props = super::super::tests_support::empty_props();
        props.pci_requests = vec![PciRequest {
            count: 2,
            spec: vec![PciDeviceSpec {
                vendor_id: Some("8086".into()),
                product_id: Some("1520".into()),
            }],
        }];
        let aggregates = AggregateMetadata::default();
        assert!(!PciPassthrough.host_passes(&mut host, &props, &ctx(&aggregates)).await);
    }
}
