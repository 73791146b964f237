use async_trait::async_trait;

use super::{Filter, FilterContext};
use crate::models::{FilterProperties, HostState};

/// `vcpus_total * cpu_allocation_ratio - vcpus_used >= requested vcpus`,
/// with `cpu_allocation_ratio` taken per-aggregate when the host belongs to
/// one that overrides it, else the configured global default —
/// `core_filter.py`'s `CoreFilter`/`AggregateCoreFilter`. Records the
/// computed usable-vcpu limit on the host under `limits["vcpu"]`.
pub struct Cores {
    pub default_ratio: f64,
}

const AGGREGATE_RATIO_KEY: &str = "cpu_allocation_ratio";

#[async_trait]
impl Filter for Cores {
    fn name(&self) -> &'static str {
        "Cores"
    }

    async fn host_passes(
        &self,
        host: &mut HostState,
        props: &FilterProperties,
        ctx: &FilterContext<'_>,
    ) -> bool {
        if host.vcpus_total == 0 {
            // Unlimited/unknown capacity hosts (e.g. shared/ironic style
            // nodes) are never core-constrained.
            return true;
        }

        let ratio = ctx
            .aggregates
            .values_for(&host.host, AGGREGATE_RATIO_KEY)
            .iter()
            .filter_map(|v| v.parse::<f64>().ok())
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |acc| acc.min(v)))
            })
            .unwrap_or(self.default_ratio);

        let usable_vcpus = host.vcpus_total as f64 * ratio;
        host.limits.insert("vcpu".to_string(), usable_vcpus);

        let available = usable_vcpus as i64 - host.vcpus_used as i64;
        available >= props.instance_type.vcpus as i64
    }
}
