use async_trait::async_trait;

use super::{Filter, FilterContext};
use crate::models::{FilterProperties, HostState};

/// `total_usable_ram_mb * ram_allocation_ratio - ram_used ≥ requested
/// memory_mb`, with `ram_allocation_ratio` taken per-aggregate when the
/// host belongs to one that overrides it, else the configured global
/// default — `ram_filter.py`'s `RamFilter`/`AggregateRamFilter`. Records
/// the computed usable-RAM limit on the host under `limits["memory_mb"]`.
pub struct Ram {
    pub default_ratio: f64,
}

const AGGREGATE_RATIO_KEY: &str = "ram_allocation_ratio";

#[async_trait]
impl Filter for Ram {
    fn name(&self) -> &'static str {
        "Ram"
    }

    async fn host_passes(
        &self,
        host: &mut HostState,
        props: &FilterProperties,
        ctx: &FilterContext<'_>,
    ) -> bool {
        if host.total_usable_ram_mb == 0 {
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

        let usable_ram = host.total_usable_ram_mb as f64 * ratio;
        host.limits.insert("memory_mb".to_string(), usable_ram);

        let ram_used = host.total_usable_ram_mb.saturating_sub(host.free_ram_mb) as i64;
        let available = usable_ram as i64 - ram_used;
        available >= props.instance_type.memory_mb as i64
    }
}
