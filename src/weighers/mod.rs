//! The weigher chain: scores surviving hosts and orders them by
//! preference, spec.md §4.4.

mod affinity_spread;
mod resource;

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{FilterProperties, HostState};

pub use affinity_spread::AffinitySpreadWeigher;
pub use resource::ResourceWeigher;

/// Produces one raw score per host in `hosts`, same order, higher is more
/// preferred. Raw scores are min-max normalized by `WeigherChain` before
/// being summed, so a weigher's own scale doesn't matter.
pub trait Weigher: Send + Sync {
    fn name(&self) -> &'static str;
    fn weigh_objects(&self, hosts: &[HostState], props: &FilterProperties) -> Vec<f64>;
}

pub struct WeighedHost {
    pub host: HostState,
    pub weight: f64,
}

struct WeightedEntry {
    weigher: Arc<dyn Weigher>,
    multiplier: f64,
}

pub struct WeigherChain {
    entries: Vec<WeightedEntry>,
}

pub struct WeigherRegistry {
    weighers: HashMap<&'static str, Arc<dyn Weigher>>,
}

impl WeigherRegistry {
    pub fn standard() -> Self {
        let all: Vec<Arc<dyn Weigher>> = vec![
            Arc::new(ResourceWeigher::default()),
            Arc::new(AffinitySpreadWeigher),
        ];
        let weighers = all.into_iter().map(|w| (w.name(), w)).collect();
        Self { weighers }
    }

    /// Resolves `names` against the registry, defaulting every weigher's
    /// multiplier to `1.0`. Unknown names are dropped with a warning rather
    /// than failing the request — weighing is a preference, not a hard
    /// requirement, so a misconfigured weight class shouldn't take the
    /// scheduler down.
    pub fn resolve(&self, names: &[String]) -> WeigherChain {
        let entries = names
            .iter()
            .filter_map(|name| match self.weighers.get(name.as_str()) {
                Some(weigher) => Some(WeightedEntry {
                    weigher: weigher.clone(),
                    multiplier: 1.0,
                }),
                None => {
                    tracing::warn!(weigher = %name, "unknown weight class, skipping");
                    None
                }
            })
            .collect();
        WeigherChain { entries }
    }
}

/// Normalizes a raw score vector to `[0, 1]`. All-equal inputs (including a
/// single host) normalize to all-zero rather than `NaN`, matching
/// `nova.weights.normalize`'s handling of a zero-width range.
fn normalize(raw: &[f64]) -> Vec<f64> {
    let min = raw.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = raw.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range == 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.iter().map(|v| (v - min) / range).collect()
}

impl WeigherChain {
    /// Weighs and sorts `hosts` descending by combined score, with stable
    /// ties broken by input order (`HostManager.get_weighed_hosts`).
    pub fn weigh_hosts(&self, hosts: Vec<HostState>, props: &FilterProperties) -> Vec<WeighedHost> {
        let mut totals = vec![0.0; hosts.len()];
        for entry in &self.entries {
            let raw = entry.weigher.weigh_objects(&hosts, props);
            let normalized = normalize(&raw);
            for (total, score) in totals.iter_mut().zip(normalized) {
                *total += score * entry.multiplier;
            }
        }

        let mut weighed: Vec<WeighedHost> = hosts
            .into_iter()
            .zip(totals)
            .map(|(host, weight)| WeighedHost { host, weight })
            .collect();
        weighed.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
        weighed
    }
}
