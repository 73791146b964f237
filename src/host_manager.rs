//! Owns the scheduler's live view of the cluster: the host-state cache,
//! per-service liveness bookkeeping, and the filter/weigher chains run over
//! them. Grounded in `host_manager.py`'s `HostManager`, with the
//! `Arc<RwLock<HashMap<..>>>` read-mostly idiom from the blockmatrix
//! scheduler reference.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::scheduler::Config as SchedulerConfig;
use crate::error::{Result, SchedulerError};
use crate::filters::{FilterContext, FilterRegistry};
use crate::inventory::InventoryStore;
use crate::liveness::LivenessOracle;
use crate::models::{AggregateMetadata, FilterProperties, HostState};
use crate::weighers::{WeighedHost, WeigherRegistry};

type HostKey = (String, String);

pub struct HostManager {
    inventory: Arc<dyn InventoryStore>,
    liveness: Arc<dyn LivenessOracle>,
    scheduler_config: SchedulerConfig,
    filter_registry: FilterRegistry,
    weigher_registry: WeigherRegistry,

    host_states: RwLock<HashMap<HostKey, HostState>>,
    aggregates: RwLock<AggregateMetadata>,
}

impl HostManager {
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        liveness: Arc<dyn LivenessOracle>,
        scheduler_config: SchedulerConfig,
        filter_registry: FilterRegistry,
        weigher_registry: WeigherRegistry,
    ) -> Self {
        Self {
            inventory,
            liveness,
            scheduler_config,
            filter_registry,
            weigher_registry,
            host_states: RwLock::new(HashMap::new()),
            aggregates: RwLock::new(AggregateMetadata::default()),
        }
    }

    /// Pulls the latest compute-node and service rows from the inventory
    /// store and folds them into the cache: upserts hosts seen this round,
    /// evicts `(host, node)` keys that weren't — `host_manager.py`'s
    /// `get_all_host_states`, run periodically by the caller rather than
    /// per-request.
    pub async fn refresh(&self) -> Result<()> {
        let nodes = self
            .inventory
            .compute_nodes()
            .await
            .map_err(SchedulerError::InventoryUnavailable)?;
        let services = self
            .inventory
            .services("compute")
            .await
            .map_err(SchedulerError::InventoryUnavailable)?;
        let aggregates = self
            .inventory
            .aggregate_metadata()
            .await
            .map_err(SchedulerError::InventoryUnavailable)?;

        let services_by_host: HashMap<_, _> =
            services.into_iter().map(|s| (s.host.clone(), s)).collect();

        let mut states = self.host_states.write().await;
        let mut seen = std::collections::HashSet::new();
        for node in nodes {
            let key = (node.host.clone(), node.hypervisor_hostname.clone());
            let entry = states
                .entry(key.clone())
                .or_insert_with(|| HostState::new(node.host.clone(), node.hypervisor_hostname.clone()));
            if let Some(service) = services_by_host.get(&node.host).cloned() {
                entry.update_service(service);
            }
            entry.update_from_compute_node(node);
            seen.insert(key);
        }
        states.retain(|key, _| seen.contains(key));

        *self.aggregates.write().await = aggregates;

        tracing::debug!(hosts = states.len(), "host state cache refreshed");
        Ok(())
    }

    /// A read-locked clone of every cached host, in cache iteration order.
    pub async fn get_all_host_states(&self) -> Vec<HostState> {
        self.host_states.read().await.values().cloned().collect()
    }

    /// Applies `ignore_hosts`/`force_hosts`/`force_nodes` and then, unless a
    /// forced selection already narrowed the pool to a non-empty set, runs
    /// the resolved filter chain. `host_manager.py`'s `get_filtered_hosts`:
    /// forced hosts bypass the filter chain entirely so an operator's
    /// explicit placement can't be second-guessed by a filter.
    pub async fn get_filtered_hosts(&self, props: &FilterProperties) -> Result<Vec<HostState>> {
        let all = self.get_all_host_states().await;

        let mut candidates: Vec<HostState> = all
            .into_iter()
            .filter(|h| !props.ignore_hosts.contains(&h.host))
            .collect();

        if !props.force_hosts.is_empty() {
            candidates.retain(|h| props.force_hosts.contains(&h.host));
        }
        if !props.force_nodes.is_empty() {
            candidates.retain(|h| props.force_nodes.contains(&h.nodename));
        }
        if props.is_forced() && !candidates.is_empty() {
            return Ok(candidates);
        }

        let names = props
            .filter_class_names
            .clone()
            .unwrap_or_else(|| self.scheduler_config.default_filters.clone());
        let chain = self.filter_registry.resolve(&names)?;

        let aggregates = self.aggregates.read().await;
        let liveness = &self.liveness;
        let is_up = |host: &HostState| liveness.is_up(host.service.as_ref().and_then(|s| s.updated_at));
        let ctx = FilterContext {
            aggregates: &aggregates,
            is_up: &is_up,
        };

        let mut passed = Vec::with_capacity(candidates.len());
        for mut host in candidates {
            if chain.host_passes(&mut host, props, &ctx).await {
                passed.push(host);
            }
        }

        if passed.is_empty() {
            return Err(SchedulerError::NoValidHost);
        }
        Ok(passed)
    }

    /// Weighs and descending-sorts `hosts` using the configured weight
    /// classes.
    pub fn get_weighed_hosts(&self, hosts: Vec<HostState>, props: &FilterProperties) -> Vec<WeighedHost> {
        let chain = self.weigher_registry.resolve(&self.scheduler_config.weight_classes);
        chain.weigh_hosts(hosts, props)
    }
}
