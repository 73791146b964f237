//! `select_destinations`: the entry point that turns a `FilterProperties`
//! into a list of host placements, spec.md §4.7.

use std::collections::HashMap;

use crate::error::{Result, SchedulerError};
use crate::host_manager::HostManager;
use crate::models::{FilterProperties, HostState, InstanceUsage};

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub host: String,
    pub nodename: String,
    pub limits: HashMap<String, f64>,
}

/// Resolves one placement request to `props.num_instances` destinations.
///
/// Runs the filter chain once, weighs the survivors, then fills slots one
/// at a time: each slot takes the currently top-weighted host, simulates
/// consuming its resources via `consume_from_instance`, and re-weighs the
/// whole remaining pool (including the just-consumed host) before picking
/// the next slot. This lets later slots in the same request see the
/// resource draw of earlier ones without a second round-trip to the
/// inventory store — `host_manager.py`'s `select_destinations` loop.
pub async fn select_destinations(
    host_manager: &HostManager,
    props: &FilterProperties,
) -> Result<Vec<Destination>> {
    let filtered = host_manager.get_filtered_hosts(props).await?;
    let mut pool: Vec<HostState> = host_manager
        .get_weighed_hosts(filtered, props)
        .into_iter()
        .map(|w| w.host)
        .collect();

    let mut destinations = Vec::with_capacity(props.num_instances as usize);
    for _ in 0..props.num_instances {
        if pool.is_empty() {
            return Err(SchedulerError::NoValidHost);
        }
        let mut host = pool.remove(0);
        host.consume_from_instance(&build_usage(props));
        destinations.push(Destination {
            host: host.host.clone(),
            nodename: host.nodename.clone(),
            limits: host.limits.clone(),
        });

        pool.push(host);
        pool = host_manager
            .get_weighed_hosts(pool, props)
            .into_iter()
            .map(|w| w.host)
            .collect();
    }

    Ok(destinations)
}

fn build_usage(props: &FilterProperties) -> InstanceUsage {
    InstanceUsage {
        memory_mb: props.instance_type.memory_mb,
        root_gb: props.instance_type.root_gb,
        ephemeral_gb: props.instance_type.ephemeral_gb,
        vcpus: props.instance_type.vcpus,
        project_id: props.request_spec.project_id.clone(),
        vm_state: Some("building".to_string()),
        task_state: Some("scheduling".to_string()),
        os_type: None,
        instance_type_id: Some(props.instance_type.id.to_string()),
        pci_requests: props.pci_requests.clone(),
    }
}
