use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::aggregate::AggregateMetadata;
use super::capabilities::{Capabilities, ServiceSnapshot, SupportedInstance};
use super::metrics::{self, MetricItem};
use super::pci::{PciDeviceStats, PciRequest};

/// Raw row pulled from the inventory store for one compute node's latest
/// heartbeat, before it's folded into a `HostState`. Field names mirror the
/// `compute_nodes` columns `host_manager.py`'s `HostState.update_from_compute_node`
/// reads off of.
#[derive(Debug, Clone)]
pub struct ComputeNodeRecord {
    pub host: String,
    pub hypervisor_hostname: String,
    pub memory_mb: u64,
    pub free_ram_mb: u64,
    pub local_gb: u64,
    pub free_disk_gb: u64,
    /// `disk_available_least`, when the hypervisor reports it: the actual
    /// free space on a thin-provisioned backing store, which can be less
    /// than `free_disk_gb` once qcow2 images have grown. Preferred over
    /// `free_disk_gb` when present.
    pub disk_available_least: Option<u64>,
    pub local_gb_used: u64,
    pub vcpus: u32,
    pub vcpus_used: u32,
    pub updated_at: Option<DateTime<Utc>>,
    /// Generic key/value bag; see `parse_stats`.
    pub stats: HashMap<String, String>,
    pub pci_stats: Option<PciDeviceStats>,
    pub metrics_json: Option<String>,
    pub host_ip: Option<String>,
    pub hypervisor_type: String,
    pub hypervisor_version: i64,
    pub cpu_info: Option<String>,
    pub supported_instances: Vec<SupportedInstance>,
}

/// The subset of `services` columns relevant to a compute node's liveness.
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    pub host: String,
    pub disabled: bool,
    pub disabled_reason: Option<String>,
    pub report_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-host, per-project/vm-state/task-state/os-type instance counts and
/// the aggregate I/O workload figure, parsed out of a compute node's
/// `stats` bag by key prefix (`num_proj_`, `num_vm_`, `num_task_`,
/// `num_os_type_`, `io_workload`) — `host_manager.py`'s `_statmap`/
/// `_stat_remove`/`_update_from_compute_node` stats handling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceStats {
    pub num_instances: u64,
    pub num_instances_by_project: HashMap<String, u64>,
    pub num_instances_by_vm_state: HashMap<String, u64>,
    pub num_instances_by_task_state: HashMap<String, u64>,
    pub num_instances_by_os_type: HashMap<String, u64>,
    /// Distinct flavor ids currently running on the host, consulted by the
    /// `TypeAffinity` filter — `type_filter.py`'s `TypeAffinityFilter`.
    pub instance_type_ids: std::collections::HashSet<String>,
    pub num_io_ops: u64,
}

/// Parses the `num_proj_<id>`, `num_vm_<state>`, `num_task_<state>`,
/// `num_os_type_<type>`, `num_type_<id>`, and `io_workload` keys out of a
/// compute node's generic stats bag. Unparseable numeric values are treated
/// as `0` rather than failing the whole update, since a single corrupt
/// counter shouldn't take a host out of scheduling.
pub fn parse_stats(stats: &HashMap<String, String>) -> InstanceStats {
    let mut parsed = InstanceStats::default();
    for (key, value) in stats {
        if let Some(type_id) = key.strip_prefix("num_type_") {
            if value.parse::<u64>().unwrap_or(0) > 0 {
                parsed.instance_type_ids.insert(type_id.to_string());
            }
            continue;
        }
        let n: u64 = value.parse().unwrap_or(0);
        if let Some(project) = key.strip_prefix("num_proj_") {
            *parsed
                .num_instances_by_project
                .entry(project.to_string())
                .or_default() += n;
        } else if let Some(state) = key.strip_prefix("num_vm_") {
            *parsed
                .num_instances_by_vm_state
                .entry(state.to_string())
                .or_default() += n;
        } else if let Some(state) = key.strip_prefix("num_task_") {
            *parsed
                .num_instances_by_task_state
                .entry(state.to_string())
                .or_default() += n;
        } else if let Some(os_type) = key.strip_prefix("num_os_type_") {
            *parsed
                .num_instances_by_os_type
                .entry(os_type.to_string())
                .or_default() += n;
        } else if key == "io_workload" {
            parsed.num_io_ops = n;
        }
    }
    parsed.num_instances = parsed.num_instances_by_vm_state.values().sum();
    parsed
}

/// The scheduler's live, mutable view of one compute node. Everything here
/// except `capabilities`/`service` is refreshed wholesale on each heartbeat
/// and further mutated in-place, per-candidate, by `consume_from_instance`
/// while walking a single `select_destinations` call.
#[derive(Debug, Clone)]
pub struct HostState {
    pub host: String,
    pub nodename: String,
    pub capabilities: Option<Capabilities>,
    pub service: Option<ServiceSnapshot>,

    pub total_usable_ram_mb: u64,
    pub free_ram_mb: u64,
    pub total_usable_disk_gb: u64,
    pub free_disk_mb: u64,
    pub vcpus_total: u32,
    pub vcpus_used: u32,

    pub stats: InstanceStats,
    pub limits: HashMap<String, f64>,
    pub metrics: HashMap<String, MetricItem>,
    pub pci_stats: Option<PciDeviceStats>,

    pub updated: Option<DateTime<Utc>>,
}

impl HostState {
    pub fn new(host: String, nodename: String) -> Self {
        HostState {
            host,
            nodename,
            capabilities: None,
            service: None,
            total_usable_ram_mb: 0,
            free_ram_mb: 0,
            total_usable_disk_gb: 0,
            free_disk_mb: 0,
            vcpus_total: 0,
            vcpus_used: 0,
            stats: InstanceStats::default(),
            limits: HashMap::new(),
            metrics: HashMap::new(),
            pci_stats: None,
            updated: None,
        }
    }

    /// Folds a fresh compute-node heartbeat into this host's live state.
    /// Guarded by monotonic freshness: a record strictly older than what we
    /// already have is dropped, matching `host_manager.py`'s stale-update
    /// guard (heartbeats can arrive out of order over the message bus). A
    /// record with the same `updated_at` as the cached one still applies.
    pub fn update_from_compute_node(&mut self, record: ComputeNodeRecord) {
        if let (Some(incoming), Some(current)) = (record.updated_at, self.updated) {
            if incoming < current {
                tracing::debug!(
                    host = %self.host, node = %self.nodename,
                    "dropping stale compute_node update"
                );
                return;
            }
        }

        self.total_usable_ram_mb = record.memory_mb;
        self.free_ram_mb = record.free_ram_mb;
        self.total_usable_disk_gb = record.local_gb;
        self.free_disk_mb = record
            .disk_available_least
            .unwrap_or(record.free_disk_gb)
            .saturating_mul(1024);
        self.vcpus_total = record.vcpus;
        self.vcpus_used = record.vcpus_used;
        self.stats = parse_stats(&record.stats);
        self.pci_stats = record.pci_stats;
        self.metrics = metrics::parse_metrics(record.metrics_json.as_deref());
        self.capabilities = Some(Capabilities {
            host_ip: record.host_ip,
            hypervisor_type: record.hypervisor_type,
            hypervisor_version: record.hypervisor_version,
            hypervisor_hostname: Some(record.hypervisor_hostname),
            cpu_info: record.cpu_info,
            supported_instances: record.supported_instances,
            received_at: Utc::now(),
        });
        self.updated = record.updated_at;
    }

    pub fn update_service(&mut self, record: ServiceRecord) {
        self.service = Some(ServiceSnapshot {
            host: record.host,
            disabled: record.disabled,
            disabled_reason: record.disabled_reason,
            report_count: record.report_count,
            updated_at: record.updated_at,
        });
    }

    /// Simulates placing `usage` on this host: deducts resources, bumps the
    /// per-project/vm-state/os-type counters, and consumes PCI devices.
    /// Called once per slot filled in `select_destinations` so the next
    /// slot's filter/weigh pass sees this host as already partly occupied —
    /// `host_manager.py`'s `HostState.consume_from_instance`.
    pub fn consume_from_instance(&mut self, usage: &InstanceUsage) {
        self.free_ram_mb = self.free_ram_mb.saturating_sub(usage.memory_mb);
        let disk_mb = usage.root_gb.saturating_add(usage.ephemeral_gb) * 1024;
        self.free_disk_mb = self.free_disk_mb.saturating_sub(disk_mb);
        self.vcpus_used = self.vcpus_used.saturating_add(usage.vcpus);

        self.stats.num_instances += 1;
        if let Some(project) = &usage.project_id {
            *self
                .stats
                .num_instances_by_project
                .entry(project.clone())
                .or_default() += 1;
        }
        let vm_state = usage.vm_state.as_deref().unwrap_or("building");
        *self
            .stats
            .num_instances_by_vm_state
            .entry(vm_state.to_string())
            .or_default() += 1;
        if let Some(task_state) = &usage.task_state {
            *self
                .stats
                .num_instances_by_task_state
                .entry(task_state.clone())
                .or_default() += 1;
        }
        if let Some(type_id) = &usage.instance_type_id {
            self.stats.instance_type_ids.insert(type_id.clone());
        }
        if let Some(os_type) = &usage.os_type {
            *self
                .stats
                .num_instances_by_os_type
                .entry(os_type.clone())
                .or_default() += 1;
        }

        if let Some(pci_stats) = &mut self.pci_stats {
            if !pci_stats.apply_requests(&usage.pci_requests) {
                tracing::warn!(
                    host = %self.host,
                    "pci device request unsatisfiable at consume time, despite passing PciPassthrough"
                );
            }
        }

        const IO_HEAVY_TASK_STATES: [&str; 5] = [
            "resize_migrating",
            "rebuilding",
            "resize_prep",
            "image_snapshot",
            "image_backup",
        ];
        if vm_state == "building"
            || usage
                .task_state
                .as_deref()
                .is_some_and(|t| IO_HEAVY_TASK_STATES.contains(&t))
        {
            self.stats.num_io_ops += 1;
        }

        self.updated = Some(Utc::now());
    }

    /// Aggregate metadata for the host this entry belongs to, via the
    /// caller-supplied lookup (`HostManager` owns the actual map).
    pub fn aggregate_values<'a>(
        &self,
        aggregates: &'a AggregateMetadata,
        key: &str,
    ) -> std::collections::HashSet<&'a str> {
        aggregates.values_for(&self.host, key)
    }
}

/// Simulated resource draw for one instance being placed, fed to
/// `consume_from_instance` between weighing passes.
#[derive(Debug, Clone, Default)]
pub struct InstanceUsage {
    pub memory_mb: u64,
    pub root_gb: u64,
    pub ephemeral_gb: u64,
    pub vcpus: u32,
    pub project_id: Option<String>,
    pub vm_state: Option<String>,
    pub task_state: Option<String>,
    pub os_type: Option<String>,
    pub instance_type_id: Option<String>,
    pub pci_requests: Vec<PciRequest>,
}
