use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One `{arch, hypervisor_type, vm_mode}` triple a compute node can run,
/// taken from its `supported_instances` heartbeat field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SupportedInstance {
    pub arch: String,
    pub hypervisor_type: String,
    pub vm_mode: String,
}

/// Immutable snapshot of the fields a compute node reports once per
/// heartbeat and that never change mid-request: identity, hypervisor
/// stack, and the capability triples `ImageProperties` matches against.
///
/// spec.md §9 calls out that these must never be mutated in place — a new
/// heartbeat replaces the whole snapshot rather than patching fields, so a
/// `FilterProperties` clone taken mid-request can't observe a half-applied
/// update.
#[derive(Debug, Clone, PartialEq)]
pub struct Capabilities {
    pub host_ip: Option<String>,
    pub hypervisor_type: String,
    pub hypervisor_version: i64,
    pub hypervisor_hostname: Option<String>,
    pub cpu_info: Option<String>,
    pub supported_instances: Vec<SupportedInstance>,
    pub received_at: DateTime<Utc>,
}

/// Disabled/reason/heartbeat bookkeeping for the compute service attached
/// to a host, mirrors the `services` table columns `host_manager.py` reads
/// off of `service_ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSnapshot {
    pub host: String,
    pub disabled: bool,
    pub disabled_reason: Option<String>,
    pub report_count: u64,
    pub updated_at: Option<DateTime<Utc>>,
}
