use std::sync::Arc;

use super::instance_type::InstanceType;
use super::pci::PciRequest;
use super::request_spec::RequestSpec;

/// Everything a single placement request carries through the filter and
/// weigher chain, spec.md §3. Cloned (cheaply, via the `Arc<InstanceType>`)
/// once per candidate host so filters never share mutable state.
#[derive(Debug, Clone)]
pub struct FilterProperties {
    pub instance_type: Arc<InstanceType>,
    pub request_spec: RequestSpec,
    pub pci_requests: Vec<PciRequest>,
    pub ignore_hosts: Vec<String>,
    pub force_hosts: Vec<String>,
    pub force_nodes: Vec<String>,
    /// Number of times this request has already failed placement and been
    /// retried; filters don't currently act on it but it rides along for
    /// parity with the RPC surface (spec.md §6).
    pub retry_count: u32,
    pub filter_class_names: Option<Vec<String>>,
    pub num_instances: u32,
}

impl FilterProperties {
    pub fn is_forced(&self) -> bool {
        !self.force_hosts.is_empty() || !self.force_nodes.is_empty()
    }
}
