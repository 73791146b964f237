use super::Weigher;
use crate::models::{FilterProperties, HostState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    MostResources,
    LeastResources,
}

/// Scores hosts by free capacity (RAM + available vcpus + free disk,
/// each normalized into the same MB-equivalent scale before summing),
/// packing instances onto the busiest hosts in `LeastResources` mode or
/// spreading them onto the least-loaded in `MostResources` mode — ported
/// from `node_scheduler.rs`'s `ResourceAffinity::MostResources`/
/// `LeastResources` weighting of `free_ram`/`free_disk`/`free_vcpus`.
pub struct ResourceWeigher {
    pub mode: Mode,
}

impl Default for ResourceWeigher {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
        }
    }
}

impl Weigher for ResourceWeigher {
    fn name(&self) -> &'static str {
        "ResourceWeigher"
    }

    fn weigh_objects(&self, hosts: &[HostState], _props: &FilterProperties) -> Vec<f64> {
        hosts
            .iter()
            .map(|host| {
                let free_vcpus = host.vcpus_total.saturating_sub(host.vcpus_used) as f64;
                // vcpus are folded into the same scale as MB via a nominal
                // 1024 MB/vcpu weight, matching the ratio `node_scheduler.rs`
                // applies between its memory and cpu terms.
                let score = host.free_ram_mb as f64 + host.free_disk_mb as f64 + free_vcpus * 1024.0;
                match self.mode {
                    Mode::MostResources => score,
                    Mode::LeastResources => -score,
                }
            })
            .collect()
    }
}
