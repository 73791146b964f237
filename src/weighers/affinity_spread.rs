use super::Weigher;
use crate::models::{FilterProperties, HostState};

/// Prefers hosts already running fewer instances from the requesting
/// project, spreading a project's fleet across the cluster rather than
/// clustering it on one host — ported from `node_scheduler.rs`'s
/// `SimilarNodeAffinity::Spread`. A request with no project id scores
/// every host equally.
pub struct AffinitySpreadWeigher;

impl Weigher for AffinitySpreadWeigher {
    fn name(&self) -> &'static str {
        "AffinitySpreadWeigher"
    }

    fn weigh_objects(&self, hosts: &[HostState], props: &FilterProperties) -> Vec<f64> {
        let Some(project_id) = &props.request_spec.project_id else {
            return vec![0.0; hosts.len()];
        };
        hosts
            .iter()
            .map(|host| {
                let existing = host
                    .stats
                    .num_instances_by_project
                    .get(project_id)
                    .copied()
                    .unwrap_or(0) as f64;
                -existing
            })
            .collect()
    }
}
