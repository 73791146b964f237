use std::collections::{HashMap, HashSet};

/// A host-aggregate's metadata, scoped by host. Filters that consult
/// aggregate metadata (`AggregateExtraSpecs`, `AggregateCores`,
/// `AggregateTypeAffinity`) look up the union of metadata values across
/// every aggregate a host belongs to, mirroring `nova.scheduler.filters.utils`.
#[derive(Debug, Clone, Default)]
pub struct AggregateMetadata {
    /// host -> (metadata key -> set of values)
    by_host: HashMap<String, HashMap<String, HashSet<String>>>,
}

impl AggregateMetadata {
    pub fn new(by_host: HashMap<String, HashMap<String, HashSet<String>>>) -> Self {
        Self { by_host }
    }

    /// All values recorded for `key` across every aggregate containing
    /// `host`, empty if the host belongs to no aggregate defining `key`.
    pub fn values_for(&self, host: &str, key: &str) -> HashSet<&str> {
        self.by_host
            .get(host)
            .and_then(|metadata| metadata.get(key))
            .map(|values| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }
}
