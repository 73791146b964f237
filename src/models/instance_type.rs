use std::collections::HashMap;

use uuid::Uuid;

/// A flavor: the resource shape and `extra_specs` scheduler hints behind a
/// requested instance, spec.md §3.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceType {
    pub id: Uuid,
    pub name: String,
    pub vcpus: u32,
    pub memory_mb: u64,
    pub root_gb: u64,
    pub ephemeral_gb: u64,
    pub extra_specs: HashMap<String, String>,
}

impl InstanceType {
    pub fn root_and_ephemeral_gb(&self) -> u64 {
        self.root_gb + self.ephemeral_gb
    }

    /// `extra_specs` entries scoped to `scope:` (e.g. `aggregate_instance_extra_specs:`),
    /// with the scope prefix stripped, per `aggregate_instance_extra_specs.py`.
    pub fn scoped_extra_specs<'a>(&'a self, scope: &str) -> HashMap<&'a str, &'a str> {
        let prefix = format!("{scope}:");
        self.extra_specs
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(&prefix)
                    .map(|stripped| (stripped, v.as_str()))
            })
            .collect()
    }

    /// `extra_specs` entries with no scope prefix at all (no `:` before the
    /// first path segment), also consulted unscoped by
    /// `aggregate_instance_extra_specs.py`.
    pub fn unscoped_extra_specs(&self) -> HashMap<&str, &str> {
        self.extra_specs
            .iter()
            .filter(|(k, _)| !k.contains(':'))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}
