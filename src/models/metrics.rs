use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A single named metric reported by a compute node's heartbeat.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricItem {
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Wire shape of one entry in the `metrics` JSON blob a compute node
/// reports (spec.md §4.2): `{name, value, timestamp, source}`.
#[derive(Debug, Deserialize)]
pub struct MetricEntry {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub source: String,
}

/// Parses the `metrics` JSON list from a compute-node record into a
/// name-keyed map. Entries with a falsy (empty) name are skipped, matching
/// `host_manager.py`'s `_update_metrics_from_compute_node`.
pub fn parse_metrics(raw: Option<&str>) -> std::collections::HashMap<String, MetricItem> {
    let Some(raw) = raw else {
        return Default::default();
    };
    let entries: Vec<MetricEntry> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("malformed metrics blob, skipping: {e}");
            return Default::default();
        }
    };
    entries
        .into_iter()
        .filter(|m| !m.name.is_empty())
        .map(|m| {
            (
                m.name,
                MetricItem {
                    value: m.value,
                    timestamp: m.timestamp,
                    source: m.source,
                },
            )
        })
        .collect()
}
