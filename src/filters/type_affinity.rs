use async_trait::async_trait;

use super::{Filter, FilterContext};
use crate::models::{FilterProperties, HostState};

/// Once a host has run any instance of a given flavor, only that flavor
/// (or an empty host) may land on it again — `type_filter.py`'s
/// `TypeAffinityFilter`.
pub struct TypeAffinity;

#[async_trait]
impl Filter for TypeAffinity {
    fn name(&self) -> &'static str {
        "TypeAffinity"
    }

    async fn host_passes(
        &self,
        host: &mut HostState,
        props: &FilterProperties,
        _ctx: &FilterContext<'_>,
    ) -> bool {
        let requested = props.instance_type.id.to_string();
        host.stats
            .instance_type_ids
            .iter()
            .all(|running| *running == requested)
    }
}

const AGGREGATE_INSTANCE_TYPE_KEY: &str = "instance_type";

/// A host belonging to an aggregate that advertises `instance_type` values
/// may only take instances of one of those flavors; a host in no such
/// aggregate is unconstrained — `type_filter.py`'s `AggregateTypeAffinityFilter`.
pub struct AggregateTypeAffinity;

#[async_trait]
impl Filter for AggregateTypeAffinity {
    fn name(&self) -> &'static str {
        "AggregateTypeAffinity"
    }

    fn run_filter_once_per_request(&self) -> bool {
        true
    }

    async fn host_passes(
        &self,
        host: &mut HostState,
        props: &FilterProperties,
        ctx: &FilterContext<'_>,
    ) -> bool {
        let allowed = ctx
            .aggregates
            .values_for(&host.host, AGGREGATE_INSTANCE_TYPE_KEY);
        allowed.is_empty() || allowed.contains(props.instance_type.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::models::AggregateMetadata;

    fn ctx(aggregates: &AggregateMetadata) -> FilterContext<'_> {
        FilterContext {
            aggregates,
            is_up: &|_| true,
        }
    }

    #[tokio::test]
    async fn empty_host_passes_type_affinity() {
        let mut host = HostState::new("h1".into(), "n1".into());
        let props = super::super::tests_support::empty_props();
        let aggregates = AggregateMetadata::default();
        assert!(TypeAffinity.host_passes(&mut host, &props, &ctx(&aggregates)).await);
    }

    #[tokio::test]
    async fn matching_flavor_on_running_host_passes() {
        let mut host = HostState::new("h1".into(), "n1".into());
        let props = super::super::tests_support::empty_props();
        host.stats
            .instance_type_ids
            .insert(props.instance_type.id.to_string());
        let aggregates = AggregateMetadata::default();
        assert!(TypeAffinity.host_passes(&mut host, &props, &ctx(&aggregates)).await);
    }

    #[tokio::test]
    async fn different_flavor_on_running_host_fails() {
        let mut host = HostState::new("h1".into(), "n1".into());
        let props = super::super::tests_support::empty_props();
        host.stats
            .instance_type_ids
            .insert(uuid::Uuid::new_v4().to_string());
        let aggregates = AggregateMetadata::default();
        assert!(!TypeAffinity.host_passes(&mut host, &props, &ctx(&aggregates)).await);
    }

    #[tokio::test]
    async fn aggregate_type_affinity_unconstrained_without_entry() {
        let mut host = HostState::new("h1".into(), "n1".into());
        let props = super::super::tests_support::empty_props();
        let aggregates = AggregateMetadata::default();
        assert!(
            AggregateTypeAffinity
                .host_passes(&mut host, &props, &ctx(&aggregates))
                .await
        );
    }

    #[tokio::test]
    async fn aggregate_type_affinity_rejects_other_flavors() {
        let mut host = HostState::new("h1".into(), "n1".into());
        let mut props = super::super::tests_support::empty_props();
        Arc::get_mut(&mut props.instance_type).unwrap().name = "m1.small".into();
        let mut by_host: HashMap<String, HashMap<String, std::collections::HashSet<String>>> =
            HashMap::new();
        by_host
            .entry("h1".to_string())
            .or_default()
            .entry(AGGREGATE_INSTANCE_TYPE_KEY.to_string())
            .or_default()
            .insert("m1.large".to_string());
        let aggregates = AggregateMetadata::new(by_host);
        assert!(
            !AggregateTypeAffinity
                .host_passes(&mut host, &props, &ctx(&aggregates))
                .await
        );
    }
}
