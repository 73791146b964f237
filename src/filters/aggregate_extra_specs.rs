use async_trait::async_trait;

use super::extra_specs_ops::match_any;
use super::{Filter, FilterContext};
use crate::models::{FilterProperties, HostState};

const SCOPE: &str = "aggregate_instance_extra_specs";

/// Every `extra_specs` entry scoped `aggregate_instance_extra_specs:<key>`
/// (or unscoped `<key>`) must be satisfied by at least one value the
/// host's aggregates advertise for `<key>` — `aggregate_instance_extra_specs.py`.
/// A flavor with no such specs trivially passes every host.
pub struct AggregateExtraSpecs;

#[async_trait]
impl Filter for AggregateExtraSpecs {
    fn name(&self) -> &'static str {
        "AggregateExtraSpecs"
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
        let scoped = props.instance_type.scoped_extra_specs(SCOPE);
        let unscoped = props.instance_type.unscoped_extra_specs();

        scoped.into_iter().chain(unscoped).all(|(key, requirement)| {
            let values = ctx.aggregates.values_for(&host.host, key);
            match_any(requirement, values)
        })
    }
}
