use async_trait::async_trait;

use super::{Filter, FilterContext};
use crate::models::{FilterProperties, HostState};

/// Fails a host whose compute service is administratively disabled or
/// whose heartbeat has gone quiet, grounded in `compute_filter.py`'s
/// `ComputeFilter`.
pub struct ActiveCompute;

#[async_trait]
impl Filter for ActiveCompute {
    fn name(&self) -> &'static str {
        "ActiveCompute"
    }

    fn run_filter_once_per_request(&self) -> bool {
        true
    }

    async fn host_passes(
        &self,
        host: &mut HostState,
        _props: &FilterProperties,
        ctx: &FilterContext<'_>,
    ) -> bool {
        match &host.service {
            Some(service) if service.disabled => false,
            _ => (ctx.is_up)(host),
        }
    }
}
