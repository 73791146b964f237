use async_trait::async_trait;

use super::version_predicate;
use super::{Filter, FilterContext};
use crate::models::{FilterProperties, HostState};

/// Matches the image's `{architecture, hypervisor_type, vm_mode}` triple
/// against the host's `supported_instances`, and separately checks
/// `img_hv_requires_version` against the host's hypervisor version —
/// `image_props_filter.py`'s `ImagePropertiesFilter`.
pub struct ImagePropertiesFilter;

#[async_trait]
impl Filter for ImagePropertiesFilter {
    fn name(&self) -> &'static str {
        "ImageProperties"
    }

    fn run_filter_once_per_request(&self) -> bool {
        true
    }

    async fn host_passes(
        &self,
        host: &mut HostState,
        props: &FilterProperties,
        _ctx: &FilterContext<'_>,
    ) -> bool {
        let image = &props.request_spec.image_properties;
        let Some(capabilities) = &host.capabilities else {
            return false;
        };

        if image.is_unconstrained() {
            return true;
        }

        if let Some(requires) = &image.hypervisor_version_requires {
            if !version_predicate::satisfies(requires, capabilities.hypervisor_version) {
                return false;
            }
        }

        capabilities.supported_instances.iter().any(|supported| {
            image
                .architecture
                .as_deref()
                .map_or(true, |a| a == supported.arch)
                && image
                    .hypervisor_type
                    .as_deref()
                    .map_or(true, |h| h == supported.hypervisor_type)
                && image
                    .vm_mode
                    .as_deref()
                    .map_or(true, |m| m == supported.vm_mode)
        })
    }
}
