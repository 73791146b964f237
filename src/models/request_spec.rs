/// The three capability fields an image can pin, matched against a host's
/// `supported_instances` by the `ImageProperties` filter. An empty string
/// on any field means "unconstrained" (`image_props_filter.py` treats a
/// missing property the same way).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageProperties {
    pub architecture: Option<String>,
    pub hypervisor_type: Option<String>,
    pub vm_mode: Option<String>,
    /// `img_hv_requires_version`, e.g. `">= 6.0"`, checked against the
    /// host's `hypervisor_version` via `version_predicate`.
    pub hypervisor_version_requires: Option<String>,
}

impl ImageProperties {
    pub fn is_unconstrained(&self) -> bool {
        self.architecture.is_none() && self.hypervisor_type.is_none() && self.vm_mode.is_none()
    }
}

/// The instance-to-be-placed, as far as the filter/weigher chain cares:
/// its image properties and the project it belongs to, used by the
/// per-project instance-count stats a few filters/weighers key off of.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSpec {
    pub project_id: Option<String>,
    pub image_properties: ImageProperties,
}
