pub mod aggregate;
pub mod capabilities;
pub mod filter_properties;
pub mod host_state;
pub mod instance_type;
pub mod metrics;
pub mod pci;
pub mod request_spec;

pub use aggregate::AggregateMetadata;
pub use capabilities::{Capabilities, ServiceSnapshot, SupportedInstance};
pub use filter_properties::FilterProperties;
pub use host_state::{ComputeNodeRecord, HostState, InstanceStats, InstanceUsage, ServiceRecord};
pub use instance_type::InstanceType;
pub use metrics::MetricItem;
pub use pci::{PciDeviceSpec, PciDeviceStats, PciRequest};
pub use request_spec::{ImageProperties, RequestSpec};
