//! Thin tonic service: converts wire messages to domain types, calls
//! straight into `selection_driver::select_destinations`, converts the
//! result back. Grounded in `blockjoy-api/src/grpc/hosts.rs`'s shape
//! (a service struct holding shared state, `#[tonic::async_trait]` impls
//! doing conversion-then-delegate, domain errors mapped to `tonic::Status`
//! at the boundary rather than threaded through as wire types).

use std::str::FromStr;
use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::error::SchedulerError;
use crate::host_manager::HostManager;
use crate::models::{
    FilterProperties, ImageProperties, InstanceType, PciDeviceSpec, PciRequest, RequestSpec,
};
use crate::selection_driver::{self, Destination};

pub mod pb {
    tonic::include_proto!("scheduler.v1");
}

use pb::scheduler_service_server::SchedulerService;
use pb::{
    PrepResizeRequest, RunInstanceRequest, SelectDestinationsRequest, SelectDestinationsResponse,
};

/// The minimum `min_version` a caller may request: the protocol version
/// that introduced `select_destinations` as a first-class RPC rather than
/// a cast-and-forward alias of `run_instance` (`rpcapi.py`'s 2.7 bump).
const SELECT_DESTINATIONS_VERSION: u32 = 7;

pub struct Scheduler {
    host_manager: Arc<HostManager>,
}

impl Scheduler {
    pub fn new(host_manager: Arc<HostManager>) -> Self {
        Self { host_manager }
    }

    async fn handle(&self, props: FilterProperties) -> Result<Vec<Destination>, SchedulerError> {
        selection_driver::select_destinations(&self.host_manager, &props).await
    }
}

#[tonic::async_trait]
impl SchedulerService for Scheduler {
    async fn select_destinations(
        &self,
        request: Request<SelectDestinationsRequest>,
    ) -> Result<Response<SelectDestinationsResponse>, Status> {
        let req = request.into_inner();
        check_version(req.envelope.as_ref())?;
        let props = to_filter_properties(req.filter_properties)?;
        let destinations = self.handle(props).await.map_err(to_status)?;
        Ok(Response::new(SelectDestinationsResponse {
            destinations: destinations.into_iter().map(to_destination_msg).collect(),
        }))
    }

    async fn run_instance(
        &self,
        request: Request<RunInstanceRequest>,
    ) -> Result<Response<SelectDestinationsResponse>, Status> {
        let req = request.into_inner();
        check_version(req.envelope.as_ref())?;
        let props = to_filter_properties(req.filter_properties)?;
        let destinations = self.handle(props).await.map_err(to_status)?;
        Ok(Response::new(SelectDestinationsResponse {
            destinations: destinations.into_iter().map(to_destination_msg).collect(),
        }))
    }

    async fn prep_resize(
        &self,
        _request: Request<PrepResizeRequest>,
    ) -> Result<Response<SelectDestinationsResponse>, Status> {
        Err(to_status(SchedulerError::NotSupported))
    }
}

fn check_version(envelope: Option<&pb::Envelope>) -> Result<(), Status> {
    if let Some(envelope) = envelope {
        if envelope.min_version > SELECT_DESTINATIONS_VERSION {
            return Err(Status::unimplemented(format!(
                "server supports protocol up to {SELECT_DESTINATIONS_VERSION}, caller requires {}",
                envelope.min_version
            )));
        }
    }
    Ok(())
}

fn to_status(err: SchedulerError) -> Status {
    match err {
        SchedulerError::UnknownFilter(name) => Status::invalid_argument(format!("unknown filter: {name}")),
        SchedulerError::NoValidHost => Status::resource_exhausted(err.to_string()),
        SchedulerError::NotSupported => Status::unimplemented(err.to_string()),
        SchedulerError::InventoryUnavailable(_)
        | SchedulerError::AttestationUnavailable(_)
        | SchedulerError::Unexpected(_) => Status::unavailable(err.to_string()),
    }
}

fn to_filter_properties(msg: Option<pb::FilterPropertiesMsg>) -> Result<FilterProperties, Status> {
    let msg = msg.ok_or_else(|| Status::invalid_argument("missing filter_properties"))?;
    let instance_type_msg = msg
        .instance_type
        .ok_or_else(|| Status::invalid_argument("missing instance_type"))?;

    let instance_type = InstanceType {
        id: uuid::Uuid::from_str(&instance_type_msg.id)
            .map_err(|e| Status::invalid_argument(format!("invalid instance_type.id: {e}")))?,
        name: instance_type_msg.name,
        vcpus: instance_type_msg.vcpus,
        memory_mb: instance_type_msg.memory_mb.max(0) as u64,
        root_gb: instance_type_msg.root_gb.max(0) as u64,
        ephemeral_gb: instance_type_msg.ephemeral_gb.max(0) as u64,
        extra_specs: instance_type_msg.extra_specs,
    };

    let image_properties = msg
        .image_properties
        .map(|img| ImageProperties {
            architecture: non_empty(img.architecture),
            hypervisor_type: non_empty(img.hypervisor_type),
            vm_mode: non_empty(img.vm_mode),
            hypervisor_version_requires: non_empty(img.hypervisor_version_requires),
        })
        .unwrap_or_default();

    let pci_requests = msg
        .pci_requests
        .into_iter()
        .map(|r| PciRequest {
            count: r.count,
            spec: vec![PciDeviceSpec {
                vendor_id: non_empty(r.vendor_id),
                product_id: non_empty(r.product_id),
            }],
        })
        .collect();

    Ok(FilterProperties {
        instance_type: Arc::new(instance_type),
        request_spec: RequestSpec {
            project_id: non_empty(msg.project_id),
            image_properties,
        },
        pci_requests,
        ignore_hosts: msg.ignore_hosts,
        force_hosts: msg.force_hosts,
        force_nodes: msg.force_nodes,
        retry_count: msg.retry_count,
        filter_class_names: (!msg.filter_class_names.is_empty()).then_some(msg.filter_class_names),
        num_instances: msg.num_instances.max(1),
    })
}

fn to_destination_msg(dest: Destination) -> pb::DestinationMsg {
    pb::DestinationMsg {
        host: dest.host,
        nodename: dest.nodename,
        limits: dest.limits,
    }
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}
