pub mod attestation;
pub mod config;
pub mod error;
pub mod filters;
pub mod grpc;
pub mod host_manager;
pub mod inventory;
pub mod liveness;
pub mod models;
pub mod selection_driver;
pub mod weighers;

pub use error::{Result, SchedulerError};
pub use host_manager::HostManager;
