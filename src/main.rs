use std::sync::Arc;
use std::time::Duration;

use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use fleet_scheduler::attestation::{AttestationCache, HttpAttestationClient};
use fleet_scheduler::config::Config;
use fleet_scheduler::filters::FilterRegistry;
use fleet_scheduler::grpc::pb::scheduler_service_server::SchedulerServiceServer;
use fleet_scheduler::grpc::Scheduler;
use fleet_scheduler::inventory::PgInventoryStore;
use fleet_scheduler::liveness::TtlLivenessOracle;
use fleet_scheduler::weighers::WeigherRegistry;
use fleet_scheduler::HostManager;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    let manager =
        AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.server.database_url);
    let pool = bb8::Pool::builder().build(manager).await?;
    let inventory = Arc::new(PgInventoryStore::new(pool));

    let liveness = Arc::new(TtlLivenessOracle::new(config.scheduler.service_down_time));

    let attestation_client = Arc::new(HttpAttestationClient::new(&config.trust)?);
    let attestation_cache = Arc::new(AttestationCache::new(
        attestation_client,
        config.trust.attestation_auth_timeout_secs,
    ));

    let filter_registry = FilterRegistry::standard(&config.scheduler, attestation_cache);
    let weigher_registry = WeigherRegistry::standard();

    let host_manager = Arc::new(HostManager::new(
        inventory,
        liveness,
        config.scheduler.clone(),
        filter_registry,
        weigher_registry,
    ));

    host_manager.refresh().await?;
    spawn_refresh_loop(host_manager.clone(), config.server.refresh_interval_secs);

    let addr = config.server.listen_addr.parse()?;
    tracing::info!(%addr, "fleet-scheduler listening");

    tonic::transport::Server::builder()
        .add_service(SchedulerServiceServer::new(Scheduler::new(host_manager)))
        .serve(addr)
        .await?;

    Ok(())
}

/// Keeps the host-state cache warm between requests; a request-triggered
/// refresh would tie placement latency to inventory-store latency on every
/// call, which `host_manager.py`'s periodic `update_resource_stats` avoids.
fn spawn_refresh_loop(host_manager: Arc<HostManager>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = host_manager.refresh().await {
                tracing::warn!("host state refresh failed: {e:#}");
            }
        }
    });
}
