//! Read-only access to the cluster inventory: the set of compute nodes and
//! their services, as last reported to the shared database. The scheduler
//! never writes through this trait — placement decisions are advisory, the
//! actual reservation happens downstream (spec.md §2).

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::models::{AggregateMetadata, ComputeNodeRecord, ServiceRecord};

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn compute_nodes(&self) -> anyhow::Result<Vec<ComputeNodeRecord>>;
    async fn services(&self, topic: &str) -> anyhow::Result<Vec<ServiceRecord>>;
    async fn aggregate_metadata(&self) -> anyhow::Result<AggregateMetadata>;
}

/// `diesel-async` + `bb8` backed adapter, grounded in
/// `Host::host_candidates`'s query style (raw SQL assembled against a
/// pooled async connection, mapped into domain structs by hand rather than
/// through generated table! macros, since the upstream schema isn't ours
/// to own).
pub struct PgInventoryStore {
    pool: bb8::Pool<diesel_async::pooled_connection::AsyncDieselConnectionManager<AsyncPgConnection>>,
}

impl PgInventoryStore {
    pub fn new(
        pool: bb8::Pool<
            diesel_async::pooled_connection::AsyncDieselConnectionManager<AsyncPgConnection>,
        >,
    ) -> Self {
        Self { pool }
    }
}

#[derive(QueryableByName, Debug)]
struct ComputeNodeRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    host: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    hypervisor_hostname: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    memory_mb: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    free_ram_mb: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    local_gb: i64,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    free_disk_gb: i64,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::BigInt>)]
    disk_available_least: Option<i64>,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    local_gb_used: i64,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    vcpus: i32,
    #[diesel(sql_type = diesel::sql_types::Integer)]
    vcpus_used: i32,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>)]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    stats: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pci_stats: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    metrics: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    host_ip: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Text)]
    hypervisor_type: String,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    hypervisor_version: i64,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    cpu_info: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    supported_instances: Option<String>,
}

#[derive(QueryableByName, Debug)]
struct ServiceRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    host: String,
    #[diesel(sql_type = diesel::sql_types::Bool)]
    disabled: bool,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    disabled_reason: Option<String>,
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    report_count: i64,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Timestamptz>)]
    updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn compute_nodes(&self) -> anyhow::Result<Vec<ComputeNodeRecord>> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<ComputeNodeRow> = diesel::sql_query(
            "SELECT host, hypervisor_hostname, memory_mb, free_ram_mb, local_gb, \
             free_disk_gb, disk_available_least, local_gb_used, vcpus, vcpus_used, \
             updated_at, stats, pci_stats, metrics, host_ip, hypervisor_type, \
             hypervisor_version, cpu_info, supported_instances \
             FROM compute_nodes WHERE deleted = 0",
        )
        .load(&mut conn)
        .await?;

        rows.into_iter().map(row_to_record).collect()
    }

    async fn services(&self, topic: &str) -> anyhow::Result<Vec<ServiceRecord>> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<ServiceRow> = diesel::sql_query(
            "SELECT host, disabled, disabled_reason, report_count, updated_at \
             FROM services WHERE topic = $1 AND deleted = 0",
        )
        .bind::<diesel::sql_types::Text, _>(topic)
        .load(&mut conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ServiceRecord {
                host: r.host,
                disabled: r.disabled,
                disabled_reason: r.disabled_reason,
                report_count: r.report_count.max(0) as u64,
                updated_at: r.updated_at,
            })
            .collect())
    }

    async fn aggregate_metadata(&self) -> anyhow::Result<AggregateMetadata> {
        let mut conn = self.pool.get().await?;
        let rows: Vec<AggregateMetadataRow> = diesel::sql_query(
            "SELECT ah.host, am.key, am.value FROM aggregate_hosts ah \
             JOIN aggregate_metadata am ON am.aggregate_id = ah.aggregate_id \
             WHERE ah.deleted = 0 AND am.deleted = 0",
        )
        .load(&mut conn)
        .await?;

        let mut by_host: std::collections::HashMap<
            String,
            std::collections::HashMap<String, std::collections::HashSet<String>>,
        > = std::collections::HashMap::new();
        for row in rows {
            by_host
                .entry(row.host)
                .or_default()
                .entry(row.key)
                .or_default()
                .insert(row.value);
        }
        Ok(AggregateMetadata::new(by_host))
    }
}

#[derive(QueryableByName, Debug)]
struct AggregateMetadataRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    host: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    key: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    value: String,
}

fn row_to_record(row: ComputeNodeRow) -> anyhow::Result<ComputeNodeRecord> {
    let stats: std::collections::HashMap<String, String> = row
        .stats
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?
        .unwrap_or_default();
    let supported_instances = row
        .supported_instances
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?
        .unwrap_or_default();
    let pci_stats = row
        .pci_stats
        .as_deref()
        .map(parse_pci_stats)
        .transpose()?;

    Ok(ComputeNodeRecord {
        host: row.host,
        hypervisor_hostname: row.hypervisor_hostname,
        memory_mb: row.memory_mb.max(0) as u64,
        free_ram_mb: row.free_ram_mb.max(0) as u64,
        local_gb: row.local_gb.max(0) as u64,
        free_disk_gb: row.free_disk_gb.max(0) as u64,
        disk_available_least: row.disk_available_least.map(|v| v.max(0) as u64),
        local_gb_used: row.local_gb_used.max(0) as u64,
        vcpus: row.vcpus.max(0) as u32,
        vcpus_used: row.vcpus_used.max(0) as u32,
        updated_at: row.updated_at,
        stats,
        pci_stats,
        metrics_json: row.metrics,
        host_ip: row.host_ip,
        hypervisor_type: row.hypervisor_type,
        hypervisor_version: row.hypervisor_version,
        cpu_info: row.cpu_info,
        supported_instances,
    })
}

#[derive(serde::Deserialize)]
struct RawPciPool {
    vendor_id: String,
    product_id: String,
    count: u32,
}

fn parse_pci_stats(raw: &str) -> anyhow::Result<crate::models::PciDeviceStats> {
    let pools: Vec<RawPciPool> = serde_json::from_str(raw)?;
    let map = pools
        .into_iter()
        .map(|p| ((p.vendor_id, p.product_id), p.count))
        .collect();
    Ok(crate::models::PciDeviceStats::from_pools(map))
}
