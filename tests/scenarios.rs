//! End-to-end placement scenarios run against `HostManager` with
//! hand-written fakes standing in for the inventory store, liveness
//! oracle, and attestation client — the same fixture-over-trait style
//! `blockjoy-api`'s `TestDb`/`TestCloudflareApi` use.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use fleet_scheduler::attestation::{AttestationCache, AttestationClient, AttestationResult};
use fleet_scheduler::config::scheduler::Config as SchedulerConfig;
use fleet_scheduler::filters::FilterRegistry;
use fleet_scheduler::inventory::InventoryStore;
use fleet_scheduler::liveness::LivenessOracle;
use fleet_scheduler::models::{
    AggregateMetadata, ComputeNodeRecord, FilterProperties, ImageProperties, InstanceType,
    PciDeviceStats, RequestSpec, ServiceRecord,
};
use fleet_scheduler::selection_driver::select_destinations;
use fleet_scheduler::weighers::WeigherRegistry;
use fleet_scheduler::{HostManager, SchedulerError};

struct FakeInventory {
    nodes: Vec<ComputeNodeRecord>,
    services: Vec<ServiceRecord>,
    aggregates: AggregateMetadata,
}

#[async_trait]
impl InventoryStore for FakeInventory {
    async fn compute_nodes(&self) -> anyhow::Result<Vec<ComputeNodeRecord>> {
        Ok(self.nodes.clone())
    }

    async fn services(&self, _topic: &str) -> anyhow::Result<Vec<ServiceRecord>> {
        Ok(self.services.clone())
    }

    async fn aggregate_metadata(&self) -> anyhow::Result<AggregateMetadata> {
        Ok(self.aggregates.clone())
    }
}

struct AlwaysUp;

impl LivenessOracle for AlwaysUp {
    fn is_up(&self, _last_heartbeat: Option<chrono::DateTime<Utc>>) -> bool {
        true
    }
}

fn compute_node(host: &str, vcpus: u32, memory_mb: u64, disk_gb: u64) -> ComputeNodeRecord {
    ComputeNodeRecord {
        host: host.to_string(),
        hypervisor_hostname: format!("{host}-node"),
        memory_mb,
        free_ram_mb: memory_mb,
        local_gb: disk_gb,
        free_disk_gb: disk_gb,
        disk_available_least: None,
        local_gb_used: 0,
        vcpus,
        vcpus_used: 0,
        updated_at: Some(Utc::now()),
        stats: HashMap::new(),
        pci_stats: Some(PciDeviceStats::default()),
        metrics_json: None,
        host_ip: Some("10.0.0.1".into()),
        hypervisor_type: "qemu".into(),
        hypervisor_version: 6_000_000,
        cpu_info: None,
        supported_instances: vec![],
    }
}

fn service(host: &str, disabled: bool) -> ServiceRecord {
    ServiceRecord {
        host: host.to_string(),
        disabled,
        disabled_reason: None,
        report_count: 1,
        updated_at: Some(Utc::now()),
    }
}

fn flavor(vcpus: u32, memory_mb: u64, root_gb: u64) -> Arc<InstanceType> {
    Arc::new(InstanceType {
        id: uuid::Uuid::new_v4(),
        name: "m1.test".into(),
        vcpus,
        memory_mb,
        root_gb,
        ephemeral_gb: 0,
        extra_specs: HashMap::new(),
    })
}

async fn build_manager(
    nodes: Vec<ComputeNodeRecord>,
    services: Vec<ServiceRecord>,
    aggregates: AggregateMetadata,
    scheduler_config: SchedulerConfig,
) -> HostManager {
    let inventory = Arc::new(FakeInventory {
        nodes,
        services,
        aggregates,
    });
    let liveness = Arc::new(AlwaysUp);
    let attestation_client = Arc::new(NoopAttestationClient);
    let attestation_cache = Arc::new(AttestationCache::new(attestation_client, 300));
    let filter_registry = FilterRegistry::standard(&scheduler_config, attestation_cache);
    let weigher_registry = WeigherRegistry::standard();
    let manager = HostManager::new(
        inventory,
        liveness,
        scheduler_config,
        filter_registry,
        weigher_registry,
    );
    manager.refresh().await.expect("refresh succeeds");
    manager
}

struct NoopAttestationClient;

#[async_trait]
impl AttestationClient for NoopAttestationClient {
    async fn attest(&self, _hosts: &[String]) -> anyhow::Result<Vec<AttestationResult>> {
        Ok(vec![])
    }
}

fn base_props(flavor: Arc<InstanceType>) -> FilterProperties {
    FilterProperties {
        instance_type: flavor,
        request_spec: RequestSpec {
            project_id: Some("proj-1".into()),
            image_properties: ImageProperties::default(),
        },
        pci_requests: vec![],
        ignore_hosts: vec![],
        force_hosts: vec![],
        force_nodes: vec![],
        retry_count: 0,
        filter_class_names: None,
        num_instances: 1,
    }
}

#[tokio::test]
async fn s1_simple_fit() {
    let manager = build_manager(
        vec![compute_node("host-a", 8, 16_384, 100)],
        vec![service("host-a", false)],
        AggregateMetadata::default(),
        SchedulerConfig::default(),
    )
    .await;

    let props = base_props(flavor(2, 2048, 10));
    let destinations = select_destinations(&manager, &props).await.unwrap();

    assert_eq!(destinations.len(), 1);
    assert_eq!(destinations[0].host, "host-a");
}

#[tokio::test]
async fn s2_overcommit_allows_placement_beyond_physical_cores() {
    // 4 physical vcpus, default ratio 16 -> 64 usable; an 8-vcpu flavor is
    // "overcommitted" relative to physical capacity but still passes.
    let manager = build_manager(
        vec![compute_node("host-a", 4, 16_384, 100)],
        vec![service("host-a", false)],
        AggregateMetadata::default(),
        SchedulerConfig::default(),
    )
    .await;

    let props = base_props(flavor(8, 1024, 10));
    let destinations = select_destinations(&manager, &props).await.unwrap();
    assert_eq!(destinations[0].host, "host-a");
}

#[tokio::test]
async fn s3_force_host_overrides_filter_failure() {
    // host-a's service is disabled, which would fail ActiveCompute, but
    // force_hosts should bypass the filter chain entirely.
    let manager = build_manager(
        vec![compute_node("host-a", 8, 16_384, 100)],
        vec![service("host-a", true)],
        AggregateMetadata::default(),
        SchedulerConfig::default(),
    )
    .await;

    let mut props = base_props(flavor(2, 2048, 10));
    props.force_hosts = vec!["host-a".to_string()];
    let destinations = select_destinations(&manager, &props).await.unwrap();
    assert_eq!(destinations[0].host, "host-a");
}

#[tokio::test]
async fn s4_extra_specs_in_operator_matches_substring() {
    let mut by_host: HashMap<String, HashMap<String, HashSet<String>>> = HashMap::new();
    by_host
        .entry("host-a".to_string())
        .or_default()
        .entry("disk_type".to_string())
        .or_default()
        .insert("local-ssd-fast".to_string());
    let aggregates = AggregateMetadata::new(by_host);

    let manager = build_manager(
        vec![compute_node("host-a", 8, 16_384, 100)],
        vec![service("host-a", false)],
        aggregates,
        SchedulerConfig {
            default_filters: vec!["ActiveCompute".into(), "AggregateExtraSpecs".into()],
            ..SchedulerConfig::default()
        },
    )
    .await;

    let mut specs = HashMap::new();
    specs.insert("disk_type".to_string(), "<in> ssd".to_string());
    let mut instance_type = (*flavor(2, 2048, 10)).clone();
    instance_type.extra_specs = specs;

    let mut props = base_props(Arc::new(instance_type));
    let destinations = select_destinations(&manager, &props).await.unwrap();
    assert_eq!(destinations[0].host, "host-a");

    // A requirement no host's aggregate satisfies must filter everything out.
    let mut unsatisfiable = HashMap::new();
    unsatisfiable.insert("disk_type".to_string(), "<in> nvme".to_string());
    let mut instance_type = (*flavor(2, 2048, 10)).clone();
    instance_type.extra_specs = unsatisfiable;
    props.instance_type = Arc::new(instance_type);
    let err = select_destinations(&manager, &props).await.unwrap_err();
    assert!(matches!(err, SchedulerError::NoValidHost));
}

#[tokio::test]
async fn s5_attestation_cache_reused_across_calls() {
    let call_count = Arc::new(AtomicUsize::new(0));
    struct CountingClient {
        calls: Arc<AtomicUsize>,
    }
    #[async_trait]
    impl AttestationClient for CountingClient {
        async fn attest(&self, hosts: &[String]) -> anyhow::Result<Vec<AttestationResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(hosts
                .iter()
                .map(|h| AttestationResult {
                    host_name: h.clone(),
                    trust_lvl: "trusted".into(),
                    vtime: Some(Utc::now().to_rfc3339()),
                })
                .collect())
        }
    }

    let cache = AttestationCache::new(
        Arc::new(CountingClient {
            calls: call_count.clone(),
        }),
        300,
    );

    assert_eq!(
        cache.trust_level("host-a").await,
        fleet_scheduler::attestation::TrustLevel::Trusted
    );
    assert_eq!(call_count.load(Ordering::SeqCst), 1);

    // Second lookup within the auth_timeout window must reuse the cache.
    assert_eq!(
        cache.trust_level("host-a").await,
        fleet_scheduler::attestation::TrustLevel::Trusted
    );
    assert_eq!(call_count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn s6_no_valid_host_when_pool_exhausted() {
    let manager = build_manager(
        vec![compute_node("host-a", 2, 2_048, 10)],
        vec![service("host-a", false)],
        AggregateMetadata::default(),
        SchedulerConfig::default(),
    )
    .await;

    // Flavor too large for the single host's ram even with overcommit.
    let props = base_props(flavor(2, 1_000_000, 10));
    let err = select_destinations(&manager, &props).await.unwrap_err();
    assert!(matches!(err, SchedulerError::NoValidHost));
}
