//! Shared fixtures for unit tests
//!
//! Tenant 101 has two teams and three Kafka environments (1 is the base,
//! promotion order "1,2", 3 is outside the order) plus two Kafka Connect
//! environments (7 is the base, order "7,8"). Tenant 202 exists only to check
//! isolation.

use crate::auth::Permission;
use crate::cluster::MemoryCluster;
use crate::context::RequestContext;
use crate::directory::{DirectoryFile, Principal, StaticDirectory, TenantDirectory, TenantRecord};
use crate::domain::{
    ClusterBinding, ClusterKind, Environment, EnvironmentParams, InventoryEntry, Provenance,
    ResourceKind, Team, TeamId, TenantConfig, TenantId,
};
use crate::lifecycle::RequestLifecycleEngine;
use crate::ownership::OwnershipRegistry;
use crate::reconcile::ReconciliationEngine;
use crate::store::{InventoryStore, MemoryStore};
use std::sync::Arc;

pub const TENANT: TenantId = 101;
pub const TENANT_B: TenantId = 202;

pub const OCTOPUS: TeamId = 1;
pub const SEAHORSES: TeamId = 2;

const ALL_REQUEST: [Permission; 3] = [
    Permission::RequestCreateTopics,
    Permission::RequestCreateAcls,
    Permission::RequestCreateConnectors,
];
const ALL_APPROVE: [Permission; 3] = [
    Permission::ApproveTopics,
    Permission::ApproveAcls,
    Permission::ApproveConnectors,
];
const ALL_SYNC: [Permission; 3] = [
    Permission::SyncTopics,
    Permission::SyncAcls,
    Permission::SyncConnectors,
];

fn environment(id: &str, name: &str, tenant_id: TenantId, kind: ClusterKind, cluster_id: i32) -> Environment {
    let params = match id {
        "2" => EnvironmentParams {
            max_partitions: Some(4),
            max_replication_factor: Some(2),
            topic_prefix: vec!["tst_".into()],
            ..Default::default()
        },
        _ => EnvironmentParams {
            max_partitions: Some(12),
            max_replication_factor: Some(3),
            ..Default::default()
        },
    };

    Environment {
        id: id.into(),
        name: name.into(),
        tenant_id,
        kind,
        cluster: ClusterBinding {
            cluster_id,
            cluster_name: name.to_lowercase(),
            bootstrap_servers: format!("{}.kafka:9092", name.to_lowercase()),
            protocol: "PLAINTEXT".into(),
        },
        params,
    }
}

pub fn environments() -> Vec<Environment> {
    vec![
        environment("1", "DEV", TENANT, ClusterKind::Kafka, 1),
        environment("2", "TST", TENANT, ClusterKind::Kafka, 2),
        environment("3", "PRD", TENANT, ClusterKind::Kafka, 3),
        environment("7", "DEVCONNECT", TENANT, ClusterKind::KafkaConnect, 7),
        environment("8", "TSTCONNECT", TENANT, ClusterKind::KafkaConnect, 8),
        environment("50", "OTHER", TENANT_B, ClusterKind::Kafka, 50),
    ]
}

/// Look up a fixture environment by id
pub fn env(id: &str) -> Environment {
    environments()
        .into_iter()
        .find(|e| e.id == id)
        .unwrap_or_else(|| panic!("no fixture environment {}", id))
}

fn principal(username: &str, tenant_id: TenantId, team_id: TeamId, permissions: Vec<Permission>) -> Principal {
    Principal {
        username: username.into(),
        tenant_id,
        team_id,
        permissions,
    }
}

pub fn fixture_directory() -> StaticDirectory {
    let tenant_envs: Vec<_> = environments().into_iter().filter(|e| e.tenant_id == TENANT).collect();
    let other_envs: Vec<_> = environments().into_iter().filter(|e| e.tenant_id == TENANT_B).collect();

    let file = DirectoryFile {
        tenants: vec![
            TenantRecord {
                config: TenantConfig {
                    tenant_id: TENANT,
                    order_of_envs: "1,2".into(),
                    order_of_connect_envs: "7,8".into(),
                    base_sync_env: Some("1".into()),
                    base_sync_connect_env: Some("7".into()),
                },
                teams: vec![
                    Team {
                        id: OCTOPUS,
                        name: "Octopus".into(),
                        tenant_id: TENANT,
                        environments: vec!["1".into(), "2".into(), "7".into(), "8".into()],
                    },
                    Team {
                        id: SEAHORSES,
                        name: "Seahorses".into(),
                        tenant_id: TENANT,
                        environments: vec!["1".into(), "2".into(), "3".into(), "7".into(), "8".into()],
                    },
                ],
                environments: tenant_envs,
            },
            TenantRecord {
                config: TenantConfig {
                    tenant_id: TENANT_B,
                    order_of_envs: "50".into(),
                    base_sync_env: Some("50".into()),
                    ..Default::default()
                },
                teams: vec![Team {
                    id: 10,
                    name: "Octopus".into(),
                    tenant_id: TENANT_B,
                    environments: vec!["50".into()],
                }],
                environments: other_envs,
            },
        ],
        principals: vec![
            principal("alice", TENANT, OCTOPUS, ALL_REQUEST.to_vec()),
            principal("bob", TENANT, SEAHORSES, [ALL_REQUEST, ALL_APPROVE].concat()),
            principal("carol", TENANT, OCTOPUS, [ALL_REQUEST, ALL_APPROVE].concat()),
            principal("sam", TENANT, OCTOPUS, [ALL_REQUEST, ALL_SYNC].concat()),
            principal("sally", TENANT, SEAHORSES, ALL_SYNC.to_vec()),
            principal("dave", TENANT, OCTOPUS, vec![]),
            principal("mallory", TENANT_B, 10, [ALL_REQUEST, ALL_APPROVE, ALL_SYNC].concat()),
        ],
    };

    match StaticDirectory::new(file) {
        Ok(directory) => directory,
        Err(e) => panic!("invalid fixture directory: {}", e),
    }
}

pub fn ctx_for(username: &str) -> RequestContext {
    fixture_directory()
        .resolve_context(username)
        .unwrap_or_else(|| panic!("no fixture principal {}", username))
}

/// In-memory store, cluster and both engines wired together
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub cluster: Arc<MemoryCluster>,
    pub registry: OwnershipRegistry,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            cluster: Arc::new(MemoryCluster::new()),
            registry: OwnershipRegistry::new(Arc::new(fixture_directory())),
        }
    }

    pub fn lifecycle(&self) -> RequestLifecycleEngine {
        RequestLifecycleEngine::new(self.store.clone(), self.cluster.clone(), self.registry.clone())
    }

    pub fn reconciler(&self) -> ReconciliationEngine {
        ReconciliationEngine::new(self.store.clone(), self.cluster.clone(), self.registry.clone())
    }

    /// Store a synced entry and return it as stored
    pub async fn manage(&self, kind: ResourceKind, env_id: &str, name: &str, team_id: TeamId) -> InventoryEntry {
        self.manage_in(TENANT, kind, env_id, name, team_id).await
    }

    pub async fn manage_in(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        env_id: &str,
        name: &str,
        team_id: TeamId,
    ) -> InventoryEntry {
        let id = self
            .store
            .next_sequence_id(kind.inventory_counter(), tenant_id)
            .await
            .unwrap();
        let entry = InventoryEntry::new(id, tenant_id, kind, name, env_id, team_id, Provenance::Synced)
            .with_config(serde_json::json!({ "name": name }));
        self.store
            .upsert_inventory_batch(tenant_id, kind, &[entry])
            .await
            .unwrap()
            .remove(0)
    }

    /// Put a resource on the live cluster
    pub async fn live(&self, kind: ResourceKind, env_id: &str, name: &str) {
        self.cluster
            .insert(env_id, kind, name, serde_json::json!({ "name": name }))
            .await;
    }
}
