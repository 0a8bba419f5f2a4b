//! In-memory cluster
//!
//! Stands in for real clusters in development and tests. Individual
//! environments can be switched unreachable to exercise degraded paths.

use crate::cluster::{ClusterAgent, ClusterError, ClusterHealth};
use crate::domain::{Environment, RequestOperation, ResourceKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

type Resources = BTreeMap<String, Value>;

#[derive(Default)]
pub struct MemoryCluster {
    resources: RwLock<HashMap<(String, ResourceKind), Resources>>,
    unreachable: RwLock<HashSet<String>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resource directly, bypassing any request
    pub async fn insert(&self, env_id: &str, kind: ResourceKind, name: &str, config: Value) {
        let mut resources = self.resources.write().await;
        resources
            .entry((env_id.to_string(), kind))
            .or_default()
            .insert(name.to_string(), config);
    }

    pub async fn remove(&self, env_id: &str, kind: ResourceKind, name: &str) {
        let mut resources = self.resources.write().await;
        if let Some(map) = resources.get_mut(&(env_id.to_string(), kind)) {
            map.remove(name);
        }
    }

    pub async fn resource(&self, env_id: &str, kind: ResourceKind, name: &str) -> Option<Value> {
        let resources = self.resources.read().await;
        resources
            .get(&(env_id.to_string(), kind))
            .and_then(|m| m.get(name))
            .cloned()
    }

    pub async fn set_unreachable(&self, env_id: &str, unreachable: bool) {
        let mut set = self.unreachable.write().await;
        if unreachable {
            set.insert(env_id.to_string());
        } else {
            set.remove(env_id);
        }
    }

    async fn check_reachable(&self, env: &Environment) -> Result<(), ClusterError> {
        if self.unreachable.read().await.contains(&env.id) {
            return Err(ClusterError::Unreachable(format!(
                "Cluster {} is not reachable",
                env.cluster.identification()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterAgent for MemoryCluster {
    async fn list_resources(
        &self,
        env: &Environment,
        kind: ResourceKind,
    ) -> Result<Vec<String>, ClusterError> {
        self.check_reachable(env).await?;
        let resources = self.resources.read().await;
        Ok(resources
            .get(&(env.id.clone(), kind))
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_resource_config(
        &self,
        env: &Environment,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Value, ClusterError> {
        self.check_reachable(env).await?;
        self.resource(&env.id, kind, name)
            .await
            .ok_or_else(|| ClusterError::NotFound(format!("{} '{}' not found", kind, name)))
    }

    async fn apply_resource(
        &self,
        env: &Environment,
        kind: ResourceKind,
        name: &str,
        config: &Value,
        operation: RequestOperation,
    ) -> Result<(), ClusterError> {
        self.check_reachable(env).await?;
        let mut resources = self.resources.write().await;
        let map = resources.entry((env.id.clone(), kind)).or_default();

        match operation {
            RequestOperation::Create => {
                if let Some(existing) = map.get(name) {
                    if existing != config {
                        return Err(ClusterError::Conflict(format!(
                            "{} '{}' already exists with a different config",
                            kind, name
                        )));
                    }
                }
                map.insert(name.to_string(), config.clone());
            }
            RequestOperation::Update => {
                let slot = map
                    .get_mut(name)
                    .ok_or_else(|| ClusterError::NotFound(format!("{} '{}' not found", kind, name)))?;
                *slot = config.clone();
            }
            RequestOperation::Delete => {
                map.remove(name);
            }
        }
        Ok(())
    }

    async fn probe_status(&self, env: &Environment) -> Result<ClusterHealth, ClusterError> {
        self.check_reachable(env).await?;
        Ok(ClusterHealth::online(env))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::env;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let cluster = MemoryCluster::new();
        let dev = env("1");
        let config = json!({"partitions": 3});

        for _ in 0..2 {
            cluster
                .apply_resource(&dev, ResourceKind::Topic, "orders", &config, RequestOperation::Create)
                .await
                .unwrap();
        }
        assert_eq!(cluster.list_resources(&dev, ResourceKind::Topic).await.unwrap(), vec!["orders"]);

        let clash = cluster
            .apply_resource(&dev, ResourceKind::Topic, "orders", &json!({"partitions": 6}), RequestOperation::Create)
            .await;
        assert!(matches!(clash, Err(ClusterError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_unreachable_environment() {
        let cluster = MemoryCluster::new();
        let dev = env("1");
        cluster.set_unreachable("1", true).await;

        assert!(matches!(
            cluster.list_resources(&dev, ResourceKind::Topic).await,
            Err(ClusterError::Unreachable(_))
        ));
        assert!(cluster.probe_status(&dev).await.is_err());

        cluster.set_unreachable("1", false).await;
        assert!(cluster.probe_status(&dev).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_requires_existing_resource() {
        let cluster = MemoryCluster::new();
        let dev = env("1");
        let result = cluster
            .apply_resource(&dev, ResourceKind::Connector, "sink", &json!({}), RequestOperation::Update)
            .await;
        assert!(matches!(result, Err(ClusterError::NotFound(_))));
    }
}
