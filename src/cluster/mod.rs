//! Cluster agent
//!
//! Narrow interface to the live clusters. Mutations are treated as
//! caller-idempotent: applying the same change twice leaves the cluster in the
//! same state.

mod http;
mod memory;

pub use http::HttpClusterAgent;
pub use memory::MemoryCluster;

use crate::domain::{Environment, RequestOperation, ResourceKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("Cluster unreachable: {0}")]
    Unreachable(String),

    #[error("Cluster rejected credentials: {0}")]
    Auth(String),

    #[error("Not found on cluster: {0}")]
    NotFound(String),

    #[error("Cluster conflict: {0}")]
    Conflict(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterHealth {
    pub environment: String,
    pub cluster: String,
    pub status: ClusterStatus,
    pub checked_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ClusterHealth {
    pub fn online(env: &Environment) -> Self {
        Self {
            environment: env.id.clone(),
            cluster: env.cluster.identification(),
            status: ClusterStatus::Online,
            checked_at: Utc::now(),
            detail: None,
        }
    }

    pub fn offline(env: &Environment, detail: impl Into<String>) -> Self {
        Self {
            status: ClusterStatus::Offline,
            detail: Some(detail.into()),
            ..Self::online(env)
        }
    }
}

#[async_trait]
pub trait ClusterAgent: Send + Sync {
    /// Names of every resource of `kind` on the environment's cluster
    async fn list_resources(
        &self,
        env: &Environment,
        kind: ResourceKind,
    ) -> Result<Vec<String>, ClusterError>;

    async fn get_resource_config(
        &self,
        env: &Environment,
        kind: ResourceKind,
        name: &str,
    ) -> Result<serde_json::Value, ClusterError>;

    async fn apply_resource(
        &self,
        env: &Environment,
        kind: ResourceKind,
        name: &str,
        config: &serde_json::Value,
        operation: RequestOperation,
    ) -> Result<(), ClusterError>;

    async fn probe_status(&self, env: &Environment) -> Result<ClusterHealth, ClusterError>;
}
