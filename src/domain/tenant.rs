//! Tenant, team and environment records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type TenantId = i32;
pub type TeamId = i32;

/// The three governed resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Topic,
    Acl,
    Connector,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Topic => "topic",
            ResourceKind::Acl => "acl",
            ResourceKind::Connector => "connector",
        }
    }

    /// Which kind of cluster hosts this resource
    pub fn cluster_kind(&self) -> ClusterKind {
        match self {
            ResourceKind::Topic | ResourceKind::Acl => ClusterKind::Kafka,
            ResourceKind::Connector => ClusterKind::KafkaConnect,
        }
    }

    /// Counter used for change request ids
    pub fn request_counter(&self) -> &'static str {
        match self {
            ResourceKind::Topic => "TOPIC_REQ_ID",
            ResourceKind::Acl => "ACL_REQ_ID",
            ResourceKind::Connector => "CONNECTOR_REQ_ID",
        }
    }

    /// Counter used for inventory ids
    pub fn inventory_counter(&self) -> &'static str {
        match self {
            ResourceKind::Topic => "TOPIC_ID",
            ResourceKind::Acl => "ACL_ID",
            ResourceKind::Connector => "CONNECTOR_ID",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    /// Accepts both the singular form and the plural used in route paths
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "topic" | "topics" => Ok(ResourceKind::Topic),
            "acl" | "acls" => Ok(ResourceKind::Acl),
            "connector" | "connectors" => Ok(ResourceKind::Connector),
            other => Err(format!("Unknown resource kind '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterKind {
    Kafka,
    KafkaConnect,
}

/// A team, always scoped to exactly one tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub tenant_id: TenantId,
    /// Environments members of this team may request changes in
    #[serde(default)]
    pub environments: Vec<String>,
}

/// Which physical cluster services an environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterBinding {
    pub cluster_id: i32,
    pub cluster_name: String,
    pub bootstrap_servers: String,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "PLAINTEXT".to_string()
}

impl ClusterBinding {
    /// Identifier the cluster api uses to key its client cache
    pub fn identification(&self) -> String {
        format!("{}{}", self.cluster_name, self.cluster_id)
    }
}

/// Limits and naming rules an environment imposes on topic requests
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentParams {
    pub max_partitions: Option<u32>,
    pub default_partitions: Option<u32>,
    pub max_replication_factor: Option<u32>,
    pub default_replication_factor: Option<u32>,
    #[serde(default)]
    pub topic_prefix: Vec<String>,
    #[serde(default)]
    pub topic_suffix: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: String,
    pub name: String,
    pub tenant_id: TenantId,
    pub kind: ClusterKind,
    pub cluster: ClusterBinding,
    #[serde(default)]
    pub params: EnvironmentParams,
}

/// Per-tenant settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: TenantId,
    /// Comma separated environment ids, e.g. "1,2,3"
    #[serde(default)]
    pub order_of_envs: String,
    #[serde(default)]
    pub order_of_connect_envs: String,
    pub base_sync_env: Option<String>,
    pub base_sync_connect_env: Option<String>,
}

impl TenantConfig {
    pub fn promotion_order(&self, kind: ClusterKind) -> &str {
        match kind {
            ClusterKind::Kafka => &self.order_of_envs,
            ClusterKind::KafkaConnect => &self.order_of_connect_envs,
        }
    }

    /// The authoritative environment when a name exists in several environments
    pub fn base_env(&self, kind: ClusterKind) -> Option<&str> {
        match kind {
            ClusterKind::Kafka => self.base_sync_env.as_deref(),
            ClusterKind::KafkaConnect => self.base_sync_connect_env.as_deref(),
        }
    }
}
