//! Managed inventory ("source of truth") records

use crate::domain::tenant::{ResourceKind, TeamId, TenantId};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type InventoryId = i32;

/// How an entry came to be managed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Adopted from the live cluster by a bulk sync
    Synced,
    /// Created through an approved change request
    Requested,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Synced => "synced",
            Provenance::Requested => "requested",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "synced" => Some(Provenance::Synced),
            "requested" => Some(Provenance::Requested),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Provenance::Synced => "Synced from cluster",
            Provenance::Requested => "Created through approved request",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
    pub id: InventoryId,
    pub tenant_id: TenantId,
    pub kind: ResourceKind,
    pub name: String,
    pub environment: String,
    pub team_id: TeamId,
    pub config: Option<serde_json::Value>,
    pub config_checksum: Option<String>,
    /// Whether the resource was last known to exist on the live cluster
    pub exists_on_cluster: bool,
    pub provenance: Provenance,
    pub description: String,
    /// Optimistic concurrency token; 0 means "not yet stored"
    pub version: i64,
}

impl InventoryEntry {
    pub fn new(
        id: InventoryId,
        tenant_id: TenantId,
        kind: ResourceKind,
        name: impl Into<String>,
        environment: impl Into<String>,
        team_id: TeamId,
        provenance: Provenance,
    ) -> Self {
        Self {
            id,
            tenant_id,
            kind,
            name: name.into(),
            environment: environment.into(),
            team_id,
            config: None,
            config_checksum: None,
            exists_on_cluster: true,
            provenance,
            description: provenance.description().to_string(),
            version: 0,
        }
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.set_config(config);
        self
    }

    pub fn set_config(&mut self, config: serde_json::Value) {
        self.config_checksum = Some(config_checksum(&config));
        self.config = Some(config);
    }
}

/// SHA-256 over the canonical JSON rendering of a config
pub fn config_checksum(config: &serde_json::Value) -> String {
    let canonical = serde_json::to_string(config).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checksum_detects_config_change() {
        let entry = InventoryEntry::new(1, 101, ResourceKind::Connector, "sink", "7", 3, Provenance::Synced)
            .with_config(json!({"connector.class": "FileSink", "tasks.max": "1"}));

        let same = json!({"connector.class": "FileSink", "tasks.max": "1"});
        let changed = json!({"connector.class": "FileSink", "tasks.max": "2"});
        assert_eq!(entry.config_checksum, Some(config_checksum(&same)));
        assert_ne!(entry.config_checksum, Some(config_checksum(&changed)));
    }

    #[test]
    fn test_new_entry_is_unversioned() {
        let entry = InventoryEntry::new(5, 101, ResourceKind::Topic, "orders", "1", 3, Provenance::Requested);
        assert_eq!(entry.version, 0);
        assert_eq!(entry.description, "Created through approved request");
        assert!(entry.config_checksum.is_none());
    }
}
