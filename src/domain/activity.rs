//! Activity log entries

use crate::domain::tenant::{ResourceKind, TeamId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    RequestSubmitted,
    RequestApproved,
    RequestDeclined,
    RequestDeleted,
    InventorySynced,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::RequestSubmitted => "request_submitted",
            ActivityAction::RequestApproved => "request_approved",
            ActivityAction::RequestDeclined => "request_declined",
            ActivityAction::RequestDeleted => "request_deleted",
            ActivityAction::InventorySynced => "inventory_synced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "request_submitted" => Some(ActivityAction::RequestSubmitted),
            "request_approved" => Some(ActivityAction::RequestApproved),
            "request_declined" => Some(ActivityAction::RequestDeclined),
            "request_deleted" => Some(ActivityAction::RequestDeleted),
            "inventory_synced" => Some(ActivityAction::InventorySynced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub environment: String,
    pub kind: ResourceKind,
    pub resource_name: String,
    pub action: ActivityAction,
    pub principal: String,
    pub team_id: TeamId,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        tenant_id: TenantId,
        environment: impl Into<String>,
        kind: ResourceKind,
        resource_name: impl Into<String>,
        action: ActivityAction,
        principal: impl Into<String>,
        team_id: TeamId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            environment: environment.into(),
            kind,
            resource_name: resource_name.into(),
            action,
            principal: principal.into(),
            team_id,
            details: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
