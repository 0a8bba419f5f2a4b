//! Change request models
//!
//! A change request is the unit of the approval workflow: somebody asks for a
//! topic, ACL or connector to be created, updated or removed in one
//! environment, and an approver decides on it exactly once.

use crate::domain::tenant::{ResourceKind, TeamId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

pub type RequestId = i32;

/// Request status in the approval workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Waiting for a decision
    Created,
    Approved,
    Declined,
    /// Withdrawn by the requester before a decision
    Deleted,
}

impl Default for RequestStatus {
    fn default() -> Self {
        RequestStatus::Created
    }
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Created => "CREATED",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Declined => "DECLINED",
            RequestStatus::Deleted => "DELETED",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATED" => Ok(RequestStatus::Created),
            "APPROVED" => Ok(RequestStatus::Approved),
            "DECLINED" => Ok(RequestStatus::Declined),
            "DELETED" => Ok(RequestStatus::Deleted),
            other => Err(format!("Unknown request status '{}'", other)),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestOperation {
    Create,
    Update,
    Delete,
}

impl RequestOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestOperation::Create => "CREATE",
            RequestOperation::Update => "UPDATE",
            RequestOperation::Delete => "DELETE",
        }
    }
}

impl FromStr for RequestOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CREATE" => Ok(RequestOperation::Create),
            "UPDATE" => Ok(RequestOperation::Update),
            "DELETE" => Ok(RequestOperation::Delete),
            other => Err(format!("Unknown request operation '{}'", other)),
        }
    }
}

impl fmt::Display for RequestOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topic settings carried by a topic request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TopicSpec {
    #[validate(range(min = 1, message = "Partitions must be at least 1"))]
    pub partitions: u32,
    #[validate(range(min = 1, message = "Replication factor must be at least 1"))]
    pub replication_factor: u32,
    #[serde(default)]
    pub advanced_config: BTreeMap<String, String>,
    #[validate(length(min = 1, message = "Description can not be empty"))]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclType {
    Producer,
    Consumer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AclPatternType {
    Literal,
    Prefixed,
}

impl Default for AclPatternType {
    fn default() -> Self {
        AclPatternType::Literal
    }
}

/// Access control entry request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AclSpec {
    pub acl_type: AclType,
    #[validate(length(min = 1, max = 255, message = "Topic name can not be empty"))]
    pub topic: String,
    #[validate(length(min = 1, message = "At least one principal is required"))]
    pub principals: Vec<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
    pub consumer_group: Option<String>,
    #[serde(default)]
    pub pattern_type: AclPatternType,
}

impl AclSpec {
    /// Canonical name of the ACL, the same form the cluster lists them in
    pub fn resource_key(&self) -> String {
        let kind = match self.acl_type {
            AclType::Producer => "PRODUCER",
            AclType::Consumer => "CONSUMER",
        };
        let mut principals = self.principals.clone();
        principals.sort();
        format!("{}:{}:{}", kind, self.topic, principals.join(","))
    }
}

/// Connector configuration, kept as structured JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorSpec {
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RequestPayload {
    Topic(TopicSpec),
    Acl(AclSpec),
    Connector(ConnectorSpec),
}

impl RequestPayload {
    pub fn kind(&self) -> ResourceKind {
        match self {
            RequestPayload::Topic(_) => ResourceKind::Topic,
            RequestPayload::Acl(_) => ResourceKind::Acl,
            RequestPayload::Connector(_) => ResourceKind::Connector,
        }
    }

    /// Config handed to the cluster agent on apply
    pub fn to_config(&self) -> serde_json::Value {
        match self {
            RequestPayload::Topic(spec) => serde_json::to_value(spec).unwrap_or_default(),
            RequestPayload::Acl(spec) => serde_json::to_value(spec).unwrap_or_default(),
            RequestPayload::Connector(spec) => spec.config.clone(),
        }
    }
}

/// Who decided on a request, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub approver: String,
    pub reason: Option<String>,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: RequestId,
    pub tenant_id: TenantId,
    pub kind: ResourceKind,
    pub resource_name: String,
    pub environment: String,
    pub team_id: TeamId,
    pub operation: RequestOperation,
    pub status: RequestStatus,
    pub payload: Option<RequestPayload>,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub remarks: Option<String>,
    pub decision: Option<Decision>,
}

impl ChangeRequest {
    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Created
    }

    pub fn approve(&mut self, approver: &str) {
        self.status = RequestStatus::Approved;
        self.decision = Some(Decision {
            approver: approver.to_string(),
            reason: None,
            decided_at: Utc::now(),
        });
    }

    pub fn decline(&mut self, approver: &str, reason: String) {
        self.status = RequestStatus::Declined;
        self.decision = Some(Decision {
            approver: approver.to_string(),
            reason: Some(reason),
            decided_at: Utc::now(),
        });
    }
}

/// Input to `submit`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChangeRequest {
    /// Ignored for ACLs; their name is derived from the ACL payload
    #[serde(default)]
    pub resource_name: String,
    pub environment: String,
    pub operation: RequestOperation,
    pub payload: Option<RequestPayload>,
    #[serde(default)]
    pub remarks: Option<String>,
}

/// Approver's verdict
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    Approve,
    Decline { reason: String },
}

/// Filters for listing requests
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    pub status: Option<RequestStatus>,
    pub environment: Option<String>,
    pub requested_by: Option<String>,
    pub resource_name: Option<String>,
}

impl RequestFilter {
    pub fn matches(&self, request: &ChangeRequest) -> bool {
        self.status.map_or(true, |s| request.status == s)
            && self
                .environment
                .as_ref()
                .map_or(true, |e| &request.environment == e)
            && self
                .requested_by
                .as_ref()
                .map_or(true, |u| &request.requested_by == u)
            && self
                .resource_name
                .as_ref()
                .map_or(true, |n| &request.resource_name == n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acl_resource_key_is_order_independent() {
        let a = AclSpec {
            acl_type: AclType::Consumer,
            topic: "orders".into(),
            principals: vec!["CN=b".into(), "CN=a".into()],
            hosts: vec![],
            consumer_group: Some("billing".into()),
            pattern_type: AclPatternType::Literal,
        };
        let mut b = a.clone();
        b.principals.reverse();

        assert_eq!(a.resource_key(), "CONSUMER:orders:CN=a,CN=b");
        assert_eq!(a.resource_key(), b.resource_key());
    }

    #[test]
    fn test_outcome_deserializes_tagged() {
        let approve: Outcome = serde_json::from_str(r#"{"outcome":"approve"}"#).unwrap();
        assert_eq!(approve, Outcome::Approve);

        let decline: Outcome =
            serde_json::from_str(r#"{"outcome":"decline","reason":"wrong env"}"#).unwrap();
        assert_eq!(decline, Outcome::Decline { reason: "wrong env".into() });
    }

    #[test]
    fn test_status_round_trips_through_text_column() {
        for status in [
            RequestStatus::Created,
            RequestStatus::Approved,
            RequestStatus::Declined,
            RequestStatus::Deleted,
        ] {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
    }
}
