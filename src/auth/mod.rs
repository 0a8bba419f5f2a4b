//! Authentication and authorization module
//!
//! Bearer JWTs identify the principal; the directory supplies what that
//! principal may do. Permissions are checked per operation by the engines.

mod jwt;
mod middleware;

pub use jwt::{create_token, decode_token, Claims};
pub use middleware::auth_middleware;

use crate::domain::ResourceKind;
use serde::{Deserialize, Serialize};

/// Fine-grained permissions held by a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    RequestCreateTopics,
    RequestCreateAcls,
    RequestCreateConnectors,
    ApproveTopics,
    ApproveAcls,
    ApproveConnectors,
    SyncTopics,
    SyncAcls,
    SyncConnectors,
}

impl Permission {
    pub fn request(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Topic => Permission::RequestCreateTopics,
            ResourceKind::Acl => Permission::RequestCreateAcls,
            ResourceKind::Connector => Permission::RequestCreateConnectors,
        }
    }

    pub fn approve(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Topic => Permission::ApproveTopics,
            ResourceKind::Acl => Permission::ApproveAcls,
            ResourceKind::Connector => Permission::ApproveConnectors,
        }
    }

    pub fn sync(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Topic => Permission::SyncTopics,
            ResourceKind::Acl => Permission::SyncAcls,
            ResourceKind::Connector => Permission::SyncConnectors,
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Permission::RequestCreateTopics => "REQUEST_CREATE_TOPICS",
            Permission::RequestCreateAcls => "REQUEST_CREATE_ACLS",
            Permission::RequestCreateConnectors => "REQUEST_CREATE_CONNECTORS",
            Permission::ApproveTopics => "APPROVE_TOPICS",
            Permission::ApproveAcls => "APPROVE_ACLS",
            Permission::ApproveConnectors => "APPROVE_CONNECTORS",
            Permission::SyncTopics => "SYNC_TOPICS",
            Permission::SyncAcls => "SYNC_ACLS",
            Permission::SyncConnectors => "SYNC_CONNECTORS",
        };
        f.write_str(name)
    }
}
