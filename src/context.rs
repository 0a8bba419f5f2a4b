//! Request-scoped caller context
//!
//! Built once per inbound request from the bearer token and the directory, then
//! passed explicitly into every engine call.

use crate::auth::Permission;
use crate::domain::{TeamId, TenantId};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub tenant_id: TenantId,
    pub principal: String,
    pub team_id: TeamId,
    pub permissions: HashSet<Permission>,
    /// Environment ids this principal may act on
    pub permitted_envs: HashSet<String>,
}

impl RequestContext {
    pub fn new(tenant_id: TenantId, principal: impl Into<String>, team_id: TeamId) -> Self {
        Self {
            tenant_id,
            principal: principal.into(),
            team_id,
            permissions: HashSet::new(),
            permitted_envs: HashSet::new(),
        }
    }

    pub fn with_permissions(mut self, permissions: impl IntoIterator<Item = Permission>) -> Self {
        self.permissions.extend(permissions);
        self
    }

    pub fn with_envs<S: Into<String>>(mut self, envs: impl IntoIterator<Item = S>) -> Self {
        self.permitted_envs.extend(envs.into_iter().map(Into::into));
        self
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    pub fn can_access_env(&self, env_id: &str) -> bool {
        self.permitted_envs.contains(env_id)
    }
}
