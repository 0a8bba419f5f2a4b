//! Tenant directory
//!
//! The ownership/auth collaborator: maps principals to their tenant, team and
//! permissions, and holds each tenant's teams, environments and settings.

mod file;

pub use file::{DirectoryFile, Principal, StaticDirectory, TenantRecord};

use crate::context::RequestContext;
use crate::domain::{ClusterKind, Environment, Team, TenantConfig, TenantId};

pub trait TenantDirectory: Send + Sync {
    fn principal(&self, username: &str) -> Option<Principal>;

    fn teams(&self, tenant_id: TenantId) -> Vec<Team>;

    fn environments(&self, tenant_id: TenantId, kind: ClusterKind) -> Vec<Environment>;

    fn tenant_config(&self, tenant_id: TenantId) -> Option<TenantConfig>;

    /// Build the request context for an authenticated principal
    fn resolve_context(&self, username: &str) -> Option<RequestContext> {
        let principal = self.principal(username)?;
        let team = self
            .teams(principal.tenant_id)
            .into_iter()
            .find(|t| t.id == principal.team_id)?;

        Some(
            RequestContext::new(principal.tenant_id, principal.username, team.id)
                .with_permissions(principal.permissions)
                .with_envs(team.environments),
        )
    }
}
