//! Ownership registry
//!
//! Tenant-scoped permission, team and environment checks over the directory.

use crate::auth::Permission;
use crate::context::RequestContext;
use crate::directory::TenantDirectory;
use crate::domain::{Environment, ResourceKind, Team, TeamId, TenantConfig, TenantId};
use crate::error::{ApiResult, AppError};
use crate::ownership::PromotionOrder;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct OwnershipRegistry {
    directory: Arc<dyn TenantDirectory>,
}

impl OwnershipRegistry {
    pub fn new(directory: Arc<dyn TenantDirectory>) -> Self {
        Self { directory }
    }

    pub fn is_authorized(&self, ctx: &RequestContext, permission: Permission) -> bool {
        ctx.has_permission(permission)
    }

    /// Fail with the uniform `NotAuthorized` when the permission is missing
    pub fn require(&self, ctx: &RequestContext, permission: Permission) -> ApiResult<()> {
        if self.is_authorized(ctx, permission) {
            Ok(())
        } else {
            debug!("{} lacks {}", ctx.principal, permission);
            Err(AppError::NotAuthorized)
        }
    }

    /// Whether the team called `acting_team_name` is the owner `owner_team_id`
    pub fn team_owns(&self, tenant_id: TenantId, owner_team_id: TeamId, acting_team_name: &str) -> bool {
        self.team_id_for_name(tenant_id, acting_team_name) == Some(owner_team_id)
    }

    pub fn team_id_for_name(&self, tenant_id: TenantId, name: &str) -> Option<TeamId> {
        self.directory
            .teams(tenant_id)
            .into_iter()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    pub fn teams(&self, tenant_id: TenantId) -> Vec<Team> {
        self.directory.teams(tenant_id)
    }

    /// Resolve a stored team id; a team outside the tenant means corrupt data
    pub fn team_name(&self, tenant_id: TenantId, team_id: TeamId) -> ApiResult<String> {
        self.directory
            .teams(tenant_id)
            .into_iter()
            .find(|t| t.id == team_id)
            .map(|t| t.name)
            .ok_or_else(|| {
                AppError::Inconsistency(format!(
                    "Team {} is not part of tenant {}",
                    team_id, tenant_id
                ))
            })
    }

    pub fn environment(&self, tenant_id: TenantId, kind: ResourceKind, env_id: &str) -> Option<Environment> {
        self.directory
            .environments(tenant_id, kind.cluster_kind())
            .into_iter()
            .find(|e| e.id == env_id)
    }

    /// The environment, provided it exists for the tenant and the caller may use it
    pub fn require_env(&self, ctx: &RequestContext, kind: ResourceKind, env_id: &str) -> ApiResult<Environment> {
        match self.environment(ctx.tenant_id, kind, env_id) {
            Some(env) if ctx.can_access_env(&env.id) => Ok(env),
            _ => {
                debug!("{} may not act on {} environment '{}'", ctx.principal, kind, env_id);
                Err(AppError::NotAuthorized)
            }
        }
    }

    pub fn tenant_config(&self, tenant_id: TenantId) -> ApiResult<TenantConfig> {
        self.directory.tenant_config(tenant_id).ok_or_else(|| {
            AppError::Inconsistency(format!("No configuration for tenant {}", tenant_id))
        })
    }

    pub fn promotion_order(&self, tenant_id: TenantId, kind: ResourceKind) -> ApiResult<PromotionOrder> {
        let config = self.tenant_config(tenant_id)?;
        Ok(PromotionOrder::parse(config.promotion_order(kind.cluster_kind())))
    }

    /// Membership of `env_id` in the tenant's promotion order for the kind
    pub fn is_valid_promotion_step(&self, tenant_id: TenantId, kind: ResourceKind, env_id: &str) -> bool {
        self.promotion_order(tenant_id, kind)
            .map(|order| order.contains(env_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ctx_for, fixture_directory, TENANT, TENANT_B};

    fn registry() -> OwnershipRegistry {
        OwnershipRegistry::new(Arc::new(fixture_directory()))
    }

    #[test]
    fn test_team_owns_resolves_through_team_table() {
        let registry = registry();
        assert!(registry.team_owns(TENANT, 1, "Octopus"));
        assert!(!registry.team_owns(TENANT, 1, "Seahorses"));
        assert!(!registry.team_owns(TENANT, 1, "Unknown"));
    }

    #[test]
    fn test_team_from_other_tenant_is_inconsistency() {
        let registry = registry();
        let foreign = registry.teams(TENANT_B)[0].id;
        assert!(matches!(
            registry.team_name(TENANT, foreign),
            Err(AppError::Inconsistency(_))
        ));
    }

    #[test]
    fn test_require_env_is_uniform_for_missing_and_forbidden() {
        let registry = registry();
        let ctx = ctx_for("alice");

        assert!(registry.require_env(&ctx, ResourceKind::Topic, "1").is_ok());
        // exists but the team has no access
        assert!(matches!(
            registry.require_env(&ctx, ResourceKind::Topic, "3"),
            Err(AppError::NotAuthorized)
        ));
        // does not exist
        assert!(matches!(
            registry.require_env(&ctx, ResourceKind::Topic, "99"),
            Err(AppError::NotAuthorized)
        ));
        // other tenant's environment
        assert!(matches!(
            registry.require_env(&ctx, ResourceKind::Topic, "50"),
            Err(AppError::NotAuthorized)
        ));
    }

    #[test]
    fn test_promotion_step_membership() {
        let registry = registry();
        assert!(registry.is_valid_promotion_step(TENANT, ResourceKind::Topic, "2"));
        assert!(!registry.is_valid_promotion_step(TENANT, ResourceKind::Topic, "3"));
        assert!(registry.is_valid_promotion_step(TENANT, ResourceKind::Connector, "8"));
    }

    #[test]
    fn test_require_permission() {
        let registry = registry();
        let alice = ctx_for("alice");
        assert!(registry.require(&alice, Permission::RequestCreateTopics).is_ok());
        assert!(matches!(
            registry.require(&alice, Permission::SyncTopics),
            Err(AppError::NotAuthorized)
        ));
    }
}
