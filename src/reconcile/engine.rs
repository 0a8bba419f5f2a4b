//! Reconciliation engine
//!
//! Read paths comparing the managed inventory with the live cluster. Nothing
//! is cached: every call re-reads the store and the cluster.

use crate::auth::Permission;
use crate::cluster::{ClusterAgent, ClusterHealth};
use crate::context::RequestContext;
use crate::domain::{Environment, InventoryEntry, InventoryId, ResourceKind, TeamId};
use crate::error::{ApiResult, AppError};
use crate::ownership::OwnershipRegistry;
use crate::paging::{paginate, Page, PageQuery};
use crate::reconcile::merge::{merge, Remark};
use crate::store::InventoryStore;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// A managed entry as shown to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    pub id: InventoryId,
    pub name: String,
    pub environment_id: String,
    pub environment_name: String,
    pub team_name: String,
    pub description: String,
    pub exists_on_cluster: bool,
}

/// One row of the reconcile listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledView {
    pub sequence: usize,
    pub name: String,
    pub environment_id: String,
    pub environment_name: String,
    /// Empty for names not yet managed
    pub team_name: String,
    pub remarks: Remark,
    pub possible_teams: Vec<String>,
}

#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn InventoryStore>,
    cluster: Arc<dyn ClusterAgent>,
    registry: OwnershipRegistry,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        cluster: Arc<dyn ClusterAgent>,
        registry: OwnershipRegistry,
    ) -> Self {
        Self {
            store,
            cluster,
            registry,
        }
    }

    /// Team ids to names, failing on any id outside the caller's tenant
    fn team_names(
        &self,
        ctx: &RequestContext,
        ids: impl IntoIterator<Item = TeamId>,
    ) -> ApiResult<HashMap<TeamId, String>> {
        let mut names = HashMap::new();
        for id in ids {
            if !names.contains_key(&id) {
                names.insert(id, self.registry.team_name(ctx.tenant_id, id)?);
            }
        }
        Ok(names)
    }

    fn view(
        &self,
        env: &Environment,
        entry: &InventoryEntry,
        teams: &HashMap<TeamId, String>,
        exists_on_cluster: bool,
    ) -> InventoryView {
        InventoryView {
            id: entry.id,
            name: entry.name.clone(),
            environment_id: env.id.clone(),
            environment_name: env.name.clone(),
            team_name: teams.get(&entry.team_id).cloned().unwrap_or_default(),
            description: entry.description.clone(),
            exists_on_cluster,
        }
    }

    pub async fn list_managed(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        env_id: &str,
        search: Option<&str>,
        page: &PageQuery,
    ) -> ApiResult<Page<InventoryView>> {
        let env = self.registry.require_env(ctx, kind, env_id)?;

        let entries: Vec<_> = self
            .store
            .get_inventory(ctx.tenant_id, kind, &env.id)
            .await?
            .into_iter()
            .filter(|e| search.map_or(true, |s| e.name.contains(s)))
            .collect();

        // the live listing decides; the stored flag only covers an unreachable cluster
        let live: Option<HashSet<String>> = match self.cluster.list_resources(&env, kind).await {
            Ok(names) => Some(names.into_iter().collect()),
            Err(e) => {
                warn!("Listing {} on {} failed, showing stored cluster state: {}", kind, env.name, e);
                None
            }
        };

        let teams = self.team_names(ctx, entries.iter().map(|e| e.team_id))?;
        let views = entries
            .iter()
            .map(|e| {
                let exists = live.as_ref().map_or(e.exists_on_cluster, |live| live.contains(&e.name));
                self.view(&env, e, &teams, exists)
            })
            .collect();

        Ok(paginate(views, page.request(), page.current()))
    }

    pub async fn list_live(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        env_id: &str,
    ) -> ApiResult<Vec<String>> {
        let env = self.registry.require_env(ctx, kind, env_id)?;
        let mut names = self.cluster.list_resources(&env, kind).await?;
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub async fn reconcile(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        env_id: &str,
        search: Option<&str>,
        page: &PageQuery,
    ) -> ApiResult<Page<ReconciledView>> {
        let env = self.registry.require_env(ctx, kind, env_id)?;
        let managed = self.store.get_inventory(ctx.tenant_id, kind, &env.id).await?;

        let live = match self.cluster.list_resources(&env, kind).await {
            Ok(live) => live,
            Err(e) => {
                error!("Listing {} on {} failed, returning empty view: {}", kind, env.name, e);
                return Ok(Page::empty());
            }
        };

        let teams = self.team_names(ctx, managed.iter().map(|e| e.team_id))?;
        let possible_teams: Vec<String> = if self.registry.is_authorized(ctx, Permission::sync(kind)) {
            self.registry
                .teams(ctx.tenant_id)
                .into_iter()
                .map(|t| t.name)
                .collect()
        } else {
            Vec::new()
        };

        let rows: Vec<_> = merge(&managed, &live, search)
            .into_iter()
            .map(|row| ReconciledView {
                sequence: row.sequence,
                name: row.name,
                environment_id: env.id.clone(),
                environment_name: env.name.clone(),
                team_name: row
                    .team_id
                    .and_then(|id| teams.get(&id).cloned())
                    .unwrap_or_default(),
                remarks: row.remark,
                possible_teams: possible_teams.clone(),
            })
            .collect();

        info!(
            "Reconciled {} inventory on {} for tenant {}: {} row(s)",
            kind,
            env.name,
            ctx.tenant_id,
            rows.len()
        );
        Ok(paginate(rows, page.request(), page.current()))
    }

    /// Live configuration of one resource, pretty printed
    pub async fn resource_details(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        env_id: &str,
        name: &str,
    ) -> ApiResult<String> {
        let env = self.registry.require_env(ctx, kind, env_id)?;
        let config = self.cluster.get_resource_config(&env, kind, name).await?;
        serde_json::to_string_pretty(&config)
            .map_err(|e| AppError::Internal(format!("Failed to render config of '{}': {}", name, e)))
    }

    /// Reachability of the environment's cluster; failures report offline
    pub async fn cluster_status(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        env_id: &str,
    ) -> ApiResult<ClusterHealth> {
        let env = self.registry.require_env(ctx, kind, env_id)?;
        match self.cluster.probe_status(&env).await {
            Ok(health) => Ok(health),
            Err(e) => {
                warn!("Cluster {} is offline: {}", env.cluster.identification(), e);
                Ok(ClusterHealth::offline(&env, e.to_string()))
            }
        }
    }
}
