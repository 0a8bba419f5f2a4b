//! Bulk sync
//!
//! Adopts live resources into the inventory, moves ownership, and removes
//! stale entries. Every update in a batch is classified once and the whole
//! batch is committed by the store in one step, or not at all.

use crate::auth::Permission;
use crate::context::RequestContext;
use crate::domain::{
    ActivityAction, ActivityEntry, Environment, InventoryEntry, InventoryId, Provenance,
    ResourceKind, TeamId,
};
use crate::error::{conflict_error, validation_error, ApiResult, AppError};
use crate::lifecycle::engine::{config_fetch_error, RequestLifecycleEngine};
use crate::reconcile::merge::{merge, MergedRow, Remark};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// Team selection value asking for the entry to be dropped
pub const REMOVE_FROM_INVENTORY: &str = "REMOVE FROM INVENTORY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TeamSelection {
    Team(String),
    Remove,
}

impl From<String> for TeamSelection {
    fn from(value: String) -> Self {
        if value == REMOVE_FROM_INVENTORY {
            TeamSelection::Remove
        } else {
            TeamSelection::Team(value)
        }
    }
}

impl From<TeamSelection> for String {
    fn from(value: TeamSelection) -> Self {
        match value {
            TeamSelection::Team(name) => name,
            TeamSelection::Remove => REMOVE_FROM_INVENTORY.to_string(),
        }
    }
}

/// One row of a sync submission, echoing what the reconcile view showed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncUpdate {
    pub sequence: usize,
    pub resource_name: String,
    pub environment: String,
    pub team_selected: TeamSelection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncBatch {
    /// Search filter the reconcile view was rendered with
    #[serde(default)]
    pub search: Option<String>,
    pub updates: Vec<SyncUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Unchanged,
    NewEntry,
    OwnershipChanged,
    ToDelete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub success: bool,
    pub message: String,
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
}

impl SyncSummary {
    fn tally(&mut self, classification: Classification) {
        match classification {
            Classification::Unchanged => self.unchanged += 1,
            Classification::NewEntry => self.added += 1,
            Classification::OwnershipChanged => self.updated += 1,
            Classification::ToDelete => self.removed += 1,
        }
    }
}

/// Entries written by this batch, keyed by (name, environment)
type Staged = BTreeMap<(String, String), InventoryEntry>;

fn stage(staged: &mut Staged, entry: InventoryEntry) {
    staged.insert((entry.name.clone(), entry.environment.clone()), entry);
}

/// A team assignment row with its team resolved
struct Assignment<'a> {
    name: &'a str,
    env_id: &'a str,
    team_name: &'a str,
    team_id: TeamId,
}

impl RequestLifecycleEngine {
    /// Resolves the assignment rows of a batch, base environment rows first.
    ///
    /// A name may only be handed to one team per batch.
    fn assignments<'a>(
        &self,
        ctx: &RequestContext,
        batch: &'a SyncBatch,
        base_env: Option<&str>,
    ) -> ApiResult<Vec<Assignment<'a>>> {
        let mut selected: HashMap<&str, &str> = HashMap::new();
        let mut assignments = Vec::new();

        for update in &batch.updates {
            let team_name = match &update.team_selected {
                TeamSelection::Team(name) => name.as_str(),
                TeamSelection::Remove => continue,
            };
            let team_id = self
                .registry
                .team_id_for_name(ctx.tenant_id, team_name)
                .ok_or_else(|| validation_error(format!("Team '{}' does not exist", team_name)))?;
            let name = update.resource_name.trim();

            if let Some(previous) = selected.insert(name, team_name) {
                if previous != team_name {
                    return Err(validation_error(format!(
                        "'{}' is assigned to both {} and {} in one batch",
                        name, previous, team_name
                    )));
                }
            }
            assignments.push(Assignment {
                name,
                env_id: update.environment.as_str(),
                team_name,
                team_id,
            });
        }

        assignments.sort_by_key(|a| Some(a.env_id) != base_env);
        Ok(assignments)
    }

    /// The reconcile rows for one environment, rebuilt from fresh state
    async fn sync_view(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        env: &Environment,
        search: Option<&str>,
    ) -> ApiResult<(Vec<MergedRow>, Vec<InventoryEntry>)> {
        let managed = self.store.get_inventory(ctx.tenant_id, kind, &env.id).await?;
        let live = self.cluster.list_resources(env, kind).await?;
        Ok((merge(&managed, &live, search), managed))
    }

    pub async fn apply_sync(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        batch: SyncBatch,
    ) -> ApiResult<SyncSummary> {
        self.registry.require(ctx, Permission::sync(kind))?;

        let mut envs: HashMap<String, Environment> = HashMap::new();
        for update in &batch.updates {
            if !envs.contains_key(&update.environment) {
                let env = self.registry.require_env(ctx, kind, &update.environment)?;
                envs.insert(env.id.clone(), env);
            }
        }

        let tenant_config = self.registry.tenant_config(ctx.tenant_id)?;
        let base_env = tenant_config.base_env(kind.cluster_kind()).map(String::from);

        let mut summary = SyncSummary::default();
        let mut removals: Vec<InventoryEntry> = Vec::new();
        let mut removed_ids: HashSet<InventoryId> = HashSet::new();
        let mut views: HashMap<String, (Vec<MergedRow>, Vec<InventoryEntry>)> = HashMap::new();

        // deletes first, whatever their position in the batch
        for update in batch.updates.iter().filter(|u| u.team_selected == TeamSelection::Remove) {
            let env = &envs[&update.environment];
            if !views.contains_key(&env.id) {
                let view = self.sync_view(ctx, kind, env, batch.search.as_deref()).await?;
                views.insert(env.id.clone(), view);
            }
            let (rows, managed) = &views[&env.id];

            let row = rows
                .get(update.sequence)
                .filter(|row| row.name == update.resource_name.trim())
                .ok_or_else(|| {
                    conflict_error(format!(
                        "Row {} of {} no longer shows '{}'; reload and retry",
                        update.sequence, env.name, update.resource_name
                    ))
                })?;
            if row.remark == Remark::Added {
                return Err(validation_error(format!(
                    "'{}' is not managed in {} and can not be removed",
                    row.name, env.name
                )));
            }
            let entry = managed.iter().find(|e| e.name == row.name).ok_or_else(|| {
                AppError::Inconsistency(format!("'{}' vanished from the {} inventory", row.name, env.name))
            })?;

            if removed_ids.insert(entry.id) {
                removals.push(entry.clone());
                summary.tally(Classification::ToDelete);
            }
        }

        let assignments = self.assignments(ctx, &batch, base_env.as_deref())?;
        let mut staged = Staged::new();
        let mut not_in_base: Vec<String> = Vec::new();
        let mut team_conflicts: Vec<String> = Vec::new();

        for assignment in &assignments {
            let env = &envs[assignment.env_id];
            let name = assignment.name;
            let team_id = assignment.team_id;

            let persisted: Vec<InventoryEntry> = self
                .store
                .find_inventory_by_name(ctx.tenant_id, kind, name)
                .await?
                .into_iter()
                .filter(|e| !removed_ids.contains(&e.id))
                .collect();

            // base rows run first, so the base entry here is final for the batch
            if let Some(base) = base_env.as_ref().filter(|base| **base != env.id) {
                let base_entry = staged
                    .get(&(name.to_string(), base.clone()))
                    .or_else(|| persisted.iter().find(|e| &e.environment == base));
                match base_entry {
                    Some(owned) if !self.registry.team_owns(ctx.tenant_id, owned.team_id, assignment.team_name) => {
                        let owner = self.registry.team_name(ctx.tenant_id, owned.team_id)?;
                        team_conflicts.push(format!("{} (owned by {})", name, owner));
                        continue;
                    }
                    None if persisted.is_empty()
                        && self.registry.is_valid_promotion_step(ctx.tenant_id, kind, &env.id) =>
                    {
                        not_in_base.push(name.to_string());
                        continue;
                    }
                    _ => {}
                }
            }

            // inventory as it will look once this batch is applied so far
            let mut existing: Vec<InventoryEntry> = persisted
                .into_iter()
                .filter(|e| !staged.contains_key(&(e.name.clone(), e.environment.clone())))
                .collect();
            existing.extend(staged.values().filter(|e| e.name == name).cloned());

            let config = self
                .cluster
                .get_resource_config(env, kind, name)
                .await
                .map_err(|e| config_fetch_error(name, e))?;

            let classification = match existing.iter().find(|e| e.environment == env.id) {
                Some(current) if self.registry.team_owns(ctx.tenant_id, current.team_id, assignment.team_name) => {
                    Classification::Unchanged
                }
                Some(current) => {
                    let mut next = current.clone();
                    next.team_id = team_id;
                    next.set_config(config);
                    next.exists_on_cluster = true;
                    stage(&mut staged, next);
                    Classification::OwnershipChanged
                }
                None => {
                    let id = self
                        .store
                        .next_sequence_id(kind.inventory_counter(), ctx.tenant_id)
                        .await?;
                    let entry = InventoryEntry::new(id, ctx.tenant_id, kind, name, &env.id, team_id, Provenance::Synced)
                        .with_config(config);
                    stage(&mut staged, entry);
                    Classification::NewEntry
                }
            };
            debug!("Sync of {} '{}' in {}: {:?}", kind, name, env.name, classification);
            summary.tally(classification);

            for sibling in existing.iter().filter(|e| {
                e.environment != env.id && !self.registry.team_owns(ctx.tenant_id, e.team_id, assignment.team_name)
            }) {
                let mut next = sibling.clone();
                next.team_id = team_id;
                stage(&mut staged, next);
                summary.tally(Classification::OwnershipChanged);
            }
        }

        if !not_in_base.is_empty() {
            return Err(validation_error(format!(
                "Sync failed: {} do(es) not exist in base environment",
                not_in_base.join(", ")
            )));
        }
        if !team_conflicts.is_empty() {
            return Err(conflict_error(format!(
                "Sync failed: already owned by another team in the base environment: {}",
                team_conflicts.join(", ")
            )));
        }

        let upserts: Vec<InventoryEntry> = staged.into_values().collect();
        if removals.is_empty() && upserts.is_empty() {
            return Ok(SyncSummary {
                success: false,
                message: "No records updated".to_string(),
                ..summary
            });
        }

        self.store
            .apply_inventory_changes(ctx.tenant_id, kind, &removals, &upserts)
            .await?;

        info!(
            "{} synced {} inventory for tenant {}: {} added, {} updated, {} removed",
            ctx.principal, kind, ctx.tenant_id, summary.added, summary.updated, summary.removed
        );
        for entry in &removals {
            self.record(
                ActivityEntry::new(ctx.tenant_id, &entry.environment, kind, &entry.name, ActivityAction::InventorySynced, &ctx.principal, ctx.team_id)
                    .with_details("removed from inventory"),
            )
            .await;
        }
        for entry in &upserts {
            let details = match self.registry.team_name(ctx.tenant_id, entry.team_id) {
                Ok(team) => format!("owned by {}", team),
                Err(_) => format!("owned by team {}", entry.team_id),
            };
            self.record(
                ActivityEntry::new(ctx.tenant_id, &entry.environment, kind, &entry.name, ActivityAction::InventorySynced, &ctx.principal, ctx.team_id)
                    .with_details(details),
            )
            .await;
        }

        Ok(SyncSummary {
            success: true,
            message: "success".to_string(),
            ..summary
        })
    }
}
