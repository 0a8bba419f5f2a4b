//! In-memory store
//!
//! Used for local development and as the test double for the engines.

use crate::domain::{
    ActivityEntry, ChangeRequest, InventoryEntry, InventoryId, RequestFilter, RequestId,
    RequestStatus, ResourceKind, TenantId,
};
use crate::error::{conflict_error, not_found_error, validation_error, ApiResult, AppError};
use crate::store::InventoryStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

type RequestKey = (TenantId, ResourceKind, RequestId);
type InventoryKey = (TenantId, ResourceKind, InventoryId);

#[derive(Default)]
struct Tables {
    requests: HashMap<RequestKey, ChangeRequest>,
    inventory: HashMap<InventoryKey, InventoryEntry>,
    counters: HashMap<(String, TenantId), i32>,
    activity: Vec<ActivityEntry>,
}

/// Thread-safe in-memory store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_inventory_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every inventory write fail until switched off again
    pub fn fail_inventory_writes(&self, fail: bool) {
        self.fail_inventory_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> ApiResult<()> {
        if self.fail_inventory_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("Inventory writes are disabled".to_string()));
        }
        Ok(())
    }
}

/// Apply removals then upserts to `inventory`; on error the map is left in an
/// unspecified state, so callers work on a copy
fn apply_changes(
    inventory: &mut HashMap<InventoryKey, InventoryEntry>,
    tenant_id: TenantId,
    kind: ResourceKind,
    removals: &[InventoryEntry],
    upserts: &[InventoryEntry],
) -> ApiResult<Vec<InventoryEntry>> {
    for entry in removals.iter().chain(upserts) {
        if entry.tenant_id != tenant_id || entry.kind != kind {
            return Err(validation_error(format!(
                "Entry '{}' does not belong to tenant {} {} inventory",
                entry.name, tenant_id, kind
            )));
        }
    }

    for entry in removals {
        let key = (tenant_id, kind, entry.id);
        match inventory.get(&key) {
            Some(stored) if stored.version == entry.version => {
                inventory.remove(&key);
            }
            Some(_) => {
                return Err(conflict_error(format!(
                    "'{}' in environment {} was modified concurrently",
                    entry.name, entry.environment
                )))
            }
            None => {
                return Err(conflict_error(format!(
                    "'{}' in environment {} no longer exists",
                    entry.name, entry.environment
                )))
            }
        }
    }

    let mut stored = Vec::with_capacity(upserts.len());
    for entry in upserts {
        let key = (tenant_id, kind, entry.id);
        let duplicate = inventory.values().any(|e| {
            e.tenant_id == tenant_id
                && e.kind == kind
                && e.id != entry.id
                && e.name == entry.name
                && e.environment == entry.environment
        });
        if duplicate {
            return Err(conflict_error(format!(
                "'{}' is already managed in environment {}",
                entry.name, entry.environment
            )));
        }

        let current = inventory.get(&key).map(|e| e.version);
        match (entry.version, current) {
            (0, None) => {}
            (0, Some(_)) => {
                return Err(conflict_error(format!("Inventory id {} is already taken", entry.id)))
            }
            (v, Some(c)) if v == c => {}
            _ => {
                return Err(conflict_error(format!(
                    "'{}' in environment {} was modified concurrently",
                    entry.name, entry.environment
                )))
            }
        }

        let mut next = entry.clone();
        next.version = entry.version + 1;
        inventory.insert(key, next.clone());
        stored.push(next);
    }

    Ok(stored)
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn get_requests(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        filter: &RequestFilter,
    ) -> ApiResult<Vec<ChangeRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<_> = tables
            .requests
            .values()
            .filter(|r| r.tenant_id == tenant_id && r.kind == kind && filter.matches(r))
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.id);
        Ok(requests)
    }

    async fn get_request(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        id: RequestId,
    ) -> ApiResult<Option<ChangeRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.requests.get(&(tenant_id, kind, id)).cloned())
    }

    async fn put_request(
        &self,
        request: &ChangeRequest,
        expected: Option<RequestStatus>,
    ) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        let key = (request.tenant_id, request.kind, request.id);
        let current = tables.requests.get(&key).map(|r| r.status);

        match (expected, current) {
            (None, None) if request.status == RequestStatus::Created => {
                let open = tables.requests.values().any(|r| {
                    r.tenant_id == request.tenant_id
                        && r.kind == request.kind
                        && r.status == RequestStatus::Created
                        && r.resource_name == request.resource_name
                        && r.environment == request.environment
                });
                if open {
                    return Err(conflict_error(format!(
                        "An open request already exists for {} in environment {}",
                        request.resource_name, request.environment
                    )));
                }
            }
            (None, None) => {}
            (None, Some(_)) => {
                return Err(conflict_error(format!("Request {} already exists", request.id)))
            }
            (Some(_), None) => {
                return Err(not_found_error(format!("Request {} not found", request.id)))
            }
            (Some(e), Some(c)) if e == c => {}
            (Some(_), Some(c)) => {
                return Err(conflict_error(format!(
                    "Request {} is already {}",
                    request.id, c
                )))
            }
        }

        debug!("Storing {} request {} as {}", request.kind, request.id, request.status);
        tables.requests.insert(key, request.clone());
        Ok(())
    }

    async fn delete_request(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        id: RequestId,
        expected: RequestStatus,
    ) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        let key = (tenant_id, kind, id);
        match tables.requests.get(&key).map(|r| r.status) {
            None => Err(not_found_error(format!("Request {} not found", id))),
            Some(status) if status != expected => {
                Err(conflict_error(format!("Request {} is already {}", id, status)))
            }
            Some(_) => {
                tables.requests.remove(&key);
                Ok(())
            }
        }
    }

    async fn get_inventory(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        environment: &str,
    ) -> ApiResult<Vec<InventoryEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<_> = tables
            .inventory
            .values()
            .filter(|e| e.tenant_id == tenant_id && e.kind == kind && e.environment == environment)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn find_inventory_by_name(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        name: &str,
    ) -> ApiResult<Vec<InventoryEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<_> = tables
            .inventory
            .values()
            .filter(|e| e.tenant_id == tenant_id && e.kind == kind && e.name == name)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.environment.cmp(&b.environment));
        Ok(entries)
    }

    async fn upsert_inventory_batch(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        entries: &[InventoryEntry],
    ) -> ApiResult<Vec<InventoryEntry>> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let mut inventory = tables.inventory.clone();
        let stored = apply_changes(&mut inventory, tenant_id, kind, &[], entries)?;
        tables.inventory = inventory;
        Ok(stored)
    }

    async fn apply_inventory_changes(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        removals: &[InventoryEntry],
        upserts: &[InventoryEntry],
    ) -> ApiResult<usize> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let mut inventory = tables.inventory.clone();
        let stored = apply_changes(&mut inventory, tenant_id, kind, removals, upserts)?;
        tables.inventory = inventory;
        Ok(removals.len() + stored.len())
    }

    async fn delete_inventory(&self, entry: &InventoryEntry) -> ApiResult<()> {
        self.check_writable()?;
        let mut tables = self.tables.write().await;
        let mut inventory = tables.inventory.clone();
        apply_changes(
            &mut inventory,
            entry.tenant_id,
            entry.kind,
            std::slice::from_ref(entry),
            &[],
        )?;
        tables.inventory = inventory;
        Ok(())
    }

    async fn next_sequence_id(&self, counter: &str, tenant_id: TenantId) -> ApiResult<i32> {
        let mut tables = self.tables.write().await;
        let value = tables
            .counters
            .entry((counter.to_string(), tenant_id))
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn log_activity(&self, entry: &ActivityEntry) -> ApiResult<()> {
        let mut tables = self.tables.write().await;
        tables.activity.push(entry.clone());
        Ok(())
    }

    async fn get_activity(
        &self,
        tenant_id: TenantId,
        environment: Option<&str>,
    ) -> ApiResult<Vec<ActivityEntry>> {
        let tables = self.tables.read().await;
        let mut entries: Vec<_> = tables
            .activity
            .iter()
            .filter(|a| a.tenant_id == tenant_id)
            .filter(|a| environment.map_or(true, |env| a.environment == env))
            .cloned()
            .collect();
        entries.reverse();
        Ok(entries)
    }
}
