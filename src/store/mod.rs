//! Inventory store
//!
//! Narrow persistence interface for change requests, the managed inventory,
//! id counters and the activity log. Every call is tenant scoped.
//!
//! Conflicting writes are serialized by the store itself: request status
//! changes compare-and-set on the expected status, inventory updates
//! compare-and-set on `version`, and new entries are unique on
//! (tenant, kind, name, environment). A rejected write is `AppError::Conflict`.

mod memory;
mod postgres;
mod queries;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::domain::{
    ActivityEntry, ChangeRequest, InventoryEntry, RequestFilter, RequestId, RequestStatus,
    ResourceKind, TenantId,
};
use crate::error::ApiResult;
use async_trait::async_trait;

#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Requests of one kind matching `filter`, ordered by id
    async fn get_requests(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        filter: &RequestFilter,
    ) -> ApiResult<Vec<ChangeRequest>>;

    async fn get_request(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        id: RequestId,
    ) -> ApiResult<Option<ChangeRequest>>;

    /// Insert when `expected` is `None`, otherwise update only if the stored
    /// status still equals `expected`
    async fn put_request(
        &self,
        request: &ChangeRequest,
        expected: Option<RequestStatus>,
    ) -> ApiResult<()>;

    /// Remove a request that is still in the `expected` status
    async fn delete_request(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        id: RequestId,
        expected: RequestStatus,
    ) -> ApiResult<()>;

    /// Managed entries of one environment, ordered by name
    async fn get_inventory(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        environment: &str,
    ) -> ApiResult<Vec<InventoryEntry>>;

    /// Entries with this name across all environments of the tenant
    async fn find_inventory_by_name(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        name: &str,
    ) -> ApiResult<Vec<InventoryEntry>>;

    /// Insert (version 0) or update (version CAS) entries, all or nothing.
    /// Returns the stored entries with their new versions.
    async fn upsert_inventory_batch(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        entries: &[InventoryEntry],
    ) -> ApiResult<Vec<InventoryEntry>>;

    /// Apply removals and upserts in one atomic unit. Returns the number of
    /// rows touched.
    async fn apply_inventory_changes(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        removals: &[InventoryEntry],
        upserts: &[InventoryEntry],
    ) -> ApiResult<usize>;

    /// Remove one entry, provided its version is unchanged
    async fn delete_inventory(&self, entry: &InventoryEntry) -> ApiResult<()>;

    /// Next value of a tenant-scoped counter, starting at 1
    async fn next_sequence_id(&self, counter: &str, tenant_id: TenantId) -> ApiResult<i32>;

    async fn log_activity(&self, entry: &ActivityEntry) -> ApiResult<()>;

    /// Activity newest first, optionally restricted to one environment
    async fn get_activity(
        &self,
        tenant_id: TenantId,
        environment: Option<&str>,
    ) -> ApiResult<Vec<ActivityEntry>>;
}
