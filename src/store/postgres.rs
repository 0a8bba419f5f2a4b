//! PostgreSQL store
//!
//! Multi-row writes run inside one transaction; compare-and-set is expressed
//! in the WHERE clause and checked through the affected row count.

use crate::domain::{
    ActivityAction, ActivityEntry, ChangeRequest, Decision, InventoryEntry, Provenance,
    RequestFilter, RequestId, RequestPayload, RequestStatus, ResourceKind, TenantId,
};
use crate::error::{conflict_error, not_found_error, validation_error, ApiResult, AppError};
use crate::store::{queries, InventoryStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Pool, Transaction};
use postgres_types::Json;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use tracing::{debug, info};
use uuid::Uuid;

pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create tables and indexes if they don't exist
    pub async fn init_schema(&self) -> ApiResult<()> {
        let client = self.pool.get().await?;
        for statement in queries::CREATE_SCHEMA {
            client.execute(*statement, &[]).await?;
        }
        info!("Inventory schema initialized");
        Ok(())
    }
}

fn inconsistent(column: &str, value: &str) -> AppError {
    AppError::Inconsistency(format!("Unexpected {} '{}' in store", column, value))
}

/// Unique violations are concurrent writers, everything else stays a database error
fn map_write_error(err: tokio_postgres::Error, what: &str) -> AppError {
    let constraint = err.as_db_error().and_then(|db| db.constraint());
    if constraint == Some(queries::OPEN_REQUEST_INDEX) {
        conflict_error("An open request already exists for this resource and environment")
    } else if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        conflict_error(format!("{} already exists", what))
    } else {
        AppError::Database(err)
    }
}

fn row_to_request(row: &Row) -> ApiResult<ChangeRequest> {
    let kind: String = row.get("kind");
    let operation: String = row.get("operation");
    let status: String = row.get("status");
    let payload: Option<Json<RequestPayload>> = row.get("payload");
    let approver: Option<String> = row.get("approver");
    let decided_at: Option<DateTime<Utc>> = row.get("decided_at");

    let decision = match (approver, decided_at) {
        (Some(approver), Some(decided_at)) => Some(Decision {
            approver,
            reason: row.get("decision_reason"),
            decided_at,
        }),
        _ => None,
    };

    Ok(ChangeRequest {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        kind: kind.parse().map_err(|_| inconsistent("kind", &kind))?,
        resource_name: row.get("resource_name"),
        environment: row.get("environment"),
        team_id: row.get("team_id"),
        operation: operation
            .parse()
            .map_err(|_| inconsistent("operation", &operation))?,
        status: status.parse().map_err(|_| inconsistent("status", &status))?,
        payload: payload.map(|Json(p)| p),
        requested_by: row.get("requested_by"),
        requested_at: row.get("requested_at"),
        remarks: row.get("remarks"),
        decision,
    })
}

fn row_to_entry(row: &Row) -> ApiResult<InventoryEntry> {
    let kind: String = row.get("kind");
    let provenance: String = row.get("provenance");
    let config: Option<Json<serde_json::Value>> = row.get("config");

    Ok(InventoryEntry {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        kind: kind.parse().map_err(|_| inconsistent("kind", &kind))?,
        name: row.get("name"),
        environment: row.get("environment"),
        team_id: row.get("team_id"),
        config: config.map(|Json(c)| c),
        config_checksum: row.get("config_checksum"),
        exists_on_cluster: row.get("exists_on_cluster"),
        provenance: Provenance::parse(&provenance)
            .ok_or_else(|| inconsistent("provenance", &provenance))?,
        description: row.get("description"),
        version: row.get("version"),
    })
}

fn row_to_activity(row: &Row) -> ApiResult<ActivityEntry> {
    let kind: String = row.get("kind");
    let action: String = row.get("action");

    Ok(ActivityEntry {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        environment: row.get("environment"),
        kind: kind.parse().map_err(|_| inconsistent("kind", &kind))?,
        resource_name: row.get("resource_name"),
        action: ActivityAction::parse(&action).ok_or_else(|| inconsistent("action", &action))?,
        principal: row.get("principal"),
        team_id: row.get("team_id"),
        details: row.get("details"),
        timestamp: row.get("logged_at"),
    })
}

/// Apply removals then upserts inside an open transaction
async fn write_inventory(
    client: &Transaction<'_>,
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
        let deleted = client
            .execute(
                queries::DELETE_INVENTORY,
                &[&tenant_id, &kind.as_str(), &entry.id, &entry.version],
            )
            .await?;
        if deleted != 1 {
            return Err(conflict_error(format!(
                "'{}' in environment {} was modified concurrently",
                entry.name, entry.environment
            )));
        }
    }

    let mut stored = Vec::with_capacity(upserts.len());
    for entry in upserts {
        let config = entry.config.as_ref().map(Json);
        let affected = if entry.version == 0 {
            client
                .execute(
                    queries::insert_inventory().as_str(),
                    &[
                        &tenant_id,
                        &kind.as_str(),
                        &entry.id,
                        &entry.name,
                        &entry.environment,
                        &entry.team_id,
                        &config,
                        &entry.config_checksum,
                        &entry.exists_on_cluster,
                        &entry.provenance.as_str(),
                        &entry.description,
                    ],
                )
                .await
                .map_err(|e| {
                    map_write_error(e, &format!("'{}' in environment {}", entry.name, entry.environment))
                })?
        } else {
            client
                .execute(
                    queries::UPDATE_INVENTORY,
                    &[
                        &tenant_id,
                        &kind.as_str(),
                        &entry.id,
                        &entry.name,
                        &entry.environment,
                        &entry.team_id,
                        &config,
                        &entry.config_checksum,
                        &entry.exists_on_cluster,
                        &entry.provenance.as_str(),
                        &entry.description,
                        &entry.version,
                    ],
                )
                .await
                .map_err(|e| {
                    map_write_error(e, &format!("'{}' in environment {}", entry.name, entry.environment))
                })?
        };

        if affected != 1 {
            return Err(conflict_error(format!(
                "'{}' in environment {} was modified concurrently",
                entry.name, entry.environment
            )));
        }

        let mut next = entry.clone();
        next.version = entry.version + 1;
        stored.push(next);
    }

    Ok(stored)
}

#[async_trait]
impl InventoryStore for PgStore {
    async fn get_requests(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        filter: &RequestFilter,
    ) -> ApiResult<Vec<ChangeRequest>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(queries::select_requests().as_str(), &[&tenant_id, &kind.as_str()])
            .await?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            let request = row_to_request(row)?;
            if filter.matches(&request) {
                requests.push(request);
            }
        }
        Ok(requests)
    }

    async fn get_request(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        id: RequestId,
    ) -> ApiResult<Option<ChangeRequest>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(queries::select_request().as_str(), &[&tenant_id, &kind.as_str(), &id])
            .await?;
        row.as_ref().map(row_to_request).transpose()
    }

    async fn put_request(
        &self,
        request: &ChangeRequest,
        expected: Option<RequestStatus>,
    ) -> ApiResult<()> {
        let client = self.pool.get().await?;
        let payload = request.payload.as_ref().map(Json);
        let approver = request.decision.as_ref().map(|d| d.approver.clone());
        let reason = request.decision.as_ref().and_then(|d| d.reason.clone());
        let decided_at = request.decision.as_ref().map(|d| d.decided_at);

        match expected {
            None => {
                client
                    .execute(
                        queries::insert_request().as_str(),
                        &[
                            &request.tenant_id,
                            &request.kind.as_str(),
                            &request.id,
                            &request.resource_name,
                            &request.environment,
                            &request.team_id,
                            &request.operation.as_str(),
                            &request.status.as_str(),
                            &payload,
                            &request.requested_by,
                            &request.requested_at,
                            &request.remarks,
                            &approver,
                            &reason,
                            &decided_at,
                        ],
                    )
                    .await
                    .map_err(|e| map_write_error(e, &format!("Request {}", request.id)))?;
            }
            Some(expected) => {
                let updated = client
                    .execute(
                        queries::UPDATE_REQUEST,
                        &[
                            &request.tenant_id,
                            &request.kind.as_str(),
                            &request.id,
                            &request.resource_name,
                            &request.environment,
                            &request.team_id,
                            &request.operation.as_str(),
                            &request.status.as_str(),
                            &payload,
                            &request.requested_by,
                            &request.requested_at,
                            &request.remarks,
                            &approver,
                            &reason,
                            &decided_at,
                            &expected.as_str(),
                        ],
                    )
                    .await?;

                if updated != 1 {
                    let current = client
                        .query_opt(
                            queries::REQUEST_STATUS,
                            &[&request.tenant_id, &request.kind.as_str(), &request.id],
                        )
                        .await?;
                    return Err(match current {
                        None => not_found_error(format!("Request {} not found", request.id)),
                        Some(row) => {
                            let status: String = row.get(0);
                            conflict_error(format!("Request {} is already {}", request.id, status))
                        }
                    });
                }
            }
        }

        debug!("Stored {} request {} as {}", request.kind, request.id, request.status);
        Ok(())
    }

    async fn delete_request(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        id: RequestId,
        expected: RequestStatus,
    ) -> ApiResult<()> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                queries::DELETE_REQUEST,
                &[&tenant_id, &kind.as_str(), &id, &expected.as_str()],
            )
            .await?;

        if deleted == 1 {
            return Ok(());
        }

        let current = client
            .query_opt(queries::REQUEST_STATUS, &[&tenant_id, &kind.as_str(), &id])
            .await?;
        Err(match current {
            None => not_found_error(format!("Request {} not found", id)),
            Some(row) => {
                let status: String = row.get(0);
                conflict_error(format!("Request {} is already {}", id, status))
            }
        })
    }

    async fn get_inventory(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        environment: &str,
    ) -> ApiResult<Vec<InventoryEntry>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                queries::select_inventory_by_env().as_str(),
                &[&tenant_id, &kind.as_str(), &environment],
            )
            .await?;
        rows.iter().map(row_to_entry).collect()
    }

    async fn find_inventory_by_name(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        name: &str,
    ) -> ApiResult<Vec<InventoryEntry>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                queries::select_inventory_by_name().as_str(),
                &[&tenant_id, &kind.as_str(), &name],
            )
            .await?;
        rows.iter().map(row_to_entry).collect()
    }

    async fn upsert_inventory_batch(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        entries: &[InventoryEntry],
    ) -> ApiResult<Vec<InventoryEntry>> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let stored = write_inventory(&tx, tenant_id, kind, &[], entries).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn apply_inventory_changes(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        removals: &[InventoryEntry],
        upserts: &[InventoryEntry],
    ) -> ApiResult<usize> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        let stored = write_inventory(&tx, tenant_id, kind, removals, upserts).await?;
        tx.commit().await?;
        debug!(
            "Applied {} removal(s) and {} upsert(s) to tenant {} {} inventory",
            removals.len(),
            stored.len(),
            tenant_id,
            kind
        );
        Ok(removals.len() + stored.len())
    }

    async fn delete_inventory(&self, entry: &InventoryEntry) -> ApiResult<()> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await?;
        write_inventory(&tx, entry.tenant_id, entry.kind, std::slice::from_ref(entry), &[]).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn next_sequence_id(&self, counter: &str, tenant_id: TenantId) -> ApiResult<i32> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(queries::NEXT_SEQUENCE, &[&tenant_id, &counter])
            .await?;
        Ok(row.get(0))
    }

    async fn log_activity(&self, entry: &ActivityEntry) -> ApiResult<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                queries::INSERT_ACTIVITY,
                &[
                    &entry.id,
                    &entry.tenant_id,
                    &entry.environment,
                    &entry.kind.as_str(),
                    &entry.resource_name,
                    &entry.action.as_str(),
                    &entry.principal,
                    &entry.team_id,
                    &entry.details,
                    &entry.timestamp,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_activity(
        &self,
        tenant_id: TenantId,
        environment: Option<&str>,
    ) -> ApiResult<Vec<ActivityEntry>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(queries::SELECT_ACTIVITY, &[&tenant_id, &environment])
            .await?;
        rows.iter().map(row_to_activity).collect()
    }
}
