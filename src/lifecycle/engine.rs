//! Request lifecycle engine
//!
//! Approval state machine for change requests. A request leaves CREATED
//! exactly once: approved (cluster first, then inventory, then status) or
//! declined. Requesters may withdraw their own request while it is open.

use crate::auth::Permission;
use crate::cluster::{ClusterAgent, ClusterError};
use crate::context::RequestContext;
use crate::domain::{
    ActivityAction, ActivityEntry, ChangeRequest, InventoryEntry, NewChangeRequest, Outcome,
    Provenance, RequestFilter, RequestId, RequestOperation, RequestStatus, ResourceKind, TenantId,
};
use crate::error::{conflict_error, not_found_error, validation_error, ApiResult, AppError};
use crate::lifecycle::validate::{resource_name, validate_payload};
use crate::ownership::OwnershipRegistry;
use crate::paging::{paginate, Page, PageQuery};
use crate::store::InventoryStore;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct RequestLifecycleEngine {
    pub(super) store: Arc<dyn InventoryStore>,
    pub(super) cluster: Arc<dyn ClusterAgent>,
    pub(super) registry: OwnershipRegistry,
}

/// Cluster failures while reading a config: outages stay upstream errors,
/// anything else means the request itself is wrong
pub(super) fn config_fetch_error(name: &str, err: ClusterError) -> AppError {
    match err {
        ClusterError::Unreachable(_) | ClusterError::Auth(_) => err.into(),
        other => validation_error(format!("Could not read the config of '{}': {}", name, other)),
    }
}

impl RequestLifecycleEngine {
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

    /// Record an activity entry; a failure here never undoes the action
    pub(super) async fn record(&self, entry: ActivityEntry) {
        if let Err(e) = self.store.log_activity(&entry).await {
            warn!("Failed to record {} for '{}': {}", entry.action.as_str(), entry.resource_name, e);
        }
    }

    async fn managed_entry(
        &self,
        tenant_id: TenantId,
        kind: ResourceKind,
        name: &str,
        env_id: &str,
    ) -> ApiResult<Option<InventoryEntry>> {
        Ok(self
            .store
            .find_inventory_by_name(tenant_id, kind, name)
            .await?
            .into_iter()
            .find(|e| e.environment == env_id))
    }

    async fn load_request(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        id: RequestId,
    ) -> ApiResult<ChangeRequest> {
        self.store
            .get_request(ctx.tenant_id, kind, id)
            .await?
            .ok_or_else(|| not_found_error(format!("Request {} not found", id)))
    }

    pub async fn submit(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        input: NewChangeRequest,
    ) -> ApiResult<RequestId> {
        self.registry.require(ctx, Permission::request(kind))?;
        let env = self.registry.require_env(ctx, kind, &input.environment)?;

        if self.registry.team_name(ctx.tenant_id, ctx.team_id).is_err() {
            return Err(validation_error("Requesting team does not belong to this tenant"));
        }

        let name = resource_name(kind, &input.resource_name, input.payload.as_ref());
        validate_payload(kind, &name, input.operation, input.payload.as_ref(), &env)?;

        let managed = self.managed_entry(ctx.tenant_id, kind, &name, &env.id).await?;
        match input.operation {
            RequestOperation::Create => {
                if let Some(existing) = managed {
                    let owner = self.registry.team_name(ctx.tenant_id, existing.team_id)?;
                    return Err(conflict_error(format!(
                        "{} '{}' already exists in {} and is owned by {}",
                        kind, name, env.name, owner
                    )));
                }
            }
            RequestOperation::Update | RequestOperation::Delete => {
                let owned = managed.map_or(false, |e| e.team_id == ctx.team_id);
                if !owned {
                    debug!("{} does not own {} '{}' in {}", ctx.principal, kind, name, env.name);
                    return Err(AppError::NotAuthorized);
                }
                if input.operation == RequestOperation::Update {
                    self.cluster
                        .get_resource_config(&env, kind, &name)
                        .await
                        .map_err(|e| config_fetch_error(&name, e))?;
                }
            }
        }

        // the store rejects a concurrent duplicate on insert as well
        let open = RequestFilter {
            status: Some(RequestStatus::Created),
            environment: Some(env.id.clone()),
            resource_name: Some(name.clone()),
            ..Default::default()
        };
        if !self.store.get_requests(ctx.tenant_id, kind, &open).await?.is_empty() {
            return Err(conflict_error(format!(
                "A request for {} '{}' is already open in {}",
                kind, name, env.name
            )));
        }

        let id = self
            .store
            .next_sequence_id(kind.request_counter(), ctx.tenant_id)
            .await?;
        let request = ChangeRequest {
            id,
            tenant_id: ctx.tenant_id,
            kind,
            resource_name: name.clone(),
            environment: env.id.clone(),
            team_id: ctx.team_id,
            operation: input.operation,
            status: RequestStatus::Created,
            payload: input.payload,
            requested_by: ctx.principal.clone(),
            requested_at: Utc::now(),
            remarks: input.remarks,
            decision: None,
        };
        self.store.put_request(&request, None).await?;

        info!(
            "{} requested {} of {} '{}' in {} (request {})",
            ctx.principal, input.operation, kind, name, env.name, id
        );
        self.record(
            ActivityEntry::new(ctx.tenant_id, &env.id, kind, &name, ActivityAction::RequestSubmitted, &ctx.principal, ctx.team_id)
                .with_details(format!("{} request {}", input.operation, id)),
        )
        .await;

        Ok(id)
    }

    pub async fn decide(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        id: RequestId,
        outcome: Outcome,
    ) -> ApiResult<ChangeRequest> {
        self.registry.require(ctx, Permission::approve(kind))?;
        let mut request = self.load_request(ctx, kind, id).await?;
        self.registry.require_env(ctx, kind, &request.environment)?;

        if !request.is_pending() {
            return Err(conflict_error(format!("Request {} is already {}", id, request.status)));
        }

        match outcome {
            Outcome::Decline { reason } => {
                let reason = reason.trim().to_string();
                if reason.is_empty() {
                    return Err(validation_error("A reason is required to decline a request"));
                }
                request.decline(&ctx.principal, reason.clone());
                self.store
                    .put_request(&request, Some(RequestStatus::Created))
                    .await?;

                info!("{} declined {} request {}", ctx.principal, kind, id);
                self.record(
                    ActivityEntry::new(ctx.tenant_id, &request.environment, kind, &request.resource_name, ActivityAction::RequestDeclined, &ctx.principal, ctx.team_id)
                        .with_details(reason),
                )
                .await;
                Ok(request)
            }
            Outcome::Approve => {
                self.approve(ctx, &mut request).await?;
                Ok(request)
            }
        }
    }

    async fn approve(&self, ctx: &RequestContext, request: &mut ChangeRequest) -> ApiResult<()> {
        if request.requested_by == ctx.principal {
            debug!("{} tried to approve their own request {}", ctx.principal, request.id);
            return Err(AppError::NotAuthorized);
        }

        let kind = request.kind;
        let name = request.resource_name.clone();
        let env = self
            .registry
            .environment(ctx.tenant_id, kind, &request.environment)
            .ok_or_else(|| {
                AppError::Inconsistency(format!(
                    "Request {} targets unknown environment {}",
                    request.id, request.environment
                ))
            })?;

        // ownership may have moved since the request was filed
        let managed = self.managed_entry(ctx.tenant_id, kind, &name, &env.id).await?;
        match (&managed, request.operation) {
            (Some(entry), _) if entry.team_id != request.team_id => {
                let owner = self.registry.team_name(ctx.tenant_id, entry.team_id)?;
                return Err(conflict_error(format!(
                    "{} '{}' in {} is now owned by {}",
                    kind, name, env.name, owner
                )));
            }
            (None, RequestOperation::Update) => {
                return Err(conflict_error(format!(
                    "{} '{}' is no longer managed in {}",
                    kind, name, env.name
                )));
            }
            _ => {}
        }

        let config = match (&request.payload, &managed) {
            (Some(payload), _) => payload.to_config(),
            (None, Some(entry)) => entry.config.clone().unwrap_or_default(),
            (None, None) => serde_json::Value::Null,
        };

        self.cluster
            .apply_resource(&env, kind, &name, &config, request.operation)
            .await?;

        // the cluster has changed; from here on a failure leaves the request
        // open so the approval can be retried
        if let Err(e) = self.commit_approval(ctx, request, managed, config).await {
            error!(
                "{} {} '{}' applied on {} but recording request {} failed: {}",
                request.operation, kind, name, env.name, request.id, e
            );
            return Err(AppError::Inconsistency(format!(
                "{} '{}' was applied on the cluster but the inventory could not be updated: {}",
                kind, name, e
            )));
        }

        info!("{} approved {} request {} for '{}'", ctx.principal, kind, request.id, name);
        self.record(
            ActivityEntry::new(ctx.tenant_id, &env.id, kind, &name, ActivityAction::RequestApproved, &ctx.principal, ctx.team_id)
                .with_details(format!("{} request {}", request.operation, request.id)),
        )
        .await;
        Ok(())
    }

    async fn commit_approval(
        &self,
        ctx: &RequestContext,
        request: &mut ChangeRequest,
        managed: Option<InventoryEntry>,
        config: serde_json::Value,
    ) -> ApiResult<()> {
        let kind = request.kind;
        match (request.operation, managed) {
            (RequestOperation::Create, None) => {
                let inventory_id = self
                    .store
                    .next_sequence_id(kind.inventory_counter(), ctx.tenant_id)
                    .await?;
                let entry = InventoryEntry::new(
                    inventory_id,
                    ctx.tenant_id,
                    kind,
                    &request.resource_name,
                    &request.environment,
                    request.team_id,
                    Provenance::Requested,
                )
                .with_config(config);
                self.store
                    .upsert_inventory_batch(ctx.tenant_id, kind, &[entry])
                    .await?;
            }
            // an earlier attempt already wrote the entry
            (RequestOperation::Create, Some(mut entry)) | (RequestOperation::Update, Some(mut entry)) => {
                entry.set_config(config);
                entry.exists_on_cluster = true;
                self.store
                    .upsert_inventory_batch(ctx.tenant_id, kind, &[entry])
                    .await?;
            }
            (RequestOperation::Delete, Some(entry)) => {
                self.store.delete_inventory(&entry).await?;
            }
            (RequestOperation::Delete, None) => {}
            (RequestOperation::Update, None) => {
                return Err(conflict_error(format!(
                    "'{}' disappeared from the inventory",
                    request.resource_name
                )));
            }
        }

        let mut approved = request.clone();
        approved.approve(&ctx.principal);
        self.store
            .put_request(&approved, Some(RequestStatus::Created))
            .await?;
        *request = approved;
        Ok(())
    }

    /// Withdraw an open request; only its requester may do so
    pub async fn delete(&self, ctx: &RequestContext, kind: ResourceKind, id: RequestId) -> ApiResult<()> {
        let request = self.load_request(ctx, kind, id).await?;

        if request.requested_by != ctx.principal {
            return Err(AppError::NotAuthorized);
        }
        if !request.is_pending() {
            return Err(validation_error(format!(
                "Request {} is {} and can no longer be deleted",
                id, request.status
            )));
        }

        self.store
            .delete_request(ctx.tenant_id, kind, id, RequestStatus::Created)
            .await?;

        info!("{} withdrew {} request {}", ctx.principal, kind, id);
        self.record(ActivityEntry::new(
            ctx.tenant_id,
            &request.environment,
            kind,
            &request.resource_name,
            ActivityAction::RequestDeleted,
            &ctx.principal,
            ctx.team_id,
        ))
        .await;
        Ok(())
    }

    /// Requests in the caller's environments, newest first
    pub async fn list(
        &self,
        ctx: &RequestContext,
        kind: ResourceKind,
        filter: &RequestFilter,
        page: &PageQuery,
    ) -> ApiResult<Page<ChangeRequest>> {
        let mut requests: Vec<_> = self
            .store
            .get_requests(ctx.tenant_id, kind, filter)
            .await?
            .into_iter()
            .filter(|r| ctx.can_access_env(&r.environment))
            .collect();
        requests.reverse();

        Ok(paginate(requests, page.request(), page.current()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceKind::{Connector, Topic};
    use crate::domain::{ConnectorSpec, RequestPayload, TopicSpec};
    use crate::testing::{ctx_for, Harness, OCTOPUS, SEAHORSES, TENANT};
    use serde_json::json;
    use tokio_test::assert_ok;

    fn topic_request(name: &str, env: &str) -> NewChangeRequest {
        NewChangeRequest {
            resource_name: name.into(),
            environment: env.into(),
            operation: RequestOperation::Create,
            payload: Some(RequestPayload::Topic(TopicSpec {
                partitions: 3,
                replication_factor: 2,
                advanced_config: Default::default(),
                description: "orders placed".into(),
            })),
            remarks: None,
        }
    }

    fn delete_request(name: &str, env: &str) -> NewChangeRequest {
        NewChangeRequest {
            resource_name: name.into(),
            environment: env.into(),
            operation: RequestOperation::Delete,
            payload: None,
            remarks: Some("retired".into()),
        }
    }

    async fn status_of(h: &Harness, kind: ResourceKind, id: RequestId) -> RequestStatus {
        h.store.get_request(TENANT, kind, id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_submit_assigns_sequential_ids_per_kind() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let alice = ctx_for("alice");

        assert_eq!(engine.submit(&alice, Topic, topic_request("orders", "1")).await.unwrap(), 1);
        assert_eq!(engine.submit(&alice, Topic, topic_request("payments", "1")).await.unwrap(), 2);

        let connector = NewChangeRequest {
            resource_name: "billing-sink".into(),
            environment: "7".into(),
            operation: RequestOperation::Create,
            payload: Some(RequestPayload::Connector(ConnectorSpec {
                config: json!({"connector.class": "FileStreamSink", "tasks.max": "1"}),
            })),
            remarks: None,
        };
        assert_eq!(engine.submit(&alice, Connector, connector).await.unwrap(), 1);
        assert_eq!(status_of(&h, Topic, 2).await, RequestStatus::Created);
    }

    #[tokio::test]
    async fn test_submit_authorization_is_uniform() {
        let h = Harness::new();
        let engine = h.lifecycle();

        let no_permission = engine.submit(&ctx_for("dave"), Topic, topic_request("orders", "1")).await;
        assert!(matches!(no_permission, Err(AppError::NotAuthorized)));

        let forbidden_env = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "3")).await;
        assert!(matches!(forbidden_env, Err(AppError::NotAuthorized)));

        let other_tenant_env = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "50")).await;
        assert!(matches!(other_tenant_env, Err(AppError::NotAuthorized)));
    }

    #[tokio::test]
    async fn test_submit_rejects_managed_and_duplicate() {
        let h = Harness::new();
        h.manage(Topic, "1", "orders", SEAHORSES).await;
        let engine = h.lifecycle();
        let alice = ctx_for("alice");

        let exists = engine.submit(&alice, Topic, topic_request("orders", "1")).await;
        match exists {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("Seahorses")),
            other => panic!("expected conflict, got {:?}", other),
        }

        assert_ok!(engine.submit(&alice, Topic, topic_request("payments", "1")).await);
        let duplicate = engine.submit(&ctx_for("sam"), Topic, topic_request("payments", "1")).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete_need_ownership() {
        let h = Harness::new();
        h.manage(Topic, "1", "orders", SEAHORSES).await;
        let engine = h.lifecycle();

        let result = engine.submit(&ctx_for("alice"), Topic, delete_request("orders", "1")).await;
        assert!(matches!(result, Err(AppError::NotAuthorized)));

        let unmanaged = engine.submit(&ctx_for("alice"), Topic, delete_request("nothing", "1")).await;
        assert!(matches!(unmanaged, Err(AppError::NotAuthorized)));

        assert_ok!(engine.submit(&ctx_for("bob"), Topic, delete_request("orders", "1")).await);
    }

    #[tokio::test]
    async fn test_update_needs_live_config() {
        let h = Harness::new();
        h.manage(Topic, "1", "orders", OCTOPUS).await;
        h.cluster.set_unreachable("1", true).await;

        let mut update = topic_request("orders", "1");
        update.operation = RequestOperation::Update;
        let result = h.lifecycle().submit(&ctx_for("alice"), Topic, update).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_approve_applies_to_cluster_then_inventory() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let id = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "1")).await.unwrap();

        let decided = engine.decide(&ctx_for("bob"), Topic, id, Outcome::Approve).await.unwrap();
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(decided.decision.unwrap().approver, "bob");

        assert!(h.cluster.resource("1", Topic, "orders").await.is_some());
        let inventory = h.store.get_inventory(TENANT, Topic, "1").await.unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].team_id, OCTOPUS);
        assert_eq!(inventory[0].provenance, Provenance::Requested);
        assert!(inventory[0].exists_on_cluster);

        let again = engine.decide(&ctx_for("bob"), Topic, id, Outcome::Approve).await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_cannot_approve_own_request() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let carol = ctx_for("carol");
        let id = engine.submit(&carol, Topic, topic_request("orders", "1")).await.unwrap();

        let result = engine.decide(&carol, Topic, id, Outcome::Approve).await;
        assert!(matches!(result, Err(AppError::NotAuthorized)));
        assert_eq!(status_of(&h, Topic, id).await, RequestStatus::Created);
    }

    #[tokio::test]
    async fn test_cluster_failure_keeps_request_open() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let id = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "1")).await.unwrap();
        h.cluster.set_unreachable("1", true).await;

        let result = engine.decide(&ctx_for("bob"), Topic, id, Outcome::Approve).await;
        assert!(matches!(result, Err(AppError::UpstreamUnavailable(_))));
        assert_eq!(status_of(&h, Topic, id).await, RequestStatus::Created);
        assert!(h.store.get_inventory(TENANT, Topic, "1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_after_cluster_is_inconsistency_and_retryable() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let id = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "1")).await.unwrap();

        h.store.fail_inventory_writes(true);
        let result = engine.decide(&ctx_for("bob"), Topic, id, Outcome::Approve).await;
        assert!(matches!(result, Err(AppError::Inconsistency(_))));
        assert_eq!(status_of(&h, Topic, id).await, RequestStatus::Created);
        assert!(h.cluster.resource("1", Topic, "orders").await.is_some());

        h.store.fail_inventory_writes(false);
        let retried = engine.decide(&ctx_for("bob"), Topic, id, Outcome::Approve).await.unwrap();
        assert_eq!(retried.status, RequestStatus::Approved);
        assert_eq!(h.store.get_inventory(TENANT, Topic, "1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_approve_rechecks_ownership() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let id = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "1")).await.unwrap();
        // someone synced the topic to another team in the meantime
        h.manage(Topic, "1", "orders", SEAHORSES).await;

        match engine.decide(&ctx_for("bob"), Topic, id, Outcome::Approve).await {
            Err(AppError::Conflict(msg)) => assert!(msg.contains("Seahorses")),
            other => panic!("expected conflict, got {:?}", other),
        }
        assert!(h.cluster.resource("1", Topic, "orders").await.is_none());
    }

    #[tokio::test]
    async fn test_approved_delete_removes_resource() {
        let h = Harness::new();
        h.manage(Topic, "1", "orders", OCTOPUS).await;
        h.live(Topic, "1", "orders").await;
        let engine = h.lifecycle();

        let id = engine.submit(&ctx_for("alice"), Topic, delete_request("orders", "1")).await.unwrap();
        assert_ok!(engine.decide(&ctx_for("bob"), Topic, id, Outcome::Approve).await);

        assert!(h.cluster.resource("1", Topic, "orders").await.is_none());
        assert!(h.store.get_inventory(TENANT, Topic, "1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decline_needs_reason_and_touches_nothing() {
        let h = Harness::new();
        h.manage(Topic, "1", "orders", OCTOPUS).await;
        h.live(Topic, "1", "orders").await;
        let engine = h.lifecycle();
        let id = engine.submit(&ctx_for("alice"), Topic, delete_request("orders", "1")).await.unwrap();
        let before = h.store.get_inventory(TENANT, Topic, "1").await.unwrap();

        let blank = engine
            .decide(&ctx_for("bob"), Topic, id, Outcome::Decline { reason: "  ".into() })
            .await;
        assert!(matches!(blank, Err(AppError::Validation(_))));

        let declined = engine
            .decide(&ctx_for("bob"), Topic, id, Outcome::Decline { reason: "still in use".into() })
            .await
            .unwrap();
        assert_eq!(declined.status, RequestStatus::Declined);
        assert_eq!(declined.decision.unwrap().reason.as_deref(), Some("still in use"));

        assert_eq!(h.store.get_inventory(TENANT, Topic, "1").await.unwrap(), before);
        assert!(h.cluster.resource("1", Topic, "orders").await.is_some());
    }

    #[tokio::test]
    async fn test_only_requester_may_withdraw() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let id = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "1")).await.unwrap();

        // bob holds every approve permission and still may not withdraw it
        let result = engine.delete(&ctx_for("bob"), Topic, id).await;
        assert!(matches!(result, Err(AppError::NotAuthorized)));

        assert_ok!(engine.delete(&ctx_for("alice"), Topic, id).await);
        assert!(h.store.get_request(TENANT, Topic, id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_decided_request_cannot_be_withdrawn() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let id = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "1")).await.unwrap();
        engine
            .decide(&ctx_for("bob"), Topic, id, Outcome::Decline { reason: "no".into() })
            .await
            .unwrap();

        let result = engine.delete(&ctx_for("alice"), Topic, id).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_requests_invisible_across_tenants() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let id = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "1")).await.unwrap();
        let mallory = ctx_for("mallory");

        let decided = engine.decide(&mallory, Topic, id, Outcome::Approve).await;
        assert!(matches!(decided, Err(AppError::NotFound(_))));

        let listed = engine
            .list(&mallory, Topic, &RequestFilter::default(), &PageQuery::default())
            .await
            .unwrap();
        assert!(listed.items.is_empty());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let alice = ctx_for("alice");
        engine.submit(&alice, Topic, topic_request("orders", "1")).await.unwrap();
        engine.submit(&alice, Topic, topic_request("payments", "1")).await.unwrap();

        let page = engine
            .list(&alice, Topic, &RequestFilter::default(), &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(page.items[0].resource_name, "payments");

        let filter = RequestFilter {
            resource_name: Some("orders".into()),
            ..Default::default()
        };
        let page = engine.list(&alice, Topic, &filter, &PageQuery::default()).await.unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_actions_are_recorded() {
        let h = Harness::new();
        let engine = h.lifecycle();
        let id = engine.submit(&ctx_for("alice"), Topic, topic_request("orders", "1")).await.unwrap();
        engine.decide(&ctx_for("bob"), Topic, id, Outcome::Approve).await.unwrap();

        let activity = h.store.get_activity(TENANT, None).await.unwrap();
        let actions: Vec<_> = activity.iter().map(|a| a.action).collect();
        assert_eq!(actions, vec![ActivityAction::RequestApproved, ActivityAction::RequestSubmitted]);
    }
}
