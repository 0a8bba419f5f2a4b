//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::cluster::ClusterAgent;
use crate::directory::TenantDirectory;
use crate::lifecycle::RequestLifecycleEngine;
use crate::ownership::OwnershipRegistry;
use crate::reconcile::ReconciliationEngine;
use crate::store::InventoryStore;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Principals, teams and environments per tenant
    pub directory: Arc<dyn TenantDirectory>,

    /// Approval workflow and bulk sync
    pub lifecycle: RequestLifecycleEngine,

    /// Inventory versus live cluster views
    pub reconciler: ReconciliationEngine,

    pub store: Arc<dyn InventoryStore>,

    /// JWT secret key for token verification
    pub jwt_secret: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        cluster: Arc<dyn ClusterAgent>,
        directory: Arc<dyn TenantDirectory>,
        jwt_secret: String,
    ) -> Self {
        let registry = OwnershipRegistry::new(directory.clone());

        Self {
            lifecycle: RequestLifecycleEngine::new(store.clone(), cluster.clone(), registry.clone()),
            reconciler: ReconciliationEngine::new(store.clone(), cluster, registry),
            directory,
            store,
            jwt_secret,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
