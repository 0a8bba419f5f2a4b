//! Directory loaded from a static file
//!
//! The file format is whatever the `config` crate understands from the
//! extension (TOML, YAML, JSON). Keys are snake_case throughout.

use crate::auth::Permission;
use crate::directory::TenantDirectory;
use crate::domain::{ClusterKind, Environment, Team, TeamId, TenantConfig, TenantId};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub tenant_id: TenantId,
    pub team_id: TeamId,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantRecord {
    pub config: TenantConfig,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub environments: Vec<Environment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryFile {
    #[serde(default)]
    pub tenants: Vec<TenantRecord>,
    #[serde(default)]
    pub principals: Vec<Principal>,
}

/// Immutable in-memory directory
pub struct StaticDirectory {
    tenants: HashMap<TenantId, TenantRecord>,
    principals: HashMap<String, Principal>,
}

impl StaticDirectory {
    /// Build from parsed records, rejecting cross-tenant references
    pub fn new(file: DirectoryFile) -> Result<Self, AppError> {
        let mut tenants = HashMap::new();
        for tenant in file.tenants {
            let tenant_id = tenant.config.tenant_id;
            if let Some(team) = tenant.teams.iter().find(|t| t.tenant_id != tenant_id) {
                return Err(AppError::Config(format!(
                    "Team '{}' is declared under tenant {} but belongs to tenant {}",
                    team.name, tenant_id, team.tenant_id
                )));
            }
            if let Some(env) = tenant.environments.iter().find(|e| e.tenant_id != tenant_id) {
                return Err(AppError::Config(format!(
                    "Environment '{}' is declared under tenant {} but belongs to tenant {}",
                    env.name, tenant_id, env.tenant_id
                )));
            }
            tenants.insert(tenant_id, tenant);
        }

        let mut principals = HashMap::new();
        for principal in file.principals {
            let team_ok = tenants
                .get(&principal.tenant_id)
                .map_or(false, |t| t.teams.iter().any(|team| team.id == principal.team_id));
            if !team_ok {
                return Err(AppError::Config(format!(
                    "Principal '{}' references team {} outside tenant {}",
                    principal.username, principal.team_id, principal.tenant_id
                )));
            }
            principals.insert(principal.username.clone(), principal);
        }

        Ok(Self { tenants, principals })
    }

    /// Load the directory file at `path`
    pub fn load(path: &str) -> Result<Self, AppError> {
        let file: DirectoryFile = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| AppError::Config(format!("Failed to load directory '{}': {}", path, e)))?;

        let directory = Self::new(file)?;
        info!(
            "Directory loaded: {} tenant(s), {} principal(s)",
            directory.tenants.len(),
            directory.principals.len()
        );
        Ok(directory)
    }
}

impl TenantDirectory for StaticDirectory {
    fn principal(&self, username: &str) -> Option<Principal> {
        self.principals.get(username).cloned()
    }

    fn teams(&self, tenant_id: TenantId) -> Vec<Team> {
        self.tenants
            .get(&tenant_id)
            .map(|t| t.teams.clone())
            .unwrap_or_default()
    }

    fn environments(&self, tenant_id: TenantId, kind: ClusterKind) -> Vec<Environment> {
        self.tenants
            .get(&tenant_id)
            .map(|t| t.environments.iter().filter(|e| e.kind == kind).cloned().collect())
            .unwrap_or_default()
    }

    fn tenant_config(&self, tenant_id: TenantId) -> Option<TenantConfig> {
        self.tenants.get(&tenant_id).map(|t| t.config.clone())
    }
}
