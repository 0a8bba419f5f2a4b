//! SQL query constants
//!
//! Contains all SQL used by the PostgreSQL store.

/// Partial unique index over CREATED requests
pub const OPEN_REQUEST_INDEX: &str = "idx_open_requests";

/// Schema, applied at startup
pub const CREATE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS change_requests (
        tenant_id INTEGER NOT NULL,
        kind VARCHAR(16) NOT NULL,
        id INTEGER NOT NULL,
        resource_name VARCHAR(1024) NOT NULL,
        environment VARCHAR(64) NOT NULL,
        team_id INTEGER NOT NULL,
        operation VARCHAR(16) NOT NULL,
        status VARCHAR(16) NOT NULL,
        payload JSONB,
        requested_by VARCHAR(255) NOT NULL,
        requested_at TIMESTAMPTZ NOT NULL,
        remarks TEXT,
        approver VARCHAR(255),
        decision_reason TEXT,
        decided_at TIMESTAMPTZ,
        PRIMARY KEY (tenant_id, kind, id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS inventory (
        tenant_id INTEGER NOT NULL,
        kind VARCHAR(16) NOT NULL,
        id INTEGER NOT NULL,
        name VARCHAR(1024) NOT NULL,
        environment VARCHAR(64) NOT NULL,
        team_id INTEGER NOT NULL,
        config JSONB,
        config_checksum VARCHAR(64),
        exists_on_cluster BOOLEAN NOT NULL DEFAULT true,
        provenance VARCHAR(16) NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        version BIGINT NOT NULL,
        PRIMARY KEY (tenant_id, kind, id),
        UNIQUE (tenant_id, kind, name, environment)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sequences (
        tenant_id INTEGER NOT NULL,
        counter VARCHAR(64) NOT NULL,
        value INTEGER NOT NULL,
        PRIMARY KEY (tenant_id, counter)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS activity_log (
        id UUID PRIMARY KEY,
        tenant_id INTEGER NOT NULL,
        environment VARCHAR(64) NOT NULL,
        kind VARCHAR(16) NOT NULL,
        resource_name VARCHAR(1024) NOT NULL,
        action VARCHAR(32) NOT NULL,
        principal VARCHAR(255) NOT NULL,
        team_id INTEGER NOT NULL,
        details TEXT,
        logged_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_inventory_env ON inventory(tenant_id, kind, environment)",
    "CREATE INDEX IF NOT EXISTS idx_activity_tenant ON activity_log(tenant_id, logged_at DESC)",
    // At most one open request per resource and environment
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_open_requests
        ON change_requests(tenant_id, kind, resource_name, environment)
        WHERE status = 'CREATED'
    "#,
];

const REQUEST_COLUMNS: &str = "tenant_id, kind, id, resource_name, environment, team_id, operation, status, \
     payload, requested_by, requested_at, remarks, approver, decision_reason, decided_at";

pub fn select_requests() -> String {
    format!(
        "SELECT {} FROM change_requests WHERE tenant_id = $1 AND kind = $2 ORDER BY id",
        REQUEST_COLUMNS
    )
}

pub fn select_request() -> String {
    format!(
        "SELECT {} FROM change_requests WHERE tenant_id = $1 AND kind = $2 AND id = $3",
        REQUEST_COLUMNS
    )
}

pub fn insert_request() -> String {
    format!(
        "INSERT INTO change_requests ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        REQUEST_COLUMNS
    )
}

/// Status CAS: only updates when the stored status is `$16`
pub const UPDATE_REQUEST: &str = r#"
    UPDATE change_requests SET
        resource_name = $4, environment = $5, team_id = $6, operation = $7, status = $8,
        payload = $9, requested_by = $10, requested_at = $11, remarks = $12,
        approver = $13, decision_reason = $14, decided_at = $15
    WHERE tenant_id = $1 AND kind = $2 AND id = $3 AND status = $16
"#;

pub const REQUEST_STATUS: &str =
    "SELECT status FROM change_requests WHERE tenant_id = $1 AND kind = $2 AND id = $3";

pub const DELETE_REQUEST: &str =
    "DELETE FROM change_requests WHERE tenant_id = $1 AND kind = $2 AND id = $3 AND status = $4";

const INVENTORY_COLUMNS: &str = "tenant_id, kind, id, name, environment, team_id, config, \
     config_checksum, exists_on_cluster, provenance, description, version";

pub fn select_inventory_by_env() -> String {
    format!(
        "SELECT {} FROM inventory WHERE tenant_id = $1 AND kind = $2 AND environment = $3 ORDER BY name",
        INVENTORY_COLUMNS
    )
}

pub fn select_inventory_by_name() -> String {
    format!(
        "SELECT {} FROM inventory WHERE tenant_id = $1 AND kind = $2 AND name = $3 ORDER BY environment",
        INVENTORY_COLUMNS
    )
}

pub fn insert_inventory() -> String {
    format!(
        "INSERT INTO inventory ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1)",
        INVENTORY_COLUMNS
    )
}

/// Version CAS: `$12` is the version the caller read
pub const UPDATE_INVENTORY: &str = r#"
    UPDATE inventory SET
        name = $4, environment = $5, team_id = $6, config = $7, config_checksum = $8,
        exists_on_cluster = $9, provenance = $10, description = $11, version = version + 1
    WHERE tenant_id = $1 AND kind = $2 AND id = $3 AND version = $12
"#;

pub const DELETE_INVENTORY: &str =
    "DELETE FROM inventory WHERE tenant_id = $1 AND kind = $2 AND id = $3 AND version = $4";

pub const NEXT_SEQUENCE: &str = r#"
    INSERT INTO sequences (tenant_id, counter, value) VALUES ($1, $2, 1)
    ON CONFLICT (tenant_id, counter) DO UPDATE SET value = sequences.value + 1
    RETURNING value
"#;

pub const INSERT_ACTIVITY: &str = r#"
    INSERT INTO activity_log
        (id, tenant_id, environment, kind, resource_name, action, principal, team_id, details, logged_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
"#;

pub const SELECT_ACTIVITY: &str = r#"
    SELECT id, tenant_id, environment, kind, resource_name, action, principal, team_id, details, logged_at
    FROM activity_log
    WHERE tenant_id = $1 AND ($2::VARCHAR IS NULL OR environment = $2)
    ORDER BY logged_at DESC
"#;
