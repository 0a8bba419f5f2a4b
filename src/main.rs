//! ClusterFlow API - Messaging Cluster Governance
//!
//! Teams request topics, ACLs and connectors on shared Kafka and Kafka Connect
//! clusters; approvers decide; operators reconcile the managed inventory with
//! what actually runs on each cluster.
//!
//! - Request lifecycle: submit, approve (cluster first, then inventory), decline, withdraw
//! - Reconciliation: managed vs live listing with ADDED / IN_SYNC / DELETED remarks
//! - Bulk sync: adopt, re-own or drop inventory entries in one atomic batch
//!
//! Without `DATABASE_URL` the inventory lives in memory, and without
//! `CLUSTER_API_URL` clusters are simulated in memory.

mod auth;
mod cluster;
mod config;
mod context;
mod directory;
mod domain;
mod error;
mod lifecycle;
mod models;
mod ownership;
mod paging;
mod reconcile;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;

use crate::cluster::{ClusterAgent, HttpClusterAgent, MemoryCluster};
use crate::config::{DatabaseConfig, Settings};
use crate::directory::StaticDirectory;
use crate::routes::create_router;
use crate::state::AppState;
use crate::store::{InventoryStore, MemoryStore, PgStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("Starting ClusterFlow - Messaging Cluster Governance...");

    let settings = Settings::load()?;
    info!("Configuration loaded");

    let directory = Arc::new(StaticDirectory::load(&settings.directory_file)?);

    let store: Arc<dyn InventoryStore> = match &settings.database {
        Some(database) => {
            let pool = init_database_pool(database).await?;
            let store = PgStore::new(pool);
            store.init_schema().await?;
            info!("Inventory store: PostgreSQL");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set, keeping the inventory in memory (lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    let cluster: Arc<dyn ClusterAgent> = match &settings.cluster_api {
        Some(api) => {
            info!("Cluster API: {}", api.url);
            Arc::new(HttpClusterAgent::new(api)?)
        }
        None => {
            warn!("CLUSTER_API_URL not set, simulating clusters in memory");
            Arc::new(MemoryCluster::new())
        }
    };

    let state = Arc::new(AppState::new(
        store,
        cluster,
        directory,
        settings.jwt_secret.clone(),
    ));

    // Build the router
    let app = create_router(state, &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));
    info!("Server listening on http://{}", addr);
    info!("   POST /api/{{kind}}/requests              - Submit a change request");
    info!("   POST /api/{{kind}}/requests/{{id}}/approve - Approve (applies to the cluster)");
    info!("   GET  /api/{{kind}}/sync?env=             - Reconcile view");
    info!("   POST /api/{{kind}}/sync                  - Apply a bulk sync");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,clusterflow_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Initialize the metadata store pool
async fn init_database_pool(database: &DatabaseConfig) -> anyhow::Result<deadpool_postgres::Pool> {
    let config = database
        .url
        .parse::<tokio_postgres::Config>()
        .map_err(|e| anyhow::anyhow!("Failed to parse DATABASE_URL: {}", e))?;

    let host_str = match config.get_hosts().first() {
        Some(tokio_postgres::config::Host::Tcp(s)) => s.clone(),
        Some(_) => return Err(anyhow::anyhow!("Unix socket connections are not supported")),
        None => return Err(anyhow::anyhow!("No host in DATABASE_URL")),
    };
    let port = config.get_ports().first().copied().unwrap_or(5432);

    let user = config
        .get_user()
        .map(|u| u.to_string())
        .ok_or_else(|| anyhow::anyhow!("No user in DATABASE_URL"))?;
    let password = config
        .get_password()
        .map(|p| String::from_utf8_lossy(p).to_string())
        .unwrap_or_default();
    let dbname = config
        .get_dbname()
        .map(|db| db.to_string())
        .ok_or_else(|| anyhow::anyhow!("No database name in DATABASE_URL"))?;

    let use_tls = database.url.contains("sslmode=require");

    use deadpool_postgres::{Config, ManagerConfig, PoolConfig, RecyclingMethod};

    let mut cfg = Config::new();
    cfg.host = Some(host_str);
    cfg.port = Some(port);
    cfg.user = Some(user);
    cfg.password = Some(password);
    cfg.dbname = Some(dbname);
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(PoolConfig::new(database.max_pool_size));

    let pool = if use_tls {
        let certs = rustls_native_certs::load_native_certs();
        let mut root_store = rustls::RootCertStore::empty();
        for cert in certs.certs {
            root_store.add(cert).ok();
        }

        let tls_config = rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();

        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);

        cfg.create_pool(Some(deadpool_postgres::Runtime::Tokio1), tls)
            .map_err(|e| anyhow::anyhow!("Failed to create TLS pool: {}", e))?
    } else {
        cfg.create_pool(Some(deadpool_postgres::Runtime::Tokio1), tokio_postgres::NoTls)
            .map_err(|e| anyhow::anyhow!("Failed to create pool: {}", e))?
    };

    let client = pool
        .get()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to get pool connection: {}", e))?;
    client
        .query_one("SELECT 1 as ok", &[])
        .await
        .map_err(|e| anyhow::anyhow!("Failed to verify database connection: {}", e))?;

    info!("Database connection successful (TLS: {})", use_tls);
    Ok(pool)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        },
    }
}
