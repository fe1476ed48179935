//! Startup sequence and the serve loop.
//!
//! Order matters: routes must be known before resources are reconciled, and
//! the admin identity must exist before the admin role can list it.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tally_access::{AdminConvergence, ConvergenceReport, ReconcileReport, ResourceRegistry};
use tally_auth::TokenCodec;
use tally_db::{DbManager, run_migrations};
use tracing::info;
use uuid::Uuid;

use crate::app::{AppState, route_table};
use crate::config::ServerConfig;

/// Everything produced by a successful startup.
pub struct Bootstrapped {
    pub router: Router,
    pub admin_id: Uuid,
    pub reconcile: ReconcileReport,
    pub convergence: ConvergenceReport,
}

pub async fn bootstrap(config: &ServerConfig) -> anyhow::Result<Bootstrapped> {
    let manager = DbManager::connect(&config.db)
        .await
        .context("connect to database")?;
    let db = manager.client().clone();
    let applied = run_migrations(&db).await.context("run migrations")?;
    if !applied.is_empty() {
        info!(?applied, "schema migrations applied");
    }

    let auth_config = config.auth_config();
    let codec = TokenCodec::from_key_file(&config.jwt_key_path, &auth_config)
        .with_context(|| format!("load signing key {}", config.jwt_key_path.display()))?;
    let state = AppState::new(db, Arc::new(codec), auth_config);

    let admin_id = state
        .auth
        .ensure_admin_identity(&config.admin_email, &config.admin_password)
        .await
        .context("ensure admin identity")?;

    let table = route_table(state.clone());
    let store = state.graph.store().clone();

    let reconcile = ResourceRegistry::new(store.clone())
        .reconcile(table.keys())
        .await
        .context("reconcile resources")?;

    let convergence = AdminConvergence::new(store, config.admin_settings())
        .converge(admin_id)
        .await
        .context("converge admin role and group")?;

    Ok(Bootstrapped {
        router: table.into_router(),
        admin_id,
        reconcile,
        convergence,
    })
}

pub async fn run_with_shutdown<F>(config: ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let booted = bootstrap(&config).await?;

    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!(%addr, "tally server listening");

    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, booted.router.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    info!("tally server stopped");
    Ok(())
}
