//! Cableado del servidor: selección de store, router y arranque.
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tracing::info;
use trial_api::{build_router, ApiState, SharedStore};
use trial_core::InMemoryTrialStore;
use trial_persistence::{build_dev_pool_from_env, DbConfig, PgTrialStore, PoolProvider};

use crate::config::{AppConfig, StorageMode};

/// Abre el store indicado. Devuelve también el nombre del backend elegido.
pub fn open_store(mode: StorageMode) -> Result<(SharedStore, &'static str)> {
    let use_postgres = match mode {
        StorageMode::Memory => false,
        StorageMode::Postgres => true,
        StorageMode::Auto => DbConfig::is_configured(),
    };
    if !use_postgres {
        return Ok((Arc::new(InMemoryTrialStore::new()), "memory"));
    }
    let pool = build_dev_pool_from_env().context("storage=postgres requires a reachable DATABASE_URL")?;
    Ok((Arc::new(PgTrialStore::new(PoolProvider { pool })), "postgres"))
}

pub fn build_app(config: &AppConfig, store: SharedStore) -> Router {
    build_router(ApiState::new(store, config.policy, config.public_url.clone()))
}

pub async fn serve(config: AppConfig) -> Result<()> {
    let (store, backend) = open_store(config.storage)?;
    info!(backend,
          enforce_step_order = config.policy.enforce_step_order,
          validate_fields = config.policy.validate_fields,
          "trial store ready");
    let app = build_app(&config, store);
    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("cannot bind {}", config.listen))?;
    info!("trialflow listening on http://{}", config.listen);
    axum::serve(listener, app).await?;
    Ok(())
}
