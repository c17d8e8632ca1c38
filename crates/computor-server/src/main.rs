//! Worker-and-front-door process: connects to the database, builds the
//! GHG/CSG capabilities, registers every HP/AD/TG workflow body with
//! the in-process DWE adapter, and serves the §6 HTTP surface.

use std::path::PathBuf;
use std::sync::Arc;

use computor_git::GitLabClient;
use computor_server::config::ServerConfig;
use computor_server::state::{register_workflows, AppState};
use computor_storage::{ContentStoreGateway, S3Backend};
use computor_workflow::executor::DurableExecutor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    computor_core::logging::init_tracing();

    let config_path = std::env::var("COMPUTOR_SERVER_CONFIG").ok();
    let config = ServerConfig::load(config_path.as_deref())?;

    let db = sea_orm::Database::connect(&config.database_url).await?;
    let git = Arc::new(GitLabClient::new(config.gitlab.url.clone(), config.gitlab.token.clone()));
    let backend = S3Backend::new(
        &config.object_store.endpoint,
        &config.object_store.bucket,
        &config.object_store.access_key,
        &config.object_store.secret_key,
    )?;
    let storage = Arc::new(ContentStoreGateway::new(backend, config.object_store.bucket.clone()));
    let executor = Arc::new(DurableExecutor::new());

    let state = Arc::new(AppState {
        db,
        git,
        storage,
        executor,
        worktree_root: PathBuf::from(config.worktree_root.clone()),
    });
    register_workflows(&state);

    let app = computor_server::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    tracing::info!(bind_address = %config.bind_address, "computor-server listening");
    axum::serve(listener, app).await?;

    state.executor.shutdown().await;
    Ok(())
}
