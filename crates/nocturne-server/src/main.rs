use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use nocturne_api::AppStateInner;
use nocturne_db::Database;
use nocturne_gateway::Dispatcher;
use nocturne_server::build_router;
use nocturne_server::config::Config;
use nocturne_types::SystemClock;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nocturne=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.force_open {
        warn!("NOCTURNE_FORCE_OPEN is set: every window gate is disabled");
    }

    let db = Arc::new(Database::open(&PathBuf::from(&config.db_path))?);
    let state = Arc::new(AppStateInner {
        db,
        dispatcher: Dispatcher::new(),
        schedule: config.schedule,
        clock: Arc::new(SystemClock),
        force_open: config.force_open,
    });

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Nocturne server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
