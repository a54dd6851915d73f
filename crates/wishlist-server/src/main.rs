mod api;
mod dispatch;
mod middleware;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    middleware::{AuthState, EnrichSecret},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = wishlist_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = wishlist_db::PoolConfig::from_app_config(&config);
    let pool = wishlist_db::connect_pool(&config.database_url, pool_config).await?;
    wishlist_db::run_migrations(&pool).await?;

    let enricher = wishlist_enricher::Enricher::from_settings(
        config.fetch_timeout_secs,
        &config.fetch_user_agent,
    )?;

    let auth = AuthState::from_env(config.is_development())?;
    let enrich_secret = EnrichSecret::new(config.enrich_secret.clone());
    let state = AppState {
        pool,
        enricher: Arc::new(enricher),
    };
    let app = build_app(state, auth, enrich_secret);

    tracing::info!(bind_addr = %config.bind_addr, env = %config.env, "starting wishlist server");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
