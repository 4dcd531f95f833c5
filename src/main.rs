use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};

use order_desk as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    if cfg.auto_migrate {
        // never fatal; failures are logged with their kind
        api::db::run_startup_migrations(&db_pool).await;
    } else {
        info!("Automatic migrations disabled");
    }

    let addr = cfg.bind_address();
    if cfg.cors_allow_any_origin {
        warn!("Permissive CORS enabled");
    }

    let state = api::AppState::new(Arc::new(db_pool), cfg);
    let db = state.db.clone();
    let app = api::app(state);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("order-desk listening on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // closes the pool shared with every clone of `db`
    api::db::close_pool(db.as_ref().clone())
        .await
        .context("failed to close database pool")?;
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
