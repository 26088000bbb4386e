use crate::api;
use crate::cli::commands::ServeArgs;
use crate::config::BreachwatchConfig;
use crate::errors::BreachwatchError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn handle_serve(args: ServeArgs, mut config: BreachwatchConfig) -> Result<(), BreachwatchError> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(addr = %addr, db = %config.database.path, "Starting API server");

    let state = api::create_app_state(config)?;
    if state.api_token.is_none() {
        warn!("{} is not set; the API accepts unauthenticated requests", api::auth::API_TOKEN_ENV);
    }
    let app = api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        signal.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| BreachwatchError::Internal(format!("Server error: {}", e)))?;

    info!("Server stopped");
    Ok(())
}
