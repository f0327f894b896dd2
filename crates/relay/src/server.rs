//! Router assembly and the listening loop

use crate::chat::chat_completion;
use crate::error::{RelayError, RelayResult};
use crate::state::RelayState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

/// Builds the relay router.
///
/// `/audios` is only mounted when `relay.asset_dir` is set; `ServeDir`
/// answers byte-range requests.
pub fn router(state: RelayState) -> Router {
    let mut router = Router::new()
        .route("/api/openai", post(chat_completion))
        .route("/health", get(health));

    if let Some(dir) = &state.config().asset_dir {
        log::info!("Serving audio assets from {}", dir.display());
        router = router.nest_service("/audios", ServeDir::new(dir));
    }

    router.layer(CorsLayer::permissive()).with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Binds `relay.listen_address()` and serves until Ctrl-C
pub async fn serve(state: RelayState) -> RelayResult<()> {
    let address = state.config().listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| RelayError::Bind {
            address: address.clone(),
            source,
        })?;

    serve_on(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for shutdown signal: {}", e);
        }
    })
    .await
}

/// Serves on an already bound listener until `shutdown` completes
pub async fn serve_on<F>(listener: TcpListener, state: RelayState, shutdown: F) -> RelayResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    match listener.local_addr() {
        Ok(addr) => log::info!("Relay running on {}", addr),
        Err(e) => log::warn!("Relay running on an unknown address: {}", e),
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(RelayError::Serve)?;

    log::info!("Relay stopped");
    Ok(())
}
