use axum::{routing::post, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::nonce::NonceManager;
use crate::storage::SqliteStore;

pub mod routes;

/// Server state
pub struct AppState {
    pub ctx: AppContext,
    pub store: Mutex<SqliteStore>,
    pub nonces: NonceManager,
}

impl AppState {
    pub fn new(ctx: AppContext, store: SqliteStore) -> Self {
        let nonces = NonceManager::from_config(&ctx.config.nonce);
        Self {
            ctx,
            store: Mutex::new(store),
            nonces,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/content-connect/search", post(routes::search))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, state: AppState) -> anyhow::Result<()> {
    let app = router(Arc::new(state));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
