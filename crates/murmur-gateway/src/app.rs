use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};

use murmur_core::config::MurmurConfig;
use murmur_extensions::ExtensionRegistry;
use murmur_ipc::IpcHandle;

/// Central shared state — passed as Arc<AppState> to all Axum handlers and
/// to the text server.
pub struct AppState {
    pub config: MurmurConfig,
    pub registry: Arc<ExtensionRegistry>,
    pub ipc: IpcHandle,
    pub started: Instant,
}

impl AppState {
    pub fn new(config: MurmurConfig, registry: Arc<ExtensionRegistry>, ipc: IpcHandle) -> Self {
        Self {
            config,
            registry,
            ipc,
            started: Instant::now(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ipc/{platform}", post(crate::http::ipc::ipc_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
