use axum::routing::{get, post};
use axum::Router;

use crate::server::api::{self, AppState};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/reload", post(api::reload))
        .route("/api/calculate/batch", post(api::start_batch))
        .route("/api/calculate/status", get(api::batch_status))
        .route("/api/output/files", get(api::output_files))
        .route("/api/output/:filename", get(api::output_file))
        .with_state(state)
}
