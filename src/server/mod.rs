pub mod api;
pub mod routes;

use thiserror::Error;

use crate::engine::Engine;
use crate::settings::Settings;

pub use api::AppState;
pub use routes::router;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to start runtime: {0}")]
    Runtime(std::io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}

/// Load the dataset and serve the API until the process is stopped. A failed initial load is
/// logged and the server starts with empty tables; `POST /api/reload` retries.
pub fn run_server(settings: &Settings) -> Result<(), ServerError> {
    let mut engine = Engine::new(settings);
    if let Err(err) = engine.reload() {
        tracing::warn!(error = %err, "initial dataset load failed");
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ServerError::Runtime)?;

    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(settings.bind.as_str())
            .await
            .map_err(|source| ServerError::Bind {
                addr: settings.bind.clone(),
                source,
            })?;
        tracing::info!(bind = %settings.bind, "pdq server listening");
        axum::serve(listener, router(AppState::new(engine)))
            .await
            .map_err(ServerError::Serve)
    })
}
