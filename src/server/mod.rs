//! # HTTP Facade
//!
//! A small web API over the rendering and export pipeline, for hosts that
//! keep the editor elsewhere and only need server-side rasterization.
//!
//! ## Usage
//!
//! ```bash
//! receiptsmith serve --listen 0.0.0.0:8080
//! ```

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::error::ReceiptError;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
}

/// Start the HTTP server.
pub async fn serve(config: ServerConfig) -> Result<(), ReceiptError> {
    let app = router();

    log::info!("listening on {}", config.listen_addr);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| {
            ReceiptError::Network(format!("failed to bind to {}: {}", config.listen_addr, e))
        })?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ReceiptError::Network(format!("server error: {}", e)))?;

    Ok(())
}

fn router() -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/preview", post(handlers::preview))
        .route("/api/export/image", post(handlers::export_image))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_builds() {
        let _ = router();
    }
}
