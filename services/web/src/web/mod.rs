pub mod protocol;
pub mod rest;
pub mod state;
pub mod tasks;
pub mod ws_handler;

// Re-export the handlers the binary wires into the router.
pub use rest::{health_handler, library_handler, outline_handler, workspace_handler};
pub use ws_handler::ws_handler;

use axum::{
    http::{header::ACCEPT, HeaderValue, Method},
    routing::get,
    Router,
};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

/// Builds the application router: the WebSocket endpoint plus the read-only REST routes.
pub fn router(app_state: Arc<AppState>) -> Router {
    let cors = match app_state.config.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET])
            .allow_headers([ACCEPT]),
        Err(_) => {
            warn!(
                "ALLOWED_ORIGIN '{}' is not a valid header value; CORS disabled.",
                app_state.config.allowed_origin
            );
            CorsLayer::new()
        }
    };

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/outline", get(outline_handler))
        .route("/library", get(library_handler))
        .route("/workspace", get(workspace_handler))
        .layer(cors)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        adapters::{MemoryPreferenceStore, ScriptedTutor},
        config::Config,
    };
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let app_state = Arc::new(AppState {
            config: Arc::new(Config::from_lookup(|_| None).unwrap()),
            preferences: Arc::new(MemoryPreferenceStore::new()),
            tutor: Arc::new(ScriptedTutor::new()),
        });
        router(app_state)
    }

    async fn get_json(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get_json("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn outline_lists_six_entries() {
        let (status, body) = get_json("/outline").await;
        assert_eq!(status, StatusCode::OK);
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 6);
        assert_eq!(entries[0]["title"], "Executive Summary");
        assert_eq!(entries[3]["page"], 5);
    }

    #[tokio::test]
    async fn library_lists_previous_documents() {
        let (_, body) = get_json("/library").await;
        let entries = body.as_array().unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0]["name"], "Biology_Notes_Ch3.pdf");
        assert_eq!(entries[3]["index"], 3);
    }

    #[tokio::test]
    async fn workspace_title_defaults_when_parameter_missing() {
        let (_, body) = get_json("/workspace").await;
        assert_eq!(body["title"], "New Document");

        let (_, body) = get_json("/workspace?fileName=Report%202.pdf").await;
        assert_eq!(body["title"], "Report 2.pdf");
        assert_eq!(
            body["greeting"],
            "Hello! I am your AI assistant. I've analyzed \"Report 2.pdf\". Ask me anything about it."
        );
        assert_eq!(body["outline"].as_array().unwrap().len(), 6);
    }
}
