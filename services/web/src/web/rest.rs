//! services/web/src/web/rest.rs
//!
//! Contains the Axum handlers for the read-only REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::{LibraryItem, OutlineItem};
use axum::{extract::Query, response::Json};
use serde::{Deserialize, Serialize};
use unbound_core::{
    domain::{greeting_for, resolve_title},
    DOCUMENT_OUTLINE, LIBRARY,
};
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        outline_handler,
        library_handler,
        workspace_handler,
    ),
    components(
        schemas(HealthResponse, OutlineItem, LibraryItem, WorkspacePreview)
    ),
    tags(
        (name = "Unbound API", description = "Read-only data behind the dashboard and workspace screens.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Query Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Query string of the workspace route.
#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WorkspaceQuery {
    /// Display name of the document; omitted means a new, untitled document.
    pub file_name: Option<String>,
}

/// What the workspace shows before any chat has happened.
#[derive(Serialize, ToSchema)]
pub struct WorkspacePreview {
    pub title: String,
    pub greeting: String,
    pub outline: Vec<OutlineItem>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// The fixed table of contents shown next to every document.
#[utoipa::path(
    get,
    path = "/outline",
    responses((status = 200, description = "Document outline", body = [OutlineItem]))
)]
pub async fn outline_handler() -> Json<Vec<OutlineItem>> {
    Json(DOCUMENT_OUTLINE.iter().map(OutlineItem::from).collect())
}

/// Previously opened documents listed on the dashboard.
#[utoipa::path(
    get,
    path = "/library",
    responses((status = 200, description = "Library entries", body = [LibraryItem]))
)]
pub async fn library_handler() -> Json<Vec<LibraryItem>> {
    Json(LibraryItem::listing(&LIBRARY))
}

/// Resolves the workspace route's `fileName` parameter into the opening view.
#[utoipa::path(
    get,
    path = "/workspace",
    params(WorkspaceQuery),
    responses((status = 200, description = "Workspace preview", body = WorkspacePreview))
)]
pub async fn workspace_handler(Query(query): Query<WorkspaceQuery>) -> Json<WorkspacePreview> {
    let title = resolve_title(query.file_name.as_deref());
    Json(WorkspacePreview {
        greeting: greeting_for(&title),
        title,
        outline: DOCUMENT_OUTLINE.iter().map(OutlineItem::from).collect(),
    })
}
