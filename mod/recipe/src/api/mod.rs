mod comments;
mod engagement;
mod recipes;
mod workflow;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{ConnectInfo, Extension};
use axum::http::HeaderMap;

use cookery_core::Identity;

use crate::service::RecipeEngine;

/// Shared handler state.
pub type EngineState = Arc<RecipeEngine>;

/// Build the complete recipe module router.
///
/// Routes:
/// - `POST   /recipes`                    — create recipe (DRAFT)
/// - `GET    /recipes`                    — list visible recipes
/// - `GET    /recipes/{id}`               — get recipe
/// - `PATCH  /recipes/{id}`               — update title/nutrition
/// - `DELETE /recipes/{id}`               — delete recipe (cascades)
/// - `POST   /recipes/{id}/comments`      — post comment / reply
/// - `GET    /recipes/{id}/comments`      — nested thread, oldest-first
/// - `PATCH  /comments/{id}`              — edit comment
/// - `DELETE /comments/{id}`              — tombstone comment
/// - `POST   /recipes/{id}/like`          — toggle like
/// - `POST   /recipes/{id}/favorite`      — toggle favorite
/// - `POST   /recipes/{id}/view`          — record view (anonymous ok)
/// - `GET    /recipes/{id}/stats`         — engagement counters
/// - `POST   /recipes/{id}/submit`        — DRAFT → PROCESSING
/// - `POST   /recipes/{id}/approve`       — PENDING_REVIEW → PUBLISHED
/// - `POST   /recipes/{id}/reject`        — PENDING_REVIEW → DRAFT
/// - `POST   /recipes/{id}/unpublish`     — PUBLISHED → DRAFT
pub fn router(engine: Arc<RecipeEngine>) -> Router {
    Router::new()
        .merge(recipes::routes())
        .merge(comments::routes())
        .merge(engagement::routes())
        .merge(workflow::routes())
        .with_state(engine)
}

/// The caller's identity, as injected by the server's auth middleware.
/// Absent extension (module mounted without the middleware) means
/// anonymous — handlers enforce their own authentication rules.
pub(crate) fn identity(ext: Option<Extension<Identity>>) -> Identity {
    ext.map(|Extension(i)| i).unwrap_or(Identity::Anonymous)
}

/// Best-effort client address for view dedup: proxy headers first,
/// then the socket peer.
pub(crate) fn client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }
    if let Some(real) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return real.to_string();
    }
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
