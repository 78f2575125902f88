use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Extension, Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};

use cookery_core::{Identity, ServiceError};

use super::{EngineState, client_ip, identity};
use crate::model::{FavoriteState, LikeState, RecipeStats, ViewOutcome};

pub fn routes() -> Router<EngineState> {
    Router::new()
        .route("/recipes/{id}/like", post(toggle_like))
        .route("/recipes/{id}/favorite", post(toggle_favorite))
        .route("/recipes/{id}/view", post(record_view))
        .route("/recipes/{id}/stats", get(recipe_stats))
}

async fn toggle_like(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<LikeState>, ServiceError> {
    Ok(Json(engine.toggle_like(&identity(ident), recipe_id)?))
}

async fn toggle_favorite(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<FavoriteState>, ServiceError> {
    Ok(Json(engine.toggle_favorite(&identity(ident), recipe_id)?))
}

async fn record_view(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    Path(recipe_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<ViewOutcome>, ServiceError> {
    let ip = client_ip(&headers, connect_info.as_ref().map(|ext| &ext.0));
    Ok(Json(engine.record_view(&identity(ident), recipe_id, &ip)?))
}

async fn recipe_stats(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<RecipeStats>, ServiceError> {
    Ok(Json(engine.recipe_stats(&identity(ident), recipe_id)?))
}
