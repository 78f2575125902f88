use axum::extract::{Extension, Path, State};
use axum::routing::post;
use axum::{Json, Router};

use cookery_core::{Identity, ServiceError};

use super::{EngineState, identity};
use crate::model::{RejectRequest, TransitionOutcome};

pub fn routes() -> Router<EngineState> {
    Router::new()
        .route("/recipes/{id}/submit", post(submit))
        .route("/recipes/{id}/approve", post(approve))
        .route("/recipes/{id}/reject", post(reject))
        .route("/recipes/{id}/unpublish", post(unpublish))
}

async fn submit(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<TransitionOutcome>, ServiceError> {
    Ok(Json(engine.submit(&identity(ident), recipe_id)?))
}

async fn approve(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<TransitionOutcome>, ServiceError> {
    Ok(Json(engine.approve(&identity(ident), recipe_id)?))
}

async fn reject(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(recipe_id): Path<i64>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<TransitionOutcome>, ServiceError> {
    let reason = body.and_then(|Json(req)| req.reason);
    Ok(Json(engine.reject(&identity(ident), recipe_id, reason)?))
}

async fn unpublish(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<TransitionOutcome>, ServiceError> {
    Ok(Json(engine.unpublish(&identity(ident), recipe_id)?))
}
