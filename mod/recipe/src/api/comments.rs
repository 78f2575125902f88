use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};

use cookery_core::{Identity, ServiceError};

use super::{EngineState, identity};
use crate::model::{Comment, CommentNode, EditCommentRequest, PostCommentRequest};

pub fn routes() -> Router<EngineState> {
    Router::new()
        .route(
            "/recipes/{id}/comments",
            get(list_thread).post(post_comment),
        )
        .route("/comments/{id}", patch(edit_comment).delete(delete_comment))
}

async fn post_comment(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(recipe_id): Path<i64>,
    Json(req): Json<PostCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ServiceError> {
    let comment = engine.post_comment(&identity(ident), recipe_id, req)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn list_thread(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(recipe_id): Path<i64>,
) -> Result<Json<Vec<CommentNode>>, ServiceError> {
    Ok(Json(engine.list_thread(&identity(ident), recipe_id)?))
}

async fn edit_comment(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(comment_id): Path<i64>,
    Json(req): Json<EditCommentRequest>,
) -> Result<Json<Comment>, ServiceError> {
    Ok(Json(engine.edit_comment(&identity(ident), comment_id, req)?))
}

async fn delete_comment(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(comment_id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    engine.delete_comment(&identity(ident), comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}
