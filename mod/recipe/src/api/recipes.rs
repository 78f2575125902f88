use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use cookery_core::{Identity, ListParams, ListResult, ServiceError};

use super::{EngineState, identity};
use crate::model::{CreateRecipeRequest, Recipe, UpdateRecipeRequest};

pub fn routes() -> Router<EngineState> {
    Router::new()
        .route("/recipes", post(create_recipe).get(list_recipes))
        .route(
            "/recipes/{id}",
            get(get_recipe).patch(update_recipe).delete(delete_recipe),
        )
}

async fn create_recipe(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Json(req): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<Recipe>), ServiceError> {
    let recipe = engine.create_recipe(&identity(ident), req)?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn list_recipes(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResult<Recipe>>, ServiceError> {
    Ok(Json(engine.list_recipes(&identity(ident), &params)?))
}

async fn get_recipe(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(id): Path<i64>,
) -> Result<Json<Recipe>, ServiceError> {
    Ok(Json(engine.get_recipe(&identity(ident), id)?))
}

async fn update_recipe(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(id): Path<i64>,
    Json(patch): Json<UpdateRecipeRequest>,
) -> Result<Json<Recipe>, ServiceError> {
    Ok(Json(engine.update_recipe(&identity(ident), id, patch)?))
}

async fn delete_recipe(
    State(engine): State<EngineState>,
    ident: Option<Extension<Identity>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ServiceError> {
    engine.delete_recipe(&identity(ident), id)?;
    Ok(StatusCode::NO_CONTENT)
}
