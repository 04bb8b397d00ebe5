use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::match_controller::MatchController;
use crate::dto::ApiResponse;
use crate::models::{Actor, Match, Ride};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_match_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_matches))
        .route("/:id", get(get_match))
        .route("/:id/accept", post(accept_match))
        .route("/:id/reject", post(reject_match))
}

async fn list_matches(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<Match>>>, AppError> {
    let controller = MatchController::new(&state);
    let response = controller.list(&actor).await?;
    Ok(Json(response))
}

async fn get_match(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Match>>, AppError> {
    let controller = MatchController::new(&state);
    let response = controller.get(&actor, id).await?;
    Ok(Json(response))
}

async fn accept_match(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Ride>>, AppError> {
    let controller = MatchController::new(&state);
    let response = controller.accept(&actor, id).await?;
    Ok(Json(response))
}

async fn reject_match(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Match>>, AppError> {
    let controller = MatchController::new(&state);
    let response = controller.reject(&actor, id).await?;
    Ok(Json(response))
}
