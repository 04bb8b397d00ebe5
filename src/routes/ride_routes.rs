use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::ride_controller::RideController;
use crate::dto::ride_dto::CompleteRideRequest;
use crate::dto::ApiResponse;
use crate::models::{Actor, Ride};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_ride_router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(list_my_rides))
        .route("/:id", get(get_ride))
        .route("/:id/start", post(start_ride))
        .route("/:id/complete", post(complete_ride))
}

async fn list_my_rides(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<Ride>>>, AppError> {
    let controller = RideController::new(&state);
    let response = controller.list_mine(&actor).await?;
    Ok(Json(response))
}

async fn get_ride(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Ride>>, AppError> {
    let controller = RideController::new(&state);
    let response = controller.get(&actor, id).await?;
    Ok(Json(response))
}

async fn start_ride(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Ride>>, AppError> {
    let controller = RideController::new(&state);
    let response = controller.start(&actor, id).await?;
    Ok(Json(response))
}

async fn complete_ride(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    body: Option<Json<CompleteRideRequest>>,
) -> Result<Json<ApiResponse<Ride>>, AppError> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let controller = RideController::new(&state);
    let response = controller.complete(&actor, id, request).await?;
    Ok(Json(response))
}
