use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::driver_controller::DriverController;
use crate::dto::ride_dto::UpdateLocationRequest;
use crate::dto::ApiResponse;
use crate::models::{Actor, Driver};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_driver_router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_my_profile))
        .route("/me/location", post(update_my_location))
}

async fn get_my_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Driver>>, AppError> {
    let controller = DriverController::new(&state);
    let response = controller.me(&actor).await?;
    Ok(Json(response))
}

async fn update_my_location(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<Json<ApiResponse<Driver>>, AppError> {
    let controller = DriverController::new(&state);
    let response = controller.update_location(&actor, request).await?;
    Ok(Json(response))
}
