use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::pricing_config_controller::PricingConfigController;
use crate::dto::pricing_dto::{CreatePricingConfigRequest, UpdatePricingConfigRequest};
use crate::dto::ApiResponse;
use crate::models::{Actor, PricingConfig};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_pricing_config_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_pricing_configs).post(create_pricing_config))
        .route("/:id", put(update_pricing_config))
}

async fn list_pricing_configs(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<PricingConfig>>>, AppError> {
    let controller = PricingConfigController::new(&state);
    let response = controller.list(&actor).await?;
    Ok(Json(response))
}

async fn create_pricing_config(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreatePricingConfigRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PricingConfig>>), AppError> {
    let controller = PricingConfigController::new(&state);
    let response = controller.create(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn update_pricing_config(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePricingConfigRequest>,
) -> Result<Json<ApiResponse<PricingConfig>>, AppError> {
    let controller = PricingConfigController::new(&state);
    let response = controller.update(&actor, id, request).await?;
    Ok(Json(response))
}
