use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::controllers::ride_request_controller::RideRequestController;
use crate::dto::ride_dto::{
    CreateRideRequestRequest, CreatedRideRequestResponse, QuoteRequest, QuoteResponse,
    SubmitOfferRequest,
};
use crate::dto::ApiResponse;
use crate::models::{Actor, NegotiationOffer, RideRequest};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_ride_request_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_ride_request))
        .route("/mine", get(list_my_ride_requests))
        .route("/quote", post(quote))
        .route("/:id", get(get_ride_request))
        .route("/:id/cancel", post(cancel_ride_request))
        .route("/:id/offers", post(submit_offer).get(list_offers))
}

pub fn create_offer_router() -> Router<AppState> {
    Router::new().route("/", get(list_my_offers))
}

async fn create_ride_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateRideRequestRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CreatedRideRequestResponse>>), AppError> {
    let controller = RideRequestController::new(&state);
    let response = controller.create(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_my_ride_requests(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<RideRequest>>>, AppError> {
    let controller = RideRequestController::new(&state);
    let response = controller.list_mine(&actor).await?;
    Ok(Json(response))
}

async fn quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<ApiResponse<QuoteResponse>>, AppError> {
    let controller = RideRequestController::new(&state);
    let response = controller.quote(request).await?;
    Ok(Json(response))
}

async fn get_ride_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RideRequest>>, AppError> {
    let controller = RideRequestController::new(&state);
    let response = controller.get(&actor, id).await?;
    Ok(Json(response))
}

async fn cancel_ride_request(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RideRequest>>, AppError> {
    let controller = RideRequestController::new(&state);
    let response = controller.cancel(&actor, id).await?;
    Ok(Json(response))
}

async fn submit_offer(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
    Json(request): Json<SubmitOfferRequest>,
) -> Result<(StatusCode, Json<ApiResponse<NegotiationOffer>>), AppError> {
    let controller = RideRequestController::new(&state);
    let response = controller.submit_offer(&actor, id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn list_offers(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<NegotiationOffer>>>, AppError> {
    let controller = RideRequestController::new(&state);
    let response = controller.list_offers(&actor, id).await?;
    Ok(Json(response))
}

async fn list_my_offers(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<ApiResponse<Vec<NegotiationOffer>>>, AppError> {
    let controller = RideRequestController::new(&state);
    let response = controller.list_my_offers(&actor).await?;
    Ok(Json(response))
}
