use uuid::Uuid;
use validator::Validate;

use crate::dto::ride_dto::{
    CreateRideRequestRequest, CreatedRideRequestResponse, QuoteRequest, QuoteResponse,
    SubmitOfferRequest,
};
use crate::dto::ApiResponse;
use crate::models::{Actor, NegotiationOffer, RideRequest};
use crate::services::negotiation_service::NegotiationService;
use crate::services::pricing_service::PricingService;
use crate::services::request_service::RequestService;
use crate::services::ride_lifecycle_service::RideLifecycleService;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::geo::GeoPoint;

pub struct RideRequestController {
    requests: RequestService,
    lifecycle: RideLifecycleService,
    pricing: PricingService,
    negotiation: NegotiationService,
}

impl RideRequestController {
    pub fn new(state: &AppState) -> Self {
        Self {
            requests: RequestService::new(state.store.clone(), state.dispatch.clone()),
            lifecycle: RideLifecycleService::new(state.store.clone()),
            pricing: PricingService::new(state.store.clone()),
            negotiation: NegotiationService::new(state.store.clone(), state.dispatch.clone()),
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateRideRequestRequest,
    ) -> Result<ApiResponse<CreatedRideRequestResponse>, AppError> {
        request.validate()?;
        let created = self
            .requests
            .create_ride_request(actor, request.into_new_request(actor.user_id))
            .await?;

        let message = format!("Ride request created with {} candidate driver(s)", created.candidates);
        Ok(ApiResponse::success_with_message(
            CreatedRideRequestResponse {
                request: created.request,
                candidates: created.candidates,
            },
            message,
        ))
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<ApiResponse<RideRequest>, AppError> {
        let request = self.requests.get_ride_request(actor, id).await?;
        Ok(ApiResponse::success(request))
    }

    pub async fn list_mine(&self, actor: &Actor) -> Result<ApiResponse<Vec<RideRequest>>, AppError> {
        let requests = self.requests.list_my_requests(actor).await?;
        Ok(ApiResponse::success(requests))
    }

    pub async fn cancel(&self, actor: &Actor, id: Uuid) -> Result<ApiResponse<RideRequest>, AppError> {
        let canceled = self.lifecycle.cancel_ride_request(actor, id).await?;
        Ok(ApiResponse::success_with_message(
            canceled,
            "Ride request canceled".to_string(),
        ))
    }

    pub async fn quote(&self, request: QuoteRequest) -> Result<ApiResponse<QuoteResponse>, AppError> {
        request.validate()?;
        let quote = self
            .pricing
            .quote(
                GeoPoint::new(request.pickup_lat, request.pickup_lng),
                GeoPoint::new(request.dropoff_lat, request.dropoff_lng),
                request.city.trim(),
                request.vehicle_type.trim(),
            )
            .await?;

        let detail = matches!(quote.mode, crate::models::PricingMode::Negotiated)
            .then(|| "Negotiated mode: no metered quote.".to_string());
        Ok(ApiResponse::success(QuoteResponse { quote, detail }))
    }

    pub async fn submit_offer(
        &self,
        actor: &Actor,
        request_id: Uuid,
        request: SubmitOfferRequest,
    ) -> Result<ApiResponse<NegotiationOffer>, AppError> {
        request.validate()?;
        let offer = self
            .negotiation
            .submit_offer(actor, request_id, request.role, request.amount)
            .await?;
        Ok(ApiResponse::success_with_message(offer, "Offer submitted".to_string()))
    }

    pub async fn list_offers(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> Result<ApiResponse<Vec<NegotiationOffer>>, AppError> {
        let offers = self.negotiation.list_offers_for_request(actor, request_id).await?;
        Ok(ApiResponse::success(offers))
    }

    /// Ofertas hechas por el actor, como pasajero o conductor
    pub async fn list_my_offers(&self, actor: &Actor) -> Result<ApiResponse<Vec<NegotiationOffer>>, AppError> {
        let offers = self.negotiation.list_my_offers(actor).await?;
        Ok(ApiResponse::success(offers))
    }
}
