use uuid::Uuid;
use validator::Validate;

use crate::dto::ride_dto::CompleteRideRequest;
use crate::dto::ApiResponse;
use crate::models::{Actor, Ride};
use crate::services::ride_lifecycle_service::{RideCompletion, RideLifecycleService};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct RideController {
    service: RideLifecycleService,
}

impl RideController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: RideLifecycleService::new(state.store.clone()),
        }
    }

    pub async fn list_mine(&self, actor: &Actor) -> Result<ApiResponse<Vec<Ride>>, AppError> {
        let rides = self.service.list_rides(actor).await?;
        Ok(ApiResponse::success(rides))
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<ApiResponse<Ride>, AppError> {
        let ride = self.service.get_ride(actor, id).await?;
        Ok(ApiResponse::success(ride))
    }

    pub async fn start(&self, actor: &Actor, id: Uuid) -> Result<ApiResponse<Ride>, AppError> {
        let ride = self.service.start_ride(actor, id).await?;
        Ok(ApiResponse::success_with_message(ride, "Ride started".to_string()))
    }

    pub async fn complete(
        &self,
        actor: &Actor,
        id: Uuid,
        request: CompleteRideRequest,
    ) -> Result<ApiResponse<Ride>, AppError> {
        request.validate()?;
        let completion = RideCompletion {
            amount_total: request.amount_total,
            end_lat: request.end_lat,
            end_lng: request.end_lng,
            end_address: request.end_address,
        };
        let ride = self.service.complete_ride(actor, id, completion).await?;
        Ok(ApiResponse::success_with_message(ride, "Ride completed".to_string()))
    }
}
