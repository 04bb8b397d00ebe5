use validator::Validate;

use crate::dto::ride_dto::UpdateLocationRequest;
use crate::dto::ApiResponse;
use crate::models::{Actor, Driver};
use crate::services::driver_service::DriverService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct DriverController {
    drivers: DriverService,
}

impl DriverController {
    pub fn new(state: &AppState) -> Self {
        Self {
            drivers: DriverService::new(state.store.clone()),
        }
    }

    pub async fn me(&self, actor: &Actor) -> Result<ApiResponse<Driver>, AppError> {
        let driver = self.drivers.profile_for(actor).await?;
        Ok(ApiResponse::success(driver))
    }

    pub async fn update_location(
        &self,
        actor: &Actor,
        request: UpdateLocationRequest,
    ) -> Result<ApiResponse<Driver>, AppError> {
        request.validate()?;
        let driver = self
            .drivers
            .update_location(actor, request.lat, request.lng, request.vehicle_id)
            .await?;
        Ok(ApiResponse::success(driver))
    }
}
