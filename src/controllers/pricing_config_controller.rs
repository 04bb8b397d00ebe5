use uuid::Uuid;
use validator::Validate;

use crate::dto::pricing_dto::{CreatePricingConfigRequest, UpdatePricingConfigRequest};
use crate::dto::ApiResponse;
use crate::models::{Actor, PricingConfig};
use crate::services::pricing_service::PricingService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct PricingConfigController {
    service: PricingService,
}

impl PricingConfigController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: PricingService::new(state.store.clone()),
        }
    }

    pub async fn list(&self, actor: &Actor) -> Result<ApiResponse<Vec<PricingConfig>>, AppError> {
        let configs = self.service.list_configs(actor).await?;
        Ok(ApiResponse::success(configs))
    }

    pub async fn create(
        &self,
        actor: &Actor,
        request: CreatePricingConfigRequest,
    ) -> Result<ApiResponse<PricingConfig>, AppError> {
        request.validate()?;
        let created = self.service.create_config(actor, request.into_config()).await?;
        Ok(ApiResponse::success_with_message(
            created,
            "Pricing config created".to_string(),
        ))
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        request: UpdatePricingConfigRequest,
    ) -> Result<ApiResponse<PricingConfig>, AppError> {
        request.validate()?;
        let updated = self
            .service
            .update_config(actor, id, move |config| request.apply(config))
            .await?;
        Ok(ApiResponse::success_with_message(
            updated,
            "Pricing config updated".to_string(),
        ))
    }
}
