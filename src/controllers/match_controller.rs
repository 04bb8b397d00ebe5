use uuid::Uuid;

use crate::dto::ApiResponse;
use crate::models::{Actor, Match, Ride};
use crate::services::match_service::MatchService;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct MatchController {
    service: MatchService,
}

impl MatchController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: MatchService::new(state.store.clone(), state.dispatch.clone()),
        }
    }

    pub async fn list(&self, actor: &Actor) -> Result<ApiResponse<Vec<Match>>, AppError> {
        let matches = self.service.list_matches(actor).await?;
        Ok(ApiResponse::success(matches))
    }

    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<ApiResponse<Match>, AppError> {
        let found = self.service.get_match(actor, id).await?;
        Ok(ApiResponse::success(found))
    }

    pub async fn accept(&self, actor: &Actor, id: Uuid) -> Result<ApiResponse<Ride>, AppError> {
        let ride = self.service.accept_match(actor, id).await?;
        Ok(ApiResponse::success_with_message(ride, "Match accepted".to_string()))
    }

    pub async fn reject(&self, actor: &Actor, id: Uuid) -> Result<ApiResponse<Match>, AppError> {
        let rejected = self.service.reject_match(actor, id).await?;
        Ok(ApiResponse::success_with_message(rejected, "Match rejected".to_string()))
    }
}
