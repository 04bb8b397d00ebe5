//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::config::{DispatchConfig, EnvironmentConfig};
use crate::repositories::DispatchStore;
use crate::services::jwt_service::JwtService;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DispatchStore>,
    pub config: EnvironmentConfig,
    pub dispatch: DispatchConfig,
    pub jwt: Arc<JwtService>,
}

impl AppState {
    pub fn new(store: Arc<dyn DispatchStore>, config: EnvironmentConfig, dispatch: DispatchConfig) -> Self {
        let jwt = Arc::new(JwtService::new(&config.jwt_secret, config.jwt_expiration));
        Self {
            store,
            config,
            dispatch,
            jwt,
        }
    }
}
