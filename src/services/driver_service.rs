//! Perfil del conductor autenticado
//!
//! Resolución actor -> Driver y actualización de la instantánea de posición.
//! La disponibilidad nunca se toca desde aquí.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::{Actor, Driver};
use crate::repositories::DispatchStore;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::validation::validate_coordinates;

#[derive(Clone)]
pub struct DriverService {
    store: Arc<dyn DispatchStore>,
}

impl DriverService {
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self { store }
    }

    /// Perfil de conductor del actor; sólo actores con rol driver
    pub async fn profile_for(&self, actor: &Actor) -> AppResult<Driver> {
        if !actor.is_driver() {
            return Err(AppError::Unauthorized(
                "Only drivers can perform this action.".to_string(),
            ));
        }
        self.store
            .find_driver_by_user(actor.user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No driver profile for user '{}'", actor.user_id))
            })
    }

    /// Nueva posición del conductor; crea el perfil en el primer reporte
    pub async fn update_location(
        &self,
        actor: &Actor,
        lat: f64,
        lng: f64,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Driver> {
        validate_coordinates(lat, lng)?;

        let driver = match self.profile_for(actor).await {
            Ok(driver) => self.move_driver(driver, lat, lng, vehicle_id).await?,
            Err(AppError::NotFound(_)) => {
                let driver = Driver::new(actor.user_id, vehicle_id).at(lat, lng);
                match self.store.insert_driver(&driver).await {
                    Ok(created) => {
                        log::info!("🆕 Perfil de conductor {} creado para el usuario {}", created.id, actor.user_id);
                        created
                    }
                    // Otro reporte simultáneo creó el perfil primero
                    Err(AppError::Conflict(_)) => {
                        let existing = self.profile_for(actor).await?;
                        self.move_driver(existing, lat, lng, vehicle_id).await?
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        log::debug!("📍 Conductor {} en ({}, {})", driver.id, lat, lng);
        Ok(driver)
    }

    /// Escribe sólo vehículo y posición: disponibilidad y contadores los
    /// gestionan la aceptación y el ciclo de vida del viaje
    async fn move_driver(
        &self,
        driver: Driver,
        lat: f64,
        lng: f64,
        vehicle_id: Option<Uuid>,
    ) -> AppResult<Driver> {
        if vehicle_id.is_some() && vehicle_id != driver.vehicle_id {
            self.store.update_driver_vehicle(driver.id, vehicle_id).await?;
        }
        self.store.update_driver_location(driver.id, lat, lng).await
    }
}
