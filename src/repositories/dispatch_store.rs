//! Contrato del store persistente
//!
//! Lecturas simples más los comandos atómicos del motor. Cada comando
//! `commit_*` / `apply_*` se aplica completo o no se aplica: las
//! implementaciones usan compare-and-swap sobre el estado esperado y devuelven
//! `AppError::InvalidState` cuando otro escritor ganó la carrera.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    Driver, Match, NegotiationOffer, PricingConfig, Ride, RideRequest, RideStatus,
};
use crate::utils::errors::AppResult;

/// Aceptación de un match: resuelve el conjunto de matches de la solicitud,
/// crea el viaje y reclama al conductor.
#[derive(Debug, Clone)]
pub struct MatchAcceptance {
    pub match_id: Uuid,
    pub request_id: Uuid,
    pub driver_id: Uuid,
    pub ride: Ride,
    pub driver_available: bool,
}

/// Transición de estado de un viaje con su efecto sobre el conductor
#[derive(Debug, Clone)]
pub struct RideTransition {
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub from: RideStatus,
    pub to: RideStatus,
    pub driver_available: bool,
    /// Incremento de `total_rides` (1 al completar, 0 en el resto)
    pub completed_rides_delta: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub amount_total: Option<Decimal>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub end_address: Option<String>,
}

/// Resultado de una pasada del reaper de expiración
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpirySweep {
    pub requests_expired: usize,
    pub matches_expired: usize,
}

#[async_trait]
pub trait DispatchStore: Send + Sync {
    // Pricing configs

    /// Configuración activa para el par (case-insensitive)
    async fn find_active_pricing_config(
        &self,
        city: &str,
        vehicle_type: &str,
    ) -> AppResult<Option<PricingConfig>>;

    /// Inserta si no existe otra para el par; `None` si la restricción única saltó
    async fn insert_pricing_config_if_absent(
        &self,
        config: &PricingConfig,
    ) -> AppResult<Option<PricingConfig>>;

    async fn find_pricing_config_by_id(&self, id: Uuid) -> AppResult<Option<PricingConfig>>;

    async fn list_pricing_configs(&self) -> AppResult<Vec<PricingConfig>>;

    async fn update_pricing_config(&self, config: &PricingConfig) -> AppResult<PricingConfig>;

    // Drivers

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>>;

    async fn find_driver_by_user(&self, user_id: Uuid) -> AppResult<Option<Driver>>;

    /// Instantánea del pool de conductores para el selector de candidatos
    async fn list_driver_pool(&self) -> AppResult<Vec<Driver>>;

    /// Alta del perfil; nunca sobrescribe uno existente
    async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver>;

    /// Cambia sólo el vehículo; disponibilidad y contadores no se tocan
    async fn update_driver_vehicle(&self, driver_id: Uuid, vehicle_id: Option<Uuid>) -> AppResult<Driver>;

    async fn update_driver_location(&self, driver_id: Uuid, lat: f64, lng: f64) -> AppResult<Driver>;

    // Ride requests

    async fn insert_ride_request(&self, request: &RideRequest) -> AppResult<RideRequest>;

    async fn find_ride_request(&self, id: Uuid) -> AppResult<Option<RideRequest>>;

    async fn list_ride_requests_by_customer(&self, customer_id: Uuid) -> AppResult<Vec<RideRequest>>;

    async fn save_request_estimates(
        &self,
        id: Uuid,
        distance_km: Decimal,
        low: Decimal,
        high: Decimal,
    ) -> AppResult<RideRequest>;

    // Matches

    /// Crea los matches que falten para la solicitud, en una sola unidad atómica.
    /// Los existentes (misma solicitud y conductor) no se tocan.
    async fn insert_matches_if_absent(&self, request_id: Uuid, matches: &[Match]) -> AppResult<Vec<Match>>;

    async fn find_match(&self, id: Uuid) -> AppResult<Option<Match>>;

    async fn list_matches_for_request(&self, request_id: Uuid) -> AppResult<Vec<Match>>;

    async fn list_matches_for_driver(&self, driver_id: Uuid) -> AppResult<Vec<Match>>;

    /// PENDING -> REJECTED
    async fn reject_pending_match(&self, match_id: Uuid) -> AppResult<Match>;

    /// OPEN -> MATCHED, match PENDING -> ACCEPTED, hermanos -> REJECTED,
    /// inserta el viaje y fija la disponibilidad del conductor.
    async fn commit_acceptance(&self, acceptance: MatchAcceptance) -> AppResult<Ride>;

    /// OPEN -> CANCELED y matches PENDING -> EXPIRED
    async fn commit_request_cancellation(&self, request_id: Uuid) -> AppResult<RideRequest>;

    // Rides

    async fn apply_ride_transition(&self, transition: RideTransition) -> AppResult<Ride>;

    async fn find_ride(&self, id: Uuid) -> AppResult<Option<Ride>>;

    async fn list_rides_for_driver(&self, driver_id: Uuid) -> AppResult<Vec<Ride>>;

    async fn list_rides_for_customer(&self, customer_id: Uuid) -> AppResult<Vec<Ride>>;

    // Negotiation

    async fn insert_offer(&self, offer: &NegotiationOffer) -> AppResult<NegotiationOffer>;

    /// Oferta más reciente de la solicitud
    async fn latest_offer(&self, request_id: Uuid) -> AppResult<Option<NegotiationOffer>>;

    async fn list_offers_for_request(&self, request_id: Uuid) -> AppResult<Vec<NegotiationOffer>>;

    async fn list_offers_by_user(&self, user_id: Uuid) -> AppResult<Vec<NegotiationOffer>>;

    // Expiry

    /// Solicitudes OPEN vencidas -> EXPIRED (con sus matches PENDING), y
    /// matches PENDING creados antes de `match_cutoff` -> EXPIRED.
    async fn expire_overdue(
        &self,
        now: DateTime<Utc>,
        match_cutoff: DateTime<Utc>,
    ) -> AppResult<ExpirySweep>;
}
