//! Selector de candidatos
//!
//! Lista ordenada y acotada de conductores cercanos a la recogida, y su
//! persistencia idempotente como matches PENDING.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::{Driver, Match, RideRequest};
use crate::repositories::DispatchStore;
use crate::services::pricing_service::PricingService;
use crate::utils::errors::{AppError, AppResult};
use crate::utils::geo::{distance_km, eta_minutes, GeoPoint};
use crate::utils::money::decimal_2dp;

/// Velocidad media hasta la recogida
pub const PICKUP_SPEED_KMH: f64 = 24.0;
/// Velocidad media del trayecto, para estimar la duración del viaje
pub const TRIP_SPEED_KMH: f64 = 22.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverCandidate {
    pub driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub distance_km: Decimal,
    pub eta_min: i32,
}

/// Conductores disponibles y localizados dentro de `radius_km`, ordenados por
/// (distancia, eta) y truncados a `limit`.
pub fn find_nearby_drivers(
    drivers: &[Driver],
    pickup: GeoPoint,
    radius_km: f64,
    limit: usize,
) -> Vec<DriverCandidate> {
    let mut candidates: Vec<DriverCandidate> = drivers
        .iter()
        .filter(|d| d.is_available)
        .filter_map(|d| {
            let location = d.location()?;
            let km = distance_km(pickup, location);
            if km > radius_km {
                return None;
            }
            Some(DriverCandidate {
                driver_id: d.id,
                vehicle_id: d.vehicle_id,
                distance_km: decimal_2dp(km),
                eta_min: eta_minutes(km, PICKUP_SPEED_KMH),
            })
        })
        .collect();

    candidates.sort_by_key(|c| (c.distance_km, c.eta_min));
    candidates.truncate(limit);
    candidates
}

#[derive(Clone)]
pub struct CandidateService {
    store: Arc<dyn DispatchStore>,
    pricing: PricingService,
    config: DispatchConfig,
}

impl CandidateService {
    pub fn new(store: Arc<dyn DispatchStore>, config: DispatchConfig) -> Self {
        Self {
            pricing: PricingService::new(store.clone()),
            store,
            config,
        }
    }

    /// Distancia y banda para una solicitud aún no persistida
    pub async fn estimate_draft(&self, draft: &mut RideRequest) -> AppResult<()> {
        let distance = decimal_2dp(distance_km(draft.pickup(), draft.dropoff()));
        let cfg = self
            .pricing
            .get_pricing_config(&draft.city, &draft.vehicle_type)
            .await?;
        let band = self.pricing.estimate_band(distance, &cfg);

        draft.distance_km = distance;
        draft.estimated_amount_low = band.low;
        draft.estimated_amount_high = band.high;
        log::info!(
            "📏 Solicitud {} estimada: {} km, banda {} - {} ({:?})",
            draft.id,
            distance,
            band.low,
            band.high,
            cfg.mode
        );
        Ok(())
    }

    /// Distancia y banda de la solicitud. Recalcular con las mismas entradas
    /// escribe los mismos valores.
    pub async fn compute_request_estimates(&self, request: &RideRequest) -> AppResult<RideRequest> {
        let mut estimated = request.clone();
        self.estimate_draft(&mut estimated).await?;
        self.store
            .save_request_estimates(
                request.id,
                estimated.distance_km,
                estimated.estimated_amount_low,
                estimated.estimated_amount_high,
            )
            .await
    }

    /// Crea (si faltan) los matches PENDING de los candidatos; devuelve cuántos
    /// candidatos hubo. Volver a llamarla no duplica ni pisa matches existentes.
    pub async fn build_matches_for_request(
        &self,
        request: &RideRequest,
        drivers: &[Driver],
    ) -> AppResult<usize> {
        if !request.is_open() {
            return Err(AppError::InvalidState(format!(
                "Ride request {} is not open.",
                request.id
            )));
        }

        let candidates = find_nearby_drivers(
            drivers,
            request.pickup(),
            self.config.search_radius_km,
            self.config.candidate_limit,
        );
        let matches: Vec<Match> = candidates
            .iter()
            .map(|c| Match::pending(request.id, c.driver_id, c.vehicle_id, c.distance_km, c.eta_min))
            .collect();

        self.store.insert_matches_if_absent(request.id, &matches).await?;

        log::info!(
            "🚕 {} candidato(s) para la solicitud {}",
            candidates.len(),
            request.id
        );
        Ok(candidates.len())
    }
}
