//! Store en memoria
//!
//! Todas las tablas viven detrás de un único `tokio::sync::Mutex`: cada
//! llamada es una unidad atómica y serializada. Se usa en tests y con
//! `STORE_BACKEND=memory`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::dispatch_store::{DispatchStore, ExpirySweep, MatchAcceptance, RideTransition};
use crate::models::pricing::pricing_key;
use crate::models::{
    Driver, Match, MatchStatus, NegotiationOffer, PricingConfig, Ride, RideRequest,
    RideRequestStatus,
};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

#[derive(Default)]
struct Tables {
    pricing_configs: Vec<PricingConfig>,
    drivers: HashMap<Uuid, Driver>,
    requests: HashMap<Uuid, RideRequest>,
    /// Orden de inserción
    matches: Vec<Match>,
    rides: HashMap<Uuid, Ride>,
    /// Append-only, orden de inserción
    offers: Vec<NegotiationOffer>,
}

#[derive(Clone, Default)]
pub struct MemoryDispatchStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDispatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DispatchStore for MemoryDispatchStore {
    async fn find_active_pricing_config(
        &self,
        city: &str,
        vehicle_type: &str,
    ) -> AppResult<Option<PricingConfig>> {
        let key = pricing_key(city, vehicle_type);
        let tables = self.tables.lock().await;
        Ok(tables
            .pricing_configs
            .iter()
            .find(|c| c.active && c.key() == key)
            .cloned())
    }

    async fn insert_pricing_config_if_absent(
        &self,
        config: &PricingConfig,
    ) -> AppResult<Option<PricingConfig>> {
        let mut tables = self.tables.lock().await;
        let key = config.key();
        if tables.pricing_configs.iter().any(|c| c.key() == key) {
            return Ok(None);
        }
        tables.pricing_configs.push(config.clone());
        Ok(Some(config.clone()))
    }

    async fn find_pricing_config_by_id(&self, id: Uuid) -> AppResult<Option<PricingConfig>> {
        let tables = self.tables.lock().await;
        Ok(tables.pricing_configs.iter().find(|c| c.id == id).cloned())
    }

    async fn list_pricing_configs(&self) -> AppResult<Vec<PricingConfig>> {
        let tables = self.tables.lock().await;
        let mut configs = tables.pricing_configs.clone();
        configs.sort_by(|a, b| a.key().cmp(&b.key()));
        Ok(configs)
    }

    async fn update_pricing_config(&self, config: &PricingConfig) -> AppResult<PricingConfig> {
        let mut tables = self.tables.lock().await;
        let key = config.key();
        if tables
            .pricing_configs
            .iter()
            .any(|c| c.id != config.id && c.key() == key)
        {
            return Err(conflict_error(
                "Pricing config",
                "city/vehicle_type",
                &format!("{}/{}", config.city, config.vehicle_type),
            ));
        }
        let slot = tables
            .pricing_configs
            .iter_mut()
            .find(|c| c.id == config.id)
            .ok_or_else(|| not_found_error("Pricing config", config.id))?;
        *slot = config.clone();
        Ok(config.clone())
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        let tables = self.tables.lock().await;
        Ok(tables.drivers.get(&id).cloned())
    }

    async fn find_driver_by_user(&self, user_id: Uuid) -> AppResult<Option<Driver>> {
        let tables = self.tables.lock().await;
        Ok(tables.drivers.values().find(|d| d.user_id == user_id).cloned())
    }

    async fn list_driver_pool(&self) -> AppResult<Vec<Driver>> {
        let tables = self.tables.lock().await;
        Ok(tables.drivers.values().cloned().collect())
    }

    async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver> {
        let mut tables = self.tables.lock().await;
        if tables.drivers.contains_key(&driver.id) {
            return Err(conflict_error("Driver", "id", &driver.id.to_string()));
        }
        if tables.drivers.values().any(|d| d.user_id == driver.user_id) {
            return Err(conflict_error("Driver", "user_id", &driver.user_id.to_string()));
        }
        tables.drivers.insert(driver.id, driver.clone());
        Ok(driver.clone())
    }

    async fn update_driver_vehicle(&self, driver_id: Uuid, vehicle_id: Option<Uuid>) -> AppResult<Driver> {
        let mut tables = self.tables.lock().await;
        let driver = tables
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| not_found_error("Driver", driver_id))?;
        driver.vehicle_id = vehicle_id;
        Ok(driver.clone())
    }

    async fn update_driver_location(&self, driver_id: Uuid, lat: f64, lng: f64) -> AppResult<Driver> {
        let mut tables = self.tables.lock().await;
        let driver = tables
            .drivers
            .get_mut(&driver_id)
            .ok_or_else(|| not_found_error("Driver", driver_id))?;
        driver.current_lat = Some(lat);
        driver.current_lng = Some(lng);
        Ok(driver.clone())
    }

    async fn insert_ride_request(&self, request: &RideRequest) -> AppResult<RideRequest> {
        let mut tables = self.tables.lock().await;
        if tables.requests.contains_key(&request.id) {
            return Err(conflict_error("Ride request", "id", &request.id.to_string()));
        }
        tables.requests.insert(request.id, request.clone());
        Ok(request.clone())
    }

    async fn find_ride_request(&self, id: Uuid) -> AppResult<Option<RideRequest>> {
        let tables = self.tables.lock().await;
        Ok(tables.requests.get(&id).cloned())
    }

    async fn list_ride_requests_by_customer(&self, customer_id: Uuid) -> AppResult<Vec<RideRequest>> {
        let tables = self.tables.lock().await;
        let mut requests: Vec<RideRequest> = tables
            .requests
            .values()
            .filter(|r| r.customer_id == customer_id)
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(requests)
    }

    async fn save_request_estimates(
        &self,
        id: Uuid,
        distance_km: Decimal,
        low: Decimal,
        high: Decimal,
    ) -> AppResult<RideRequest> {
        let mut tables = self.tables.lock().await;
        let request = tables
            .requests
            .get_mut(&id)
            .ok_or_else(|| not_found_error("Ride request", id))?;
        request.distance_km = distance_km;
        request.estimated_amount_low = low;
        request.estimated_amount_high = high;
        Ok(request.clone())
    }

    async fn insert_matches_if_absent(&self, request_id: Uuid, matches: &[Match]) -> AppResult<Vec<Match>> {
        let mut tables = self.tables.lock().await;
        if !tables.requests.contains_key(&request_id) {
            return Err(not_found_error("Ride request", request_id));
        }
        for candidate in matches {
            let exists = tables
                .matches
                .iter()
                .any(|m| m.request_id == request_id && m.driver_id == candidate.driver_id);
            if !exists {
                let mut created = candidate.clone();
                created.request_id = request_id;
                tables.matches.push(created);
            }
        }
        Ok(tables
            .matches
            .iter()
            .filter(|m| m.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn find_match(&self, id: Uuid) -> AppResult<Option<Match>> {
        let tables = self.tables.lock().await;
        Ok(tables.matches.iter().find(|m| m.id == id).cloned())
    }

    async fn list_matches_for_request(&self, request_id: Uuid) -> AppResult<Vec<Match>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .matches
            .iter()
            .filter(|m| m.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn list_matches_for_driver(&self, driver_id: Uuid) -> AppResult<Vec<Match>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .matches
            .iter()
            .rev()
            .filter(|m| m.driver_id == driver_id)
            .cloned()
            .collect())
    }

    async fn reject_pending_match(&self, match_id: Uuid) -> AppResult<Match> {
        let mut tables = self.tables.lock().await;
        let found = tables
            .matches
            .iter_mut()
            .find(|m| m.id == match_id)
            .ok_or_else(|| not_found_error("Match", match_id))?;
        if found.status != MatchStatus::Pending {
            return Err(AppError::InvalidState("Match is not pending.".to_string()));
        }
        found.status = MatchStatus::Rejected;
        Ok(found.clone())
    }

    async fn commit_acceptance(&self, acceptance: MatchAcceptance) -> AppResult<Ride> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        // Comprobaciones primero: nada se escribe si alguna falla
        let request = tables
            .requests
            .get(&acceptance.request_id)
            .ok_or_else(|| not_found_error("Ride request", acceptance.request_id))?;
        if request.status != RideRequestStatus::Open {
            return Err(AppError::InvalidState(
                "Ride request is not open anymore.".to_string(),
            ));
        }
        let accepted = tables
            .matches
            .iter()
            .find(|m| m.id == acceptance.match_id && m.request_id == acceptance.request_id)
            .ok_or_else(|| not_found_error("Match", acceptance.match_id))?;
        if accepted.status != MatchStatus::Pending {
            return Err(AppError::InvalidState("Match is not pending.".to_string()));
        }
        if accepted.driver_id != acceptance.driver_id {
            return Err(AppError::Internal(format!(
                "Match {} does not belong to driver {}",
                acceptance.match_id, acceptance.driver_id
            )));
        }
        let driver = tables
            .drivers
            .get(&acceptance.driver_id)
            .ok_or_else(|| not_found_error("Driver", acceptance.driver_id))?;
        if !driver.is_available {
            return Err(AppError::InvalidState(
                "Driver is already on another ride.".to_string(),
            ));
        }
        if tables
            .rides
            .values()
            .any(|r| r.request_id == acceptance.request_id)
        {
            return Err(AppError::Conflict(format!(
                "A ride already exists for request {}",
                acceptance.request_id
            )));
        }

        for m in tables
            .matches
            .iter_mut()
            .filter(|m| m.request_id == acceptance.request_id)
        {
            m.status = if m.id == acceptance.match_id {
                MatchStatus::Accepted
            } else {
                MatchStatus::Rejected
            };
        }
        if let Some(request) = tables.requests.get_mut(&acceptance.request_id) {
            request.status = RideRequestStatus::Matched;
        }
        if let Some(driver) = tables.drivers.get_mut(&acceptance.driver_id) {
            driver.is_available = acceptance.driver_available;
        }
        let ride = acceptance.ride;
        tables.rides.insert(ride.id, ride.clone());
        Ok(ride)
    }

    async fn commit_request_cancellation(&self, request_id: Uuid) -> AppResult<RideRequest> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let request = tables
            .requests
            .get_mut(&request_id)
            .ok_or_else(|| not_found_error("Ride request", request_id))?;
        if request.status != RideRequestStatus::Open {
            return Err(AppError::InvalidState(
                "Request cannot be canceled now.".to_string(),
            ));
        }
        request.status = RideRequestStatus::Canceled;
        let canceled = request.clone();

        for m in tables
            .matches
            .iter_mut()
            .filter(|m| m.request_id == request_id && m.status == MatchStatus::Pending)
        {
            m.status = MatchStatus::Expired;
        }
        Ok(canceled)
    }

    async fn apply_ride_transition(&self, transition: RideTransition) -> AppResult<Ride> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;

        let ride = tables
            .rides
            .get(&transition.ride_id)
            .ok_or_else(|| not_found_error("Ride", transition.ride_id))?;
        if ride.status != transition.from {
            return Err(AppError::InvalidState(format!(
                "Ride is {:?}, expected {:?}.",
                ride.status, transition.from
            )));
        }
        if ride.driver_id != transition.driver_id {
            return Err(AppError::Internal(format!(
                "Ride {} is not assigned to driver {}",
                transition.ride_id, transition.driver_id
            )));
        }
        if !tables.drivers.contains_key(&transition.driver_id) {
            return Err(not_found_error("Driver", transition.driver_id));
        }

        let updated = match tables.rides.get_mut(&transition.ride_id) {
            Some(ride) => {
                ride.status = transition.to;
                if transition.started_at.is_some() {
                    ride.started_at = transition.started_at;
                }
                if transition.ended_at.is_some() {
                    ride.ended_at = transition.ended_at;
                }
                if let Some(amount) = transition.amount_total {
                    ride.amount_total = amount;
                }
                if transition.end_lat.is_some() {
                    ride.end_lat = transition.end_lat;
                }
                if transition.end_lng.is_some() {
                    ride.end_lng = transition.end_lng;
                }
                if let Some(address) = transition.end_address {
                    ride.end_address = address;
                }
                ride.clone()
            }
            None => return Err(not_found_error("Ride", transition.ride_id)),
        };
        if let Some(driver) = tables.drivers.get_mut(&transition.driver_id) {
            driver.is_available = transition.driver_available;
            driver.total_rides += transition.completed_rides_delta;
        }
        Ok(updated)
    }

    async fn find_ride(&self, id: Uuid) -> AppResult<Option<Ride>> {
        let tables = self.tables.lock().await;
        Ok(tables.rides.get(&id).cloned())
    }

    async fn list_rides_for_driver(&self, driver_id: Uuid) -> AppResult<Vec<Ride>> {
        let tables = self.tables.lock().await;
        let mut rides: Vec<Ride> = tables
            .rides
            .values()
            .filter(|r| r.driver_id == driver_id)
            .cloned()
            .collect();
        rides.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(rides)
    }

    async fn list_rides_for_customer(&self, customer_id: Uuid) -> AppResult<Vec<Ride>> {
        let tables = self.tables.lock().await;
        let mut rides: Vec<Ride> = tables
            .rides
            .values()
            .filter(|r| r.customer_id == customer_id)
            .cloned()
            .collect();
        rides.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(rides)
    }

    async fn insert_offer(&self, offer: &NegotiationOffer) -> AppResult<NegotiationOffer> {
        let mut tables = self.tables.lock().await;
        if !tables.requests.contains_key(&offer.request_id) {
            return Err(not_found_error("Ride request", offer.request_id));
        }
        tables.offers.push(offer.clone());
        Ok(offer.clone())
    }

    async fn latest_offer(&self, request_id: Uuid) -> AppResult<Option<NegotiationOffer>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .offers
            .iter()
            .rev()
            .find(|o| o.request_id == request_id)
            .cloned())
    }

    async fn list_offers_for_request(&self, request_id: Uuid) -> AppResult<Vec<NegotiationOffer>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .offers
            .iter()
            .filter(|o| o.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn list_offers_by_user(&self, user_id: Uuid) -> AppResult<Vec<NegotiationOffer>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .offers
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn expire_overdue(
        &self,
        now: DateTime<Utc>,
        match_cutoff: DateTime<Utc>,
    ) -> AppResult<ExpirySweep> {
        let mut guard = self.tables.lock().await;
        let tables = &mut *guard;
        let mut sweep = ExpirySweep::default();

        let mut expired_requests = Vec::new();
        for request in tables.requests.values_mut() {
            if request.status == RideRequestStatus::Open && request.is_past_deadline(now) {
                request.status = RideRequestStatus::Expired;
                expired_requests.push(request.id);
            }
        }
        sweep.requests_expired = expired_requests.len();

        for m in tables.matches.iter_mut() {
            if m.status == MatchStatus::Pending
                && (expired_requests.contains(&m.request_id) || m.created_at < match_cutoff)
            {
                m.status = MatchStatus::Expired;
                sweep.matches_expired += 1;
            }
        }
        Ok(sweep)
    }
}
