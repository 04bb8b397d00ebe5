//! Solicitudes de viaje
//!
//! Creación (persistir OPEN, estimar, generar matches, en ese orden) y
//! lectura por su cliente.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::{Actor, NewRideRequest, RideRequest};
use crate::repositories::DispatchStore;
use crate::services::candidate_service::CandidateService;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::validation::validate_coordinates;

/// Solicitud recién creada y cuántos candidatos recibió
#[derive(Debug, Clone)]
pub struct CreatedRequest {
    pub request: RideRequest,
    pub candidates: usize,
}

#[derive(Clone)]
pub struct RequestService {
    store: Arc<dyn DispatchStore>,
    candidates: CandidateService,
    config: DispatchConfig,
}

impl RequestService {
    pub fn new(store: Arc<dyn DispatchStore>, config: DispatchConfig) -> Self {
        Self {
            candidates: CandidateService::new(store.clone(), config.clone()),
            store,
            config,
        }
    }

    pub async fn create_ride_request(&self, actor: &Actor, new: NewRideRequest) -> AppResult<CreatedRequest> {
        if !actor.is_customer() {
            return Err(AppError::Unauthorized(
                "Only customers can request rides.".to_string(),
            ));
        }
        if new.customer_id != actor.user_id {
            return Err(AppError::Unauthorized(
                "Ride requests can only be made for yourself.".to_string(),
            ));
        }
        validate_coordinates(new.pickup.lat, new.pickup.lng)?;
        validate_coordinates(new.dropoff.lat, new.dropoff.lng)?;

        // La banda se calcula antes de persistir: la solicitud nace ya estimada
        let mut draft = RideRequest::open(new, Some(Utc::now() + self.config.request_ttl()));
        self.candidates.estimate_draft(&mut draft).await?;
        let created = self.store.insert_ride_request(&draft).await?;
        log::info!(
            "📝 Solicitud {} creada en {}/{}",
            created.id,
            created.city,
            created.vehicle_type
        );

        match self.assign_candidates(&created).await {
            Ok(candidates) => Ok(CreatedRequest {
                request: created,
                candidates,
            }),
            Err(e) => {
                // Sin matches no debe quedar abierta
                log::error!("❌ Solicitud {} sin candidatos por error: {}", created.id, e);
                if let Err(cancel_err) = self.store.commit_request_cancellation(created.id).await {
                    log::error!("❌ No se pudo cancelar la solicitud {}: {}", created.id, cancel_err);
                }
                Err(e)
            }
        }
    }

    async fn assign_candidates(&self, request: &RideRequest) -> AppResult<usize> {
        let pool = self.store.list_driver_pool().await?;
        self.candidates.build_matches_for_request(request, &pool).await
    }

    pub async fn get_ride_request(&self, actor: &Actor, request_id: Uuid) -> AppResult<RideRequest> {
        let request = self
            .store
            .find_ride_request(request_id)
            .await?
            .ok_or_else(|| not_found_error("Ride request", request_id))?;
        if request.customer_id != actor.user_id && !actor.is_admin() {
            return Err(not_found_error("Ride request", request_id));
        }
        Ok(request)
    }

    pub async fn list_my_requests(&self, actor: &Actor) -> AppResult<Vec<RideRequest>> {
        self.store.list_ride_requests_by_customer(actor.user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Driver, Match, NegotiationOffer, PaymentMethod, PricingConfig, Ride, RideRequestStatus,
    };
    use crate::repositories::{ExpirySweep, MatchAcceptance, MemoryDispatchStore, RideTransition};
    use chrono::DateTime;
    use crate::utils::geo::GeoPoint;
    use rust_decimal::Decimal;

    fn new_request(customer_id: Uuid, pickup: GeoPoint) -> NewRideRequest {
        NewRideRequest {
            customer_id,
            pickup_address: "Victoria Island".to_string(),
            dropoff_address: "Ikeja".to_string(),
            pickup,
            dropoff: GeoPoint::new(6.60, 3.35),
            payment_method: PaymentMethod::Inapp,
            city: "Lagos".to_string(),
            vehicle_type: "Standard".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_runs_the_pipeline() {
        let store = Arc::new(MemoryDispatchStore::new());
        let pickup = GeoPoint::new(6.43, 3.42);
        for offset in [0.01, 0.02, 0.5] {
            store
                .insert_driver(&Driver::new(Uuid::new_v4(), None).at(pickup.lat + offset, pickup.lng))
                .await
                .unwrap();
        }
        let service = RequestService::new(store.clone(), DispatchConfig::default());
        let customer = Actor::customer(Uuid::new_v4());

        let created = service
            .create_ride_request(&customer, new_request(customer.user_id, pickup))
            .await
            .unwrap();

        assert_eq!(created.request.status, RideRequestStatus::Open);
        assert!(created.request.distance_km > Decimal::ZERO);
        assert!(created.request.estimated_amount_low > Decimal::ZERO);
        assert!(created.request.expires_at.is_some());
        // 0.5 grados (~55 km) queda fuera del radio
        assert_eq!(created.candidates, 2);
        assert_eq!(store.list_matches_for_request(created.request.id).await.unwrap().len(), 2);
        assert_eq!(service.list_my_requests(&customer).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_validates_actor_and_coordinates() {
        let store = Arc::new(MemoryDispatchStore::new());
        let service = RequestService::new(store, DispatchConfig::default());
        let customer = Actor::customer(Uuid::new_v4());

        let err = service
            .create_ride_request(&customer, new_request(customer.user_id, GeoPoint::new(95.0, 3.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let driver = Actor::driver(Uuid::new_v4());
        let err = service
            .create_ride_request(&driver, new_request(driver.user_id, GeoPoint::new(6.4, 3.4)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_requests_are_private_to_their_customer() {
        let store = Arc::new(MemoryDispatchStore::new());
        let service = RequestService::new(store, DispatchConfig::default());
        let customer = Actor::customer(Uuid::new_v4());
        let created = service
            .create_ride_request(&customer, new_request(customer.user_id, GeoPoint::new(6.4, 3.4)))
            .await
            .unwrap();

        assert!(service.get_ride_request(&customer, created.request.id).await.is_ok());
        let err = service
            .get_ride_request(&Actor::customer(Uuid::new_v4()), created.request.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Store cuyo pool de conductores no responde
    struct UnreachablePoolStore(MemoryDispatchStore);

    #[async_trait::async_trait]
    impl DispatchStore for UnreachablePoolStore {
        async fn find_active_pricing_config(&self, city: &str, vehicle_type: &str) -> AppResult<Option<PricingConfig>> {
            self.0.find_active_pricing_config(city, vehicle_type).await
        }

        async fn insert_pricing_config_if_absent(&self, config: &PricingConfig) -> AppResult<Option<PricingConfig>> {
            self.0.insert_pricing_config_if_absent(config).await
        }

        async fn find_pricing_config_by_id(&self, id: Uuid) -> AppResult<Option<PricingConfig>> {
            self.0.find_pricing_config_by_id(id).await
        }

        async fn list_pricing_configs(&self) -> AppResult<Vec<PricingConfig>> {
            self.0.list_pricing_configs().await
        }

        async fn update_pricing_config(&self, config: &PricingConfig) -> AppResult<PricingConfig> {
            self.0.update_pricing_config(config).await
        }

        async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
            self.0.find_driver(id).await
        }

        async fn find_driver_by_user(&self, user_id: Uuid) -> AppResult<Option<Driver>> {
            self.0.find_driver_by_user(user_id).await
        }

        async fn list_driver_pool(&self) -> AppResult<Vec<Driver>> {
            Err(AppError::Internal("driver pool unavailable".to_string()))
        }

        async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver> {
            self.0.insert_driver(driver).await
        }

        async fn update_driver_vehicle(&self, driver_id: Uuid, vehicle_id: Option<Uuid>) -> AppResult<Driver> {
            self.0.update_driver_vehicle(driver_id, vehicle_id).await
        }

        async fn update_driver_location(&self, driver_id: Uuid, lat: f64, lng: f64) -> AppResult<Driver> {
            self.0.update_driver_location(driver_id, lat, lng).await
        }

        async fn insert_ride_request(&self, request: &RideRequest) -> AppResult<RideRequest> {
            self.0.insert_ride_request(request).await
        }

        async fn find_ride_request(&self, id: Uuid) -> AppResult<Option<RideRequest>> {
            self.0.find_ride_request(id).await
        }

        async fn list_ride_requests_by_customer(&self, customer_id: Uuid) -> AppResult<Vec<RideRequest>> {
            self.0.list_ride_requests_by_customer(customer_id).await
        }

        async fn save_request_estimates(&self, id: Uuid, distance_km: Decimal, low: Decimal, high: Decimal) -> AppResult<RideRequest> {
            self.0.save_request_estimates(id, distance_km, low, high).await
        }

        async fn insert_matches_if_absent(&self, request_id: Uuid, matches: &[Match]) -> AppResult<Vec<Match>> {
            self.0.insert_matches_if_absent(request_id, matches).await
        }

        async fn find_match(&self, id: Uuid) -> AppResult<Option<Match>> {
            self.0.find_match(id).await
        }

        async fn list_matches_for_request(&self, request_id: Uuid) -> AppResult<Vec<Match>> {
            self.0.list_matches_for_request(request_id).await
        }

        async fn list_matches_for_driver(&self, driver_id: Uuid) -> AppResult<Vec<Match>> {
            self.0.list_matches_for_driver(driver_id).await
        }

        async fn reject_pending_match(&self, match_id: Uuid) -> AppResult<Match> {
            self.0.reject_pending_match(match_id).await
        }

        async fn commit_acceptance(&self, acceptance: MatchAcceptance) -> AppResult<Ride> {
            self.0.commit_acceptance(acceptance).await
        }

        async fn commit_request_cancellation(&self, request_id: Uuid) -> AppResult<RideRequest> {
            self.0.commit_request_cancellation(request_id).await
        }

        async fn apply_ride_transition(&self, transition: RideTransition) -> AppResult<Ride> {
            self.0.apply_ride_transition(transition).await
        }

        async fn find_ride(&self, id: Uuid) -> AppResult<Option<Ride>> {
            self.0.find_ride(id).await
        }

        async fn list_rides_for_driver(&self, driver_id: Uuid) -> AppResult<Vec<Ride>> {
            self.0.list_rides_for_driver(driver_id).await
        }

        async fn list_rides_for_customer(&self, customer_id: Uuid) -> AppResult<Vec<Ride>> {
            self.0.list_rides_for_customer(customer_id).await
        }

        async fn insert_offer(&self, offer: &NegotiationOffer) -> AppResult<NegotiationOffer> {
            self.0.insert_offer(offer).await
        }

        async fn latest_offer(&self, request_id: Uuid) -> AppResult<Option<NegotiationOffer>> {
            self.0.latest_offer(request_id).await
        }

        async fn list_offers_for_request(&self, request_id: Uuid) -> AppResult<Vec<NegotiationOffer>> {
            self.0.list_offers_for_request(request_id).await
        }

        async fn list_offers_by_user(&self, user_id: Uuid) -> AppResult<Vec<NegotiationOffer>> {
            self.0.list_offers_by_user(user_id).await
        }

        async fn expire_overdue(&self, now: DateTime<Utc>, match_cutoff: DateTime<Utc>) -> AppResult<ExpirySweep> {
            self.0.expire_overdue(now, match_cutoff).await
        }
    }

    #[tokio::test]
    async fn test_failed_matching_does_not_leave_request_open() {
        let store = Arc::new(UnreachablePoolStore(MemoryDispatchStore::new()));
        let service = RequestService::new(store.clone(), DispatchConfig::default());
        let customer = Actor::customer(Uuid::new_v4());

        let err = service
            .create_ride_request(&customer, new_request(customer.user_id, GeoPoint::new(6.43, 3.42)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        let requests = store.list_ride_requests_by_customer(customer.user_id).await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].status, RideRequestStatus::Canceled);
        // la banda se guardó junto con la solicitud
        assert!(requests[0].estimated_amount_high > Decimal::ZERO);
    }
}
