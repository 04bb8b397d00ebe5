//! Orquestador de matches
//!
//! PENDING -> {ACCEPTED, REJECTED, EXPIRED}. `accept_match` es el punto de
//! resolución de carreras: el store hace compare-and-swap OPEN -> MATCHED
//! sobre la solicitud y sólo un aceptante lo consigue.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::{Actor, Driver, Match, MatchStatus, Ride, RideRequest};
use crate::repositories::DispatchStore;
use crate::services::driver_service::DriverService;
use crate::services::pricing_service::PricingService;
use crate::services::ride_lifecycle_service::accept_command;
use crate::utils::errors::{not_found_error, AppError, AppResult};

#[derive(Clone)]
pub struct MatchService {
    store: Arc<dyn DispatchStore>,
    pricing: PricingService,
    drivers: DriverService,
    config: DispatchConfig,
}

impl MatchService {
    pub fn new(store: Arc<dyn DispatchStore>, config: DispatchConfig) -> Self {
        Self {
            pricing: PricingService::new(store.clone()),
            drivers: DriverService::new(store.clone()),
            store,
            config,
        }
    }

    /// Match propiedad del conductor del actor
    async fn owned_match(&self, actor: &Actor, match_id: Uuid) -> AppResult<(Match, Driver)> {
        let driver = self.drivers.profile_for(actor).await?;
        let found = self
            .store
            .find_match(match_id)
            .await?
            .ok_or_else(|| not_found_error("Match", match_id))?;
        if found.driver_id != driver.id {
            return Err(AppError::Unauthorized(
                "This match belongs to another driver.".to_string(),
            ));
        }
        Ok((found, driver))
    }

    /// Importe del viaje: estimación alta (metered) o última oferta (negotiated)
    async fn ride_amount(&self, request: &RideRequest) -> AppResult<Decimal> {
        let cfg = self
            .pricing
            .get_pricing_config(&request.city, &request.vehicle_type)
            .await?;
        if !cfg.is_negotiated() {
            return Ok(request.estimated_amount_high);
        }

        match self.store.latest_offer(request.id).await? {
            Some(offer) => Ok(offer.amount),
            None if self.config.require_offer_for_negotiated_accept => Err(AppError::Validation(
                "A negotiated request needs at least one offer before a match can be accepted."
                    .to_string(),
            )),
            None => {
                log::warn!(
                    "⚠️ Solicitud negociada {} aceptada sin ofertas, usando la estimación alta",
                    request.id
                );
                Ok(request.estimated_amount_high)
            }
        }
    }

    pub async fn accept_match(&self, actor: &Actor, match_id: Uuid) -> AppResult<Ride> {
        let (found, driver) = self.owned_match(actor, match_id).await?;
        if found.status != MatchStatus::Pending {
            return Err(AppError::InvalidState("Match is not pending.".to_string()));
        }
        if !driver.is_available {
            return Err(AppError::InvalidState(
                "Driver is already on another ride.".to_string(),
            ));
        }

        let request = self
            .store
            .find_ride_request(found.request_id)
            .await?
            .ok_or_else(|| not_found_error("Ride request", found.request_id))?;
        if !request.is_open() {
            return Err(AppError::InvalidState(
                "Ride request is not open anymore.".to_string(),
            ));
        }

        let now = Utc::now();
        if request.is_past_deadline(now) {
            return Err(AppError::InvalidState("Ride request has expired.".to_string()));
        }
        if found.created_at + self.config.match_ttl() <= now {
            return Err(AppError::InvalidState("Match has expired.".to_string()));
        }

        let amount = self.ride_amount(&request).await?;
        match self
            .store
            .commit_acceptance(accept_command(&request, &found, amount))
            .await
        {
            Ok(ride) => {
                log::info!(
                    "✅ Match {} aceptado por el conductor {}: viaje {} por {}",
                    found.id,
                    driver.id,
                    ride.id,
                    ride.amount_total
                );
                Ok(ride)
            }
            Err(AppError::InvalidState(msg)) => {
                log::warn!("⚠️ Match {} perdió la carrera de aceptación: {}", found.id, msg);
                Err(AppError::InvalidState(msg))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn reject_match(&self, actor: &Actor, match_id: Uuid) -> AppResult<Match> {
        let (found, driver) = self.owned_match(actor, match_id).await?;
        if found.status != MatchStatus::Pending {
            return Err(AppError::InvalidState("Match is not pending.".to_string()));
        }

        let rejected = self.store.reject_pending_match(found.id).await?;
        log::info!("↩️ Match {} rechazado por el conductor {}", rejected.id, driver.id);
        Ok(rejected)
    }

    pub async fn get_match(&self, actor: &Actor, match_id: Uuid) -> AppResult<Match> {
        match self.owned_match(actor, match_id).await {
            Ok((found, _)) => Ok(found),
            Err(AppError::Unauthorized(_)) if actor.is_driver() => Err(not_found_error("Match", match_id)),
            Err(e) => Err(e),
        }
    }

    pub async fn list_matches(&self, actor: &Actor) -> AppResult<Vec<Match>> {
        let driver = self.drivers.profile_for(actor).await?;
        self.store.list_matches_for_driver(driver.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        NegotiationOffer, NewRideRequest, OfferRole, PaymentMethod, PricingConfig, PricingMode,
        RideRequestStatus, RideStatus,
    };
    use crate::repositories::MemoryDispatchStore;
    use crate::services::ride_lifecycle_service::{RideCompletion, RideLifecycleService};
    use crate::utils::geo::GeoPoint;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryDispatchStore>,
        service: MatchService,
        request: RideRequest,
        drivers: Vec<(Actor, Driver, Match)>,
    }

    async fn fixture(city: &str, driver_count: usize, config: DispatchConfig) -> Fixture {
        let store = Arc::new(MemoryDispatchStore::new());
        let mut request = RideRequest::open(
            NewRideRequest {
                customer_id: Uuid::new_v4(),
                pickup_address: "Wuse".to_string(),
                dropoff_address: "Garki".to_string(),
                pickup: GeoPoint::new(9.07, 7.48),
                dropoff: GeoPoint::new(9.03, 7.49),
                payment_method: PaymentMethod::Cash,
                city: city.to_string(),
                vehicle_type: "Standard".to_string(),
            },
            Some(Utc::now() + chrono::Duration::minutes(5)),
        );
        request.estimated_amount_low = dec("900.00");
        request.estimated_amount_high = dec("1100.00");
        let request = store.insert_ride_request(&request).await.unwrap();

        let mut drivers = Vec::new();
        for _ in 0..driver_count {
            let actor = Actor::driver(Uuid::new_v4());
            let driver = store
                .insert_driver(&Driver::new(actor.user_id, Some(Uuid::new_v4())).at(9.06, 7.48))
                .await
                .unwrap();
            let m = Match::pending(request.id, driver.id, driver.vehicle_id, dec("1.11"), 3);
            drivers.push((actor, driver, m));
        }
        let matches: Vec<Match> = drivers.iter().map(|(_, _, m)| m.clone()).collect();
        store.insert_matches_if_absent(request.id, &matches).await.unwrap();

        Fixture {
            service: MatchService::new(store.clone(), config),
            store,
            request,
            drivers,
        }
    }

    async fn make_negotiated(store: &MemoryDispatchStore, city: &str) {
        let mut cfg = PricingConfig::default_metered(city, "Standard");
        cfg.mode = PricingMode::Negotiated;
        store.insert_pricing_config_if_absent(&cfg).await.unwrap();
    }

    #[tokio::test]
    async fn test_accept_resolves_match_set() {
        let f = fixture("Abuja", 3, DispatchConfig::default()).await;
        let (actor, driver, m) = &f.drivers[1];

        let ride = f.service.accept_match(actor, m.id).await.unwrap();
        assert_eq!(ride.status, RideStatus::Accepted);
        assert_eq!(ride.amount_total, dec("1100.00"));
        assert_eq!(ride.driver_id, driver.id);
        assert_eq!(ride.vehicle_id, driver.vehicle_id);
        assert_eq!(ride.pickup_address, "Wuse");

        let statuses: Vec<MatchStatus> = f
            .store
            .list_matches_for_request(f.request.id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.status)
            .collect();
        assert_eq!(
            statuses,
            vec![MatchStatus::Rejected, MatchStatus::Accepted, MatchStatus::Rejected]
        );
        let request = f.store.find_ride_request(f.request.id).await.unwrap().unwrap();
        assert_eq!(request.status, RideRequestStatus::Matched);
        assert!(!f.store.find_driver(driver.id).await.unwrap().unwrap().is_available);
    }

    #[tokio::test]
    async fn test_accept_rejects_wrong_driver_and_non_pending() {
        let f = fixture("Abuja", 2, DispatchConfig::default()).await;
        let (first, _, m1) = &f.drivers[0];
        let (second, _, m2) = &f.drivers[1];

        let err = f.service.accept_match(second, m1.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        f.service.reject_match(second, m2.id).await.unwrap();
        let err = f.service.accept_match(second, m2.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let err = f
            .service
            .accept_match(&Actor::customer(first.user_id), m1.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_accepts_have_one_winner() {
        let f = fixture("Abuja", 4, DispatchConfig::default()).await;

        let attempts = f.drivers.iter().map(|(actor, _, m)| {
            let service = f.service.clone();
            let actor = *actor;
            let match_id = m.id;
            tokio::spawn(async move { service.accept_match(&actor, match_id).await })
        });
        let results: Vec<AppResult<Ride>> = futures::future::join_all(attempts)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, AppError::InvalidState(_))));

        let matches = f.store.list_matches_for_request(f.request.id).await.unwrap();
        assert_eq!(matches.iter().filter(|m| m.status == MatchStatus::Accepted).count(), 1);
        assert_eq!(matches.iter().filter(|m| m.status == MatchStatus::Rejected).count(), 3);
        assert_eq!(f.store.list_rides_for_customer(f.request.customer_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_negotiated_accept_uses_latest_offer() {
        let f = fixture("Kaduna", 1, DispatchConfig::default()).await;
        make_negotiated(&f.store, "Kaduna").await;
        let (actor, _, m) = &f.drivers[0];

        let err = f.service.accept_match(actor, m.id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        for amount in ["800.00", "950.50"] {
            f.store
                .insert_offer(&NegotiationOffer::new(
                    f.request.id,
                    f.request.customer_id,
                    OfferRole::Rider,
                    dec(amount),
                ))
                .await
                .unwrap();
        }
        let ride = f.service.accept_match(actor, m.id).await.unwrap();
        assert_eq!(ride.amount_total, dec("950.50"));
    }

    #[tokio::test]
    async fn test_negotiated_fallback_when_offers_not_required() {
        let config = DispatchConfig {
            require_offer_for_negotiated_accept: false,
            ..DispatchConfig::default()
        };
        let f = fixture("Kaduna", 1, config).await;
        make_negotiated(&f.store, "Kaduna").await;
        let (actor, _, m) = &f.drivers[0];

        let ride = f.service.accept_match(actor, m.id).await.unwrap();
        assert_eq!(ride.amount_total, dec("1100.00"));
    }

    #[tokio::test]
    async fn test_accept_after_deadline_is_refused() {
        let f = fixture("Abuja", 1, DispatchConfig::default()).await;
        let (actor, driver, _) = &f.drivers[0];

        let mut overdue = f.request.clone();
        overdue.id = Uuid::new_v4();
        overdue.expires_at = Some(Utc::now() - chrono::Duration::seconds(1));
        let overdue = f.store.insert_ride_request(&overdue).await.unwrap();
        let late = Match::pending(overdue.id, driver.id, None, dec("1.00"), 3);
        f.store.insert_matches_if_absent(overdue.id, &[late.clone()]).await.unwrap();

        let err = f.service.accept_match(actor, late.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let mut fresh = f.request.clone();
        fresh.id = Uuid::new_v4();
        let fresh = f.store.insert_ride_request(&fresh).await.unwrap();
        let mut stale = Match::pending(fresh.id, driver.id, None, dec("1.00"), 3);
        stale.created_at = Utc::now() - chrono::Duration::minutes(10);
        f.store.insert_matches_if_absent(fresh.id, &[stale.clone()]).await.unwrap();

        let err = f.service.accept_match(actor, stale.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        let request = f.store.find_ride_request(fresh.id).await.unwrap().unwrap();
        assert_eq!(request.status, RideRequestStatus::Open);
    }

    #[tokio::test]
    async fn test_busy_driver_cannot_accept_second_request() {
        let f = fixture("Abuja", 1, DispatchConfig::default()).await;
        let (actor, driver, first) = &f.drivers[0];

        let mut other = f.request.clone();
        other.id = Uuid::new_v4();
        let other = f.store.insert_ride_request(&other).await.unwrap();
        let second = Match::pending(other.id, driver.id, driver.vehicle_id, dec("1.00"), 3);
        f.store.insert_matches_if_absent(other.id, &[second.clone()]).await.unwrap();

        let ride = f.service.accept_match(actor, first.id).await.unwrap();

        let err = f.service.accept_match(actor, second.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        assert_eq!(f.store.find_match(second.id).await.unwrap().unwrap().status, MatchStatus::Pending);
        let other = f.store.find_ride_request(other.id).await.unwrap().unwrap();
        assert_eq!(other.status, RideRequestStatus::Open);

        // el store también lo impide aunque el servicio haya leído una instantánea vieja
        let stale = accept_command(&other, &second, dec("1100.00"));
        let err = f.store.commit_acceptance(stale).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let lifecycle = RideLifecycleService::new(f.store.clone());
        lifecycle.start_ride(actor, ride.id).await.unwrap();
        lifecycle
            .complete_ride(actor, ride.id, RideCompletion::default())
            .await
            .unwrap();

        let ride = f.service.accept_match(actor, second.id).await.unwrap();
        assert_eq!(ride.request_id, other.id);
        assert!(!f.store.find_driver(driver.id).await.unwrap().unwrap().is_available);
    }

    #[tokio::test]
    async fn test_match_reads_are_scoped_to_driver() {
        let f = fixture("Abuja", 2, DispatchConfig::default()).await;
        let (first, _, m1) = &f.drivers[0];
        let (second, _, _) = &f.drivers[1];

        assert_eq!(f.service.get_match(first, m1.id).await.unwrap().id, m1.id);
        let err = f.service.get_match(second, m1.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(f.service.list_matches(first).await.unwrap().len(), 1);
    }
}
