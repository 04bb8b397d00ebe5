//! Ciclo de vida del viaje
//!
//! ACCEPTED -> IN_PROGRESS -> COMPLETED, y la cancelación de solicitudes OPEN.
//!
//! La disponibilidad del conductor se deriva del estado del viaje en
//! [`driver_availability`] y viaja dentro del mismo comando atómico que la
//! transición, de modo que ningún camino de escritura puede saltársela.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Actor, Match, Ride, RideRequest, RideStatus};
use crate::repositories::{DispatchStore, MatchAcceptance, RideTransition};
use crate::services::driver_service::DriverService;
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::money::round_money;
use crate::utils::validation::validate_coordinates;

/// Disponibilidad del conductor mientras su viaje está en `status`
pub fn driver_availability(status: RideStatus) -> bool {
    match status {
        RideStatus::Accepted | RideStatus::InProgress => false,
        RideStatus::Completed | RideStatus::Canceled => true,
    }
}

/// Comando de aceptación: viaje ACCEPTED y conductor reclamado
pub fn accept_command(request: &RideRequest, accepted: &Match, amount_total: Decimal) -> MatchAcceptance {
    let ride = Ride::from_accepted_match(request, accepted, round_money(amount_total));
    MatchAcceptance {
        match_id: accepted.id,
        request_id: request.id,
        driver_id: accepted.driver_id,
        driver_available: driver_availability(ride.status),
        ride,
    }
}

/// Datos opcionales al cerrar un viaje
#[derive(Debug, Clone, Default)]
pub struct RideCompletion {
    pub amount_total: Option<Decimal>,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub end_address: Option<String>,
}

#[derive(Clone)]
pub struct RideLifecycleService {
    store: Arc<dyn DispatchStore>,
    drivers: DriverService,
}

impl RideLifecycleService {
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self {
            drivers: DriverService::new(store.clone()),
            store,
        }
    }

    /// Viaje asignado al conductor del actor
    async fn assigned_ride(&self, actor: &Actor, ride_id: Uuid) -> AppResult<Ride> {
        let driver = self.drivers.profile_for(actor).await?;
        let ride = self
            .store
            .find_ride(ride_id)
            .await?
            .ok_or_else(|| not_found_error("Ride", ride_id))?;
        if ride.driver_id != driver.id {
            return Err(AppError::Unauthorized(
                "You are not the driver assigned to this ride.".to_string(),
            ));
        }
        Ok(ride)
    }

    pub async fn start_ride(&self, actor: &Actor, ride_id: Uuid) -> AppResult<Ride> {
        let ride = self.assigned_ride(actor, ride_id).await?;
        if ride.status != RideStatus::Accepted {
            return Err(AppError::InvalidState(format!(
                "Ride cannot be started from {:?}.",
                ride.status
            )));
        }

        let to = RideStatus::InProgress;
        let started = self
            .store
            .apply_ride_transition(RideTransition {
                ride_id: ride.id,
                driver_id: ride.driver_id,
                from: RideStatus::Accepted,
                to,
                driver_available: driver_availability(to),
                completed_rides_delta: 0,
                started_at: Some(Utc::now()),
                ended_at: None,
                amount_total: None,
                end_lat: None,
                end_lng: None,
                end_address: None,
            })
            .await?;

        log::info!("🚗 Viaje {} iniciado por el conductor {}", started.id, started.driver_id);
        Ok(started)
    }

    pub async fn complete_ride(
        &self,
        actor: &Actor,
        ride_id: Uuid,
        completion: RideCompletion,
    ) -> AppResult<Ride> {
        let ride = self.assigned_ride(actor, ride_id).await?;
        if ride.status != RideStatus::InProgress {
            return Err(AppError::InvalidState(format!(
                "Ride cannot be completed from {:?}.",
                ride.status
            )));
        }

        match (completion.end_lat, completion.end_lng) {
            (Some(lat), Some(lng)) => validate_coordinates(lat, lng)?,
            (None, None) => {}
            _ => {
                return Err(AppError::Validation(
                    "end_lat and end_lng must be given together.".to_string(),
                ))
            }
        }
        let amount_total = match completion.amount_total {
            Some(amount) if amount < Decimal::ZERO => {
                return Err(AppError::Validation(
                    "amount_total cannot be negative.".to_string(),
                ))
            }
            other => other.map(round_money),
        };

        let to = RideStatus::Completed;
        let completed = self
            .store
            .apply_ride_transition(RideTransition {
                ride_id: ride.id,
                driver_id: ride.driver_id,
                from: RideStatus::InProgress,
                to,
                driver_available: driver_availability(to),
                completed_rides_delta: 1,
                started_at: None,
                ended_at: Some(Utc::now()),
                amount_total,
                end_lat: completion.end_lat,
                end_lng: completion.end_lng,
                end_address: completion.end_address,
            })
            .await?;

        log::info!(
            "🏁 Viaje {} completado, importe {}",
            completed.id,
            completed.amount_total
        );
        Ok(completed)
    }

    /// OPEN -> CANCELED por su propio cliente; los matches PENDING caducan
    pub async fn cancel_ride_request(&self, actor: &Actor, request_id: Uuid) -> AppResult<RideRequest> {
        let request = self
            .store
            .find_ride_request(request_id)
            .await?
            .ok_or_else(|| not_found_error("Ride request", request_id))?;
        if request.customer_id != actor.user_id {
            return Err(AppError::Unauthorized(
                "Only the requesting customer can cancel this request.".to_string(),
            ));
        }
        if !request.is_open() {
            return Err(AppError::InvalidState(
                "Request cannot be canceled now.".to_string(),
            ));
        }

        let canceled = self.store.commit_request_cancellation(request_id).await?;
        log::info!("🚫 Solicitud {} cancelada por el cliente", canceled.id);
        Ok(canceled)
    }

    /// Viaje visible para sus participantes (y administradores)
    pub async fn get_ride(&self, actor: &Actor, ride_id: Uuid) -> AppResult<Ride> {
        let ride = self
            .store
            .find_ride(ride_id)
            .await?
            .ok_or_else(|| not_found_error("Ride", ride_id))?;

        let visible = actor.is_admin()
            || ride.customer_id == actor.user_id
            || (actor.is_driver()
                && self
                    .store
                    .find_driver(ride.driver_id)
                    .await?
                    .map_or(false, |d| d.user_id == actor.user_id));
        if !visible {
            return Err(not_found_error("Ride", ride_id));
        }
        Ok(ride)
    }

    /// Conductores: viajes que conducen. Resto: viajes que pidieron.
    pub async fn list_rides(&self, actor: &Actor) -> AppResult<Vec<Ride>> {
        if actor.is_driver() {
            let driver = self.drivers.profile_for(actor).await?;
            self.store.list_rides_for_driver(driver.id).await
        } else {
            self.store.list_rides_for_customer(actor.user_id).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Driver, MatchStatus, NewRideRequest, PaymentMethod, RideRequestStatus};
    use crate::repositories::MemoryDispatchStore;
    use crate::utils::geo::GeoPoint;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    struct Fixture {
        store: Arc<MemoryDispatchStore>,
        service: RideLifecycleService,
        customer: Actor,
        driver_actor: Actor,
        driver: Driver,
        request: RideRequest,
        matched: Match,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryDispatchStore::new());
        let customer = Actor::customer(Uuid::new_v4());
        let driver_actor = Actor::driver(Uuid::new_v4());
        let mut driver = Driver::new(driver_actor.user_id, None).at(6.45, 3.39);
        driver.total_rides = 4;
        let driver = store.insert_driver(&driver).await.unwrap();

        let request = RideRequest::open(
            NewRideRequest {
                customer_id: customer.user_id,
                pickup_address: "Lekki".to_string(),
                dropoff_address: "Ikoyi".to_string(),
                pickup: GeoPoint::new(6.44, 3.47),
                dropoff: GeoPoint::new(6.45, 3.43),
                payment_method: PaymentMethod::Inapp,
                city: "Lagos".to_string(),
                vehicle_type: "Standard".to_string(),
            },
            None,
        );
        let request = store.insert_ride_request(&request).await.unwrap();
        let matched = Match::pending(request.id, driver.id, None, dec("1.20"), 3);
        store.insert_matches_if_absent(request.id, &[matched.clone()]).await.unwrap();

        Fixture {
            service: RideLifecycleService::new(store.clone()),
            store,
            customer,
            driver_actor,
            driver,
            request,
            matched,
        }
    }

    async fn accepted_ride(f: &Fixture) -> Ride {
        f.store
            .commit_acceptance(accept_command(&f.request, &f.matched, dec("700")))
            .await
            .unwrap()
    }

    #[test]
    fn test_availability_follows_status() {
        assert!(!driver_availability(RideStatus::Accepted));
        assert!(!driver_availability(RideStatus::InProgress));
        assert!(driver_availability(RideStatus::Completed));
        assert!(driver_availability(RideStatus::Canceled));
    }

    #[tokio::test]
    async fn test_full_lifecycle_releases_driver() {
        let f = fixture().await;
        let ride = accepted_ride(&f).await;
        assert!(!f.store.find_driver(f.driver.id).await.unwrap().unwrap().is_available);

        let started = f.service.start_ride(&f.driver_actor, ride.id).await.unwrap();
        assert_eq!(started.status, RideStatus::InProgress);
        assert!(started.started_at.is_some());

        let completed = f
            .service
            .complete_ride(
                &f.driver_actor,
                ride.id,
                RideCompletion {
                    amount_total: Some(dec("812.345")),
                    end_lat: Some(6.451),
                    end_lng: Some(3.431),
                    end_address: Some("Ikoyi Club".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(completed.status, RideStatus::Completed);
        assert_eq!(completed.amount_total, dec("812.35"));
        assert_eq!(completed.end_address, "Ikoyi Club");
        assert!(completed.ended_at.is_some());

        let driver = f.store.find_driver(f.driver.id).await.unwrap().unwrap();
        assert_eq!(driver.total_rides, 5);
        assert!(driver.is_available);
    }

    #[tokio::test]
    async fn test_complete_releases_busy_driver() {
        let f = fixture().await;
        let ride = accepted_ride(&f).await;
        f.service.start_ride(&f.driver_actor, ride.id).await.unwrap();
        assert!(!f.store.find_driver(f.driver.id).await.unwrap().unwrap().is_available);

        let completed = f
            .service
            .complete_ride(&f.driver_actor, ride.id, RideCompletion::default())
            .await
            .unwrap();
        assert_eq!(completed.amount_total, dec("700.00"));

        let driver = f.store.find_driver(f.driver.id).await.unwrap().unwrap();
        assert_eq!(driver.total_rides, 5);
        assert!(driver.is_available);
    }

    #[tokio::test]
    async fn test_transitions_check_state_and_driver() {
        let f = fixture().await;
        let ride = accepted_ride(&f).await;

        let err = f
            .service
            .complete_ride(&f.driver_actor, ride.id, RideCompletion::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));

        let stranger = Actor::driver(Uuid::new_v4());
        f.store
            .insert_driver(&Driver::new(stranger.user_id, None))
            .await
            .unwrap();
        let err = f.service.start_ride(&stranger, ride.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        f.service.start_ride(&f.driver_actor, ride.id).await.unwrap();
        let err = f.service.start_ride(&f.driver_actor, ride.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_cancel_open_request_expires_pending_matches() {
        let f = fixture().await;

        let err = f
            .service
            .cancel_ride_request(&Actor::customer(Uuid::new_v4()), f.request.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let canceled = f.service.cancel_ride_request(&f.customer, f.request.id).await.unwrap();
        assert_eq!(canceled.status, RideRequestStatus::Canceled);
        let m = f.store.find_match(f.matched.id).await.unwrap().unwrap();
        assert_eq!(m.status, MatchStatus::Expired);
    }

    #[tokio::test]
    async fn test_cancel_matched_request_fails() {
        let f = fixture().await;
        accepted_ride(&f).await;

        let err = f
            .service
            .cancel_ride_request(&f.customer, f.request.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
        let request = f.store.find_ride_request(f.request.id).await.unwrap().unwrap();
        assert_eq!(request.status, RideRequestStatus::Matched);
    }

    #[tokio::test]
    async fn test_ride_visibility() {
        let f = fixture().await;
        let ride = accepted_ride(&f).await;

        assert!(f.service.get_ride(&f.customer, ride.id).await.is_ok());
        assert!(f.service.get_ride(&f.driver_actor, ride.id).await.is_ok());
        let err = f
            .service
            .get_ride(&Actor::customer(Uuid::new_v4()), ride.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(f.service.list_rides(&f.customer).await.unwrap().len(), 1);
        assert_eq!(f.service.list_rides(&f.driver_actor).await.unwrap().len(), 1);
    }
}
