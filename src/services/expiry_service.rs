//! Reaper de expiración
//!
//! Pasada periódica que lleva a EXPIRED las solicitudes OPEN vencidas (con
//! sus matches PENDING) y los matches PENDING más viejos que su TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;

use crate::config::DispatchConfig;
use crate::repositories::{DispatchStore, ExpirySweep};
use crate::utils::errors::AppResult;

#[derive(Clone)]
pub struct ExpiryService {
    store: Arc<dyn DispatchStore>,
    config: DispatchConfig,
}

impl ExpiryService {
    pub fn new(store: Arc<dyn DispatchStore>, config: DispatchConfig) -> Self {
        Self { store, config }
    }

    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<ExpirySweep> {
        let sweep = self
            .store
            .expire_overdue(now, now - self.config.match_ttl())
            .await?;
        if sweep != ExpirySweep::default() {
            log::info!(
                "⏰ Expiradas {} solicitud(es) y {} match(es)",
                sweep.requests_expired,
                sweep.matches_expired
            );
        }
        Ok(sweep)
    }

    /// Lanza el reaper en segundo plano
    pub fn spawn(self) -> JoinHandle<()> {
        let period = Duration::from_secs(self.config.expiry_sweep_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep(Utc::now()).await {
                    log::error!("❌ Falló el barrido de expiración: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Match, MatchStatus, NewRideRequest, PaymentMethod, RideRequest, RideRequestStatus};
    use crate::utils::geo::GeoPoint;
    use crate::repositories::MemoryDispatchStore;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn request(expires_at: DateTime<Utc>) -> RideRequest {
        RideRequest::open(
            NewRideRequest {
                customer_id: Uuid::new_v4(),
                pickup_address: "Bodija".to_string(),
                dropoff_address: "Dugbe".to_string(),
                pickup: GeoPoint::new(7.42, 3.91),
                dropoff: GeoPoint::new(7.38, 3.89),
                payment_method: PaymentMethod::Cash,
                city: "Ibadan".to_string(),
                vehicle_type: "Standard".to_string(),
            },
            Some(expires_at),
        )
    }

    #[tokio::test]
    async fn test_sweep_expires_overdue_requests_and_stale_matches() {
        let store = Arc::new(MemoryDispatchStore::new());
        let service = ExpiryService::new(store.clone(), DispatchConfig::default());
        let now = Utc::now();

        let overdue = store.insert_ride_request(&request(now - chrono::Duration::seconds(1))).await.unwrap();
        let live = store.insert_ride_request(&request(now + chrono::Duration::minutes(5))).await.unwrap();

        let on_overdue = Match::pending(overdue.id, Uuid::new_v4(), None, Decimal::ONE, 2);
        let fresh = Match::pending(live.id, Uuid::new_v4(), None, Decimal::ONE, 2);
        let mut stale = Match::pending(live.id, Uuid::new_v4(), None, Decimal::ONE, 2);
        stale.created_at = now - chrono::Duration::minutes(10);
        store.insert_matches_if_absent(overdue.id, &[on_overdue.clone()]).await.unwrap();
        store.insert_matches_if_absent(live.id, &[fresh.clone(), stale.clone()]).await.unwrap();

        let sweep = service.sweep(now).await.unwrap();
        assert_eq!(sweep, ExpirySweep { requests_expired: 1, matches_expired: 2 });

        let status = |id| {
            let store = store.clone();
            async move { store.find_match(id).await.unwrap().unwrap().status }
        };
        assert_eq!(status(on_overdue.id).await, MatchStatus::Expired);
        assert_eq!(status(stale.id).await, MatchStatus::Expired);
        assert_eq!(status(fresh.id).await, MatchStatus::Pending);
        assert_eq!(
            store.find_ride_request(overdue.id).await.unwrap().unwrap().status,
            RideRequestStatus::Expired
        );
        assert_eq!(
            store.find_ride_request(live.id).await.unwrap().unwrap().status,
            RideRequestStatus::Open
        );

        // Segunda pasada: nada más que hacer
        assert_eq!(service.sweep(now).await.unwrap(), ExpirySweep::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_reaper_runs_on_interval() {
        let store = Arc::new(MemoryDispatchStore::new());
        let overdue = store
            .insert_ride_request(&request(Utc::now() - chrono::Duration::seconds(1)))
            .await
            .unwrap();

        let handle = ExpiryService::new(store.clone(), DispatchConfig::default()).spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(
            store.find_ride_request(overdue.id).await.unwrap().unwrap().status,
            RideRequestStatus::Expired
        );
        handle.abort();
    }
}
