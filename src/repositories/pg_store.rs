//! Store PostgreSQL
//!
//! Implementación de `DispatchStore` sobre SQLx. Los comandos multi-fila
//! corren dentro de una transacción; las transiciones usan
//! `UPDATE ... WHERE status = <esperado>` y un `rows_affected` de 0 significa
//! que otro escritor ganó.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use super::dispatch_store::{DispatchStore, ExpirySweep, MatchAcceptance, RideTransition};
use crate::models::{Driver, Match, NegotiationOffer, PricingConfig, Ride, RideRequest};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

#[derive(Clone)]
pub struct PgDispatchStore {
    pool: PgPool,
}

impl PgDispatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map_or(false, |db| db.is_unique_violation())
}

#[async_trait]
impl DispatchStore for PgDispatchStore {
    async fn find_active_pricing_config(
        &self,
        city: &str,
        vehicle_type: &str,
    ) -> AppResult<Option<PricingConfig>> {
        let config = sqlx::query_as::<_, PricingConfig>(
            r#"
            SELECT * FROM pricing_configs
            WHERE LOWER(city) = LOWER($1) AND LOWER(vehicle_type) = LOWER($2) AND active
            LIMIT 1
            "#,
        )
        .bind(city.trim())
        .bind(vehicle_type.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(config)
    }

    async fn insert_pricing_config_if_absent(
        &self,
        config: &PricingConfig,
    ) -> AppResult<Option<PricingConfig>> {
        let created = sqlx::query_as::<_, PricingConfig>(
            r#"
            INSERT INTO pricing_configs (
                id, city, vehicle_type, mode, base_fare, per_km, per_min, booking_fee,
                min_fare, surge_multiplier, commission_pct, active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT DO NOTHING
            RETURNING *
            "#,
        )
        .bind(config.id)
        .bind(&config.city)
        .bind(&config.vehicle_type)
        .bind(config.mode)
        .bind(config.base_fare)
        .bind(config.per_km)
        .bind(config.per_min)
        .bind(config.booking_fee)
        .bind(config.min_fare)
        .bind(config.surge_multiplier)
        .bind(config.commission_pct)
        .bind(config.active)
        .bind(config.created_at)
        .bind(config.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_pricing_config_by_id(&self, id: Uuid) -> AppResult<Option<PricingConfig>> {
        let config = sqlx::query_as::<_, PricingConfig>("SELECT * FROM pricing_configs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(config)
    }

    async fn list_pricing_configs(&self) -> AppResult<Vec<PricingConfig>> {
        let configs = sqlx::query_as::<_, PricingConfig>(
            "SELECT * FROM pricing_configs ORDER BY LOWER(city), LOWER(vehicle_type)",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(configs)
    }

    async fn update_pricing_config(&self, config: &PricingConfig) -> AppResult<PricingConfig> {
        let updated = sqlx::query_as::<_, PricingConfig>(
            r#"
            UPDATE pricing_configs
            SET city = $2, vehicle_type = $3, mode = $4, base_fare = $5, per_km = $6,
                per_min = $7, booking_fee = $8, min_fare = $9, surge_multiplier = $10,
                commission_pct = $11, active = $12, updated_at = $13
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(config.id)
        .bind(&config.city)
        .bind(&config.vehicle_type)
        .bind(config.mode)
        .bind(config.base_fare)
        .bind(config.per_km)
        .bind(config.per_min)
        .bind(config.booking_fee)
        .bind(config.min_fare)
        .bind(config.surge_multiplier)
        .bind(config.commission_pct)
        .bind(config.active)
        .bind(config.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict_error(
                    "Pricing config",
                    "city/vehicle_type",
                    &format!("{}/{}", config.city, config.vehicle_type),
                )
            } else {
                AppError::Database(e)
            }
        })?;

        updated.ok_or_else(|| not_found_error("Pricing config", config.id))
    }

    async fn find_driver(&self, id: Uuid) -> AppResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(driver)
    }

    async fn find_driver_by_user(&self, user_id: Uuid) -> AppResult<Option<Driver>> {
        let driver = sqlx::query_as::<_, Driver>("SELECT * FROM drivers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(driver)
    }

    async fn list_driver_pool(&self) -> AppResult<Vec<Driver>> {
        let drivers = sqlx::query_as::<_, Driver>(
            r#"
            SELECT * FROM drivers
            WHERE is_available AND current_lat IS NOT NULL AND current_lng IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(drivers)
    }

    async fn insert_driver(&self, driver: &Driver) -> AppResult<Driver> {
        let saved = sqlx::query_as::<_, Driver>(
            r#"
            INSERT INTO drivers (id, user_id, vehicle_id, current_lat, current_lng, is_available, total_rides, rating_avg)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(driver.id)
        .bind(driver.user_id)
        .bind(driver.vehicle_id)
        .bind(driver.current_lat)
        .bind(driver.current_lng)
        .bind(driver.is_available)
        .bind(driver.total_rides)
        .bind(driver.rating_avg)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                conflict_error("Driver", "user_id", &driver.user_id.to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        Ok(saved)
    }

    async fn update_driver_vehicle(&self, driver_id: Uuid, vehicle_id: Option<Uuid>) -> AppResult<Driver> {
        let driver = sqlx::query_as::<_, Driver>(
            "UPDATE drivers SET vehicle_id = $2 WHERE id = $1 RETURNING *",
        )
        .bind(driver_id)
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;

        driver.ok_or_else(|| not_found_error("Driver", driver_id))
    }

    async fn update_driver_location(&self, driver_id: Uuid, lat: f64, lng: f64) -> AppResult<Driver> {
        let driver = sqlx::query_as::<_, Driver>(
            "UPDATE drivers SET current_lat = $2, current_lng = $3 WHERE id = $1 RETURNING *",
        )
        .bind(driver_id)
        .bind(lat)
        .bind(lng)
        .fetch_optional(&self.pool)
        .await?;

        driver.ok_or_else(|| not_found_error("Driver", driver_id))
    }

    async fn insert_ride_request(&self, request: &RideRequest) -> AppResult<RideRequest> {
        let created = sqlx::query_as::<_, RideRequest>(
            r#"
            INSERT INTO ride_requests (
                id, customer_id, pickup_address, dropoff_address, pickup_lat, pickup_lng,
                dropoff_lat, dropoff_lng, distance_km, estimated_amount_low, estimated_amount_high,
                payment_method, city, vehicle_type, status, requested_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING *
            "#,
        )
        .bind(request.id)
        .bind(request.customer_id)
        .bind(&request.pickup_address)
        .bind(&request.dropoff_address)
        .bind(request.pickup_lat)
        .bind(request.pickup_lng)
        .bind(request.dropoff_lat)
        .bind(request.dropoff_lng)
        .bind(request.distance_km)
        .bind(request.estimated_amount_low)
        .bind(request.estimated_amount_high)
        .bind(request.payment_method)
        .bind(&request.city)
        .bind(&request.vehicle_type)
        .bind(request.status)
        .bind(request.requested_at)
        .bind(request.expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_ride_request(&self, id: Uuid) -> AppResult<Option<RideRequest>> {
        let request = sqlx::query_as::<_, RideRequest>("SELECT * FROM ride_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(request)
    }

    async fn list_ride_requests_by_customer(&self, customer_id: Uuid) -> AppResult<Vec<RideRequest>> {
        let requests = sqlx::query_as::<_, RideRequest>(
            "SELECT * FROM ride_requests WHERE customer_id = $1 ORDER BY requested_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn save_request_estimates(
        &self,
        id: Uuid,
        distance_km: Decimal,
        low: Decimal,
        high: Decimal,
    ) -> AppResult<RideRequest> {
        let request = sqlx::query_as::<_, RideRequest>(
            r#"
            UPDATE ride_requests
            SET distance_km = $2, estimated_amount_low = $3, estimated_amount_high = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(distance_km)
        .bind(low)
        .bind(high)
        .fetch_optional(&self.pool)
        .await?;

        request.ok_or_else(|| not_found_error("Ride request", id))
    }

    async fn insert_matches_if_absent(&self, request_id: Uuid, matches: &[Match]) -> AppResult<Vec<Match>> {
        let mut tx = self.pool.begin().await?;

        for candidate in matches {
            sqlx::query(
                r#"
                INSERT INTO matches (
                    id, request_id, driver_id, vehicle_id, status,
                    distance_to_pickup_km, eta_to_pickup_min, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (request_id, driver_id) DO NOTHING
                "#,
            )
            .bind(candidate.id)
            .bind(request_id)
            .bind(candidate.driver_id)
            .bind(candidate.vehicle_id)
            .bind(candidate.status)
            .bind(candidate.distance_to_pickup_km)
            .bind(candidate.eta_to_pickup_min)
            .bind(candidate.created_at)
            .execute(&mut *tx)
            .await?;
        }

        let all = sqlx::query_as::<_, Match>(
            "SELECT * FROM matches WHERE request_id = $1 ORDER BY created_at, id",
        )
        .bind(request_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(all)
    }

    async fn find_match(&self, id: Uuid) -> AppResult<Option<Match>> {
        let found = sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found)
    }

    async fn list_matches_for_request(&self, request_id: Uuid) -> AppResult<Vec<Match>> {
        let matches = sqlx::query_as::<_, Match>(
            "SELECT * FROM matches WHERE request_id = $1 ORDER BY created_at, id",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    async fn list_matches_for_driver(&self, driver_id: Uuid) -> AppResult<Vec<Match>> {
        let matches = sqlx::query_as::<_, Match>(
            "SELECT * FROM matches WHERE driver_id = $1 ORDER BY created_at DESC",
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(matches)
    }

    async fn reject_pending_match(&self, match_id: Uuid) -> AppResult<Match> {
        let rejected = sqlx::query_as::<_, Match>(
            "UPDATE matches SET status = 'REJECTED' WHERE id = $1 AND status = 'PENDING' RETURNING *",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await?;

        match rejected {
            Some(m) => Ok(m),
            None => match self.find_match(match_id).await? {
                Some(_) => Err(AppError::InvalidState("Match is not pending.".to_string())),
                None => Err(not_found_error("Match", match_id)),
            },
        }
    }

    async fn commit_acceptance(&self, acceptance: MatchAcceptance) -> AppResult<Ride> {
        let mut tx = self.pool.begin().await?;

        // Punto de serialización: sólo un aceptante ve OPEN -> MATCHED
        let claimed = sqlx::query(
            "UPDATE ride_requests SET status = 'MATCHED' WHERE id = $1 AND status = 'OPEN'",
        )
        .bind(acceptance.request_id)
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Err(AppError::InvalidState(
                "Ride request is not open anymore.".to_string(),
            ));
        }

        // El conductor sólo puede tener un viaje vivo: se reclama si sigue disponible
        let claimed_driver = sqlx::query(
            "UPDATE drivers SET is_available = $2 WHERE id = $1 AND is_available",
        )
        .bind(acceptance.driver_id)
        .bind(acceptance.driver_available)
        .execute(&mut *tx)
        .await?;
        if claimed_driver.rows_affected() == 0 {
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM drivers WHERE id = $1")
                .bind(acceptance.driver_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match exists {
                Some(_) => AppError::InvalidState("Driver is already on another ride.".to_string()),
                None => not_found_error("Driver", acceptance.driver_id),
            });
        }

        let accepted = sqlx::query(
            r#"
            UPDATE matches SET status = 'ACCEPTED'
            WHERE id = $1 AND request_id = $2 AND driver_id = $3 AND status = 'PENDING'
            "#,
        )
        .bind(acceptance.match_id)
        .bind(acceptance.request_id)
        .bind(acceptance.driver_id)
        .execute(&mut *tx)
        .await?;
        if accepted.rows_affected() == 0 {
            return Err(AppError::InvalidState("Match is not pending.".to_string()));
        }

        sqlx::query("UPDATE matches SET status = 'REJECTED' WHERE request_id = $1 AND id <> $2")
            .bind(acceptance.request_id)
            .bind(acceptance.match_id)
            .execute(&mut *tx)
            .await?;

        let ride = &acceptance.ride;
        let created = sqlx::query_as::<_, Ride>(
            r#"
            INSERT INTO rides (
                id, request_id, driver_id, vehicle_id, customer_id, pickup_address,
                dropoff_address, end_address, pickup_lat, pickup_lng, dropoff_lat, dropoff_lng,
                end_lat, end_lng, discount, distance_km, estimated_amount_low,
                estimated_amount_high, amount_total, amount_paid, payment_method, status,
                city, vehicle_type, requested_at, started_at, ended_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
            RETURNING *
            "#,
        )
        .bind(ride.id)
        .bind(ride.request_id)
        .bind(ride.driver_id)
        .bind(ride.vehicle_id)
        .bind(ride.customer_id)
        .bind(&ride.pickup_address)
        .bind(&ride.dropoff_address)
        .bind(&ride.end_address)
        .bind(ride.pickup_lat)
        .bind(ride.pickup_lng)
        .bind(ride.dropoff_lat)
        .bind(ride.dropoff_lng)
        .bind(ride.end_lat)
        .bind(ride.end_lng)
        .bind(ride.discount)
        .bind(ride.distance_km)
        .bind(ride.estimated_amount_low)
        .bind(ride.estimated_amount_high)
        .bind(ride.amount_total)
        .bind(ride.amount_paid)
        .bind(ride.payment_method)
        .bind(ride.status)
        .bind(&ride.city)
        .bind(&ride.vehicle_type)
        .bind(ride.requested_at)
        .bind(ride.started_at)
        .bind(ride.ended_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict(format!(
                    "A ride already exists for request {}",
                    acceptance.request_id
                ))
            } else {
                AppError::Database(e)
            }
        })?;

        tx.commit().await?;
        Ok(created)
    }

    async fn commit_request_cancellation(&self, request_id: Uuid) -> AppResult<RideRequest> {
        let mut tx = self.pool.begin().await?;

        let canceled = sqlx::query_as::<_, RideRequest>(
            "UPDATE ride_requests SET status = 'CANCELED' WHERE id = $1 AND status = 'OPEN' RETURNING *",
        )
        .bind(request_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(canceled) = canceled else {
            return match self.find_ride_request(request_id).await? {
                Some(_) => Err(AppError::InvalidState(
                    "Request cannot be canceled now.".to_string(),
                )),
                None => Err(not_found_error("Ride request", request_id)),
            };
        };

        sqlx::query(
            "UPDATE matches SET status = 'EXPIRED' WHERE request_id = $1 AND status = 'PENDING'",
        )
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(canceled)
    }

    async fn apply_ride_transition(&self, transition: RideTransition) -> AppResult<Ride> {
        let mut tx = self.pool.begin().await?;

        // Bloquear al conductor: mismo punto de sincronización que la aceptación
        let locked: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM drivers WHERE id = $1 FOR UPDATE")
            .bind(transition.driver_id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(not_found_error("Driver", transition.driver_id));
        }

        let updated = sqlx::query_as::<_, Ride>(
            r#"
            UPDATE rides
            SET status = $4,
                started_at = COALESCE($5, started_at),
                ended_at = COALESCE($6, ended_at),
                amount_total = COALESCE($7, amount_total),
                end_lat = COALESCE($8, end_lat),
                end_lng = COALESCE($9, end_lng),
                end_address = COALESCE($10, end_address)
            WHERE id = $1 AND driver_id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(transition.ride_id)
        .bind(transition.driver_id)
        .bind(transition.from)
        .bind(transition.to)
        .bind(transition.started_at)
        .bind(transition.ended_at)
        .bind(transition.amount_total)
        .bind(transition.end_lat)
        .bind(transition.end_lng)
        .bind(&transition.end_address)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            return match self.find_ride(transition.ride_id).await? {
                Some(ride) => Err(AppError::InvalidState(format!(
                    "Ride is {:?}, expected {:?}.",
                    ride.status, transition.from
                ))),
                None => Err(not_found_error("Ride", transition.ride_id)),
            };
        };

        sqlx::query(
            "UPDATE drivers SET is_available = $2, total_rides = total_rides + $3 WHERE id = $1",
        )
        .bind(transition.driver_id)
        .bind(transition.driver_available)
        .bind(transition.completed_rides_delta)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn find_ride(&self, id: Uuid) -> AppResult<Option<Ride>> {
        let ride = sqlx::query_as::<_, Ride>("SELECT * FROM rides WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(ride)
    }

    async fn list_rides_for_driver(&self, driver_id: Uuid) -> AppResult<Vec<Ride>> {
        let rides = sqlx::query_as::<_, Ride>(
            "SELECT * FROM rides WHERE driver_id = $1 ORDER BY requested_at DESC",
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rides)
    }

    async fn list_rides_for_customer(&self, customer_id: Uuid) -> AppResult<Vec<Ride>> {
        let rides = sqlx::query_as::<_, Ride>(
            "SELECT * FROM rides WHERE customer_id = $1 ORDER BY requested_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rides)
    }

    async fn insert_offer(&self, offer: &NegotiationOffer) -> AppResult<NegotiationOffer> {
        let created = sqlx::query_as::<_, NegotiationOffer>(
            r#"
            INSERT INTO negotiation_offers (id, request_id, user_id, role, amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(offer.id)
        .bind(offer.request_id)
        .bind(offer.user_id)
        .bind(offer.role)
        .bind(offer.amount)
        .bind(offer.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn latest_offer(&self, request_id: Uuid) -> AppResult<Option<NegotiationOffer>> {
        let offer = sqlx::query_as::<_, NegotiationOffer>(
            "SELECT * FROM negotiation_offers WHERE request_id = $1 ORDER BY seq DESC LIMIT 1",
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(offer)
    }

    async fn list_offers_for_request(&self, request_id: Uuid) -> AppResult<Vec<NegotiationOffer>> {
        let offers = sqlx::query_as::<_, NegotiationOffer>(
            "SELECT * FROM negotiation_offers WHERE request_id = $1 ORDER BY seq",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(offers)
    }

    async fn list_offers_by_user(&self, user_id: Uuid) -> AppResult<Vec<NegotiationOffer>> {
        let offers = sqlx::query_as::<_, NegotiationOffer>(
            "SELECT * FROM negotiation_offers WHERE user_id = $1 ORDER BY seq",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(offers)
    }

    async fn expire_overdue(
        &self,
        now: DateTime<Utc>,
        match_cutoff: DateTime<Utc>,
    ) -> AppResult<ExpirySweep> {
        let mut tx = self.pool.begin().await?;

        let expired: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE ride_requests SET status = 'EXPIRED'
            WHERE status = 'OPEN' AND expires_at IS NOT NULL AND expires_at <= $1
            RETURNING id
            "#,
        )
        .bind(now)
        .fetch_all(&mut *tx)
        .await?;
        let expired_ids: Vec<Uuid> = expired.into_iter().map(|(id,)| id).collect();

        let matches = sqlx::query(
            r#"
            UPDATE matches SET status = 'EXPIRED'
            WHERE status = 'PENDING' AND (request_id = ANY($1) OR created_at < $2)
            "#,
        )
        .bind(&expired_ids)
        .bind(match_cutoff)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ExpirySweep {
            requests_expired: expired_ids.len(),
            matches_expired: matches.rows_affected() as usize,
        })
    }
}
