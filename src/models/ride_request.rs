//! Modelo de RideRequest
//!
//! Intención de viaje de un cliente. OPEN al crearse; pasa a MATCHED,
//! CANCELED o EXPIRED y no vuelve atrás.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Inapp,
    Cash,
}

/// Estado de la solicitud - mapea al ENUM ride_request_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "ride_request_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideRequestStatus {
    Open,
    Matched,
    Expired,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct RideRequest {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub distance_km: Decimal,
    pub estimated_amount_low: Decimal,
    pub estimated_amount_high: Decimal,
    pub payment_method: PaymentMethod,
    pub city: String,
    pub vehicle_type: String,
    pub status: RideRequestStatus,
    pub requested_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Datos de entrada para crear una solicitud
#[derive(Debug, Clone)]
pub struct NewRideRequest {
    pub customer_id: Uuid,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub payment_method: PaymentMethod,
    pub city: String,
    pub vehicle_type: String,
}

impl RideRequest {
    /// Solicitud OPEN sin estimaciones; se rellenan justo después de crearla
    pub fn open(new: NewRideRequest, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            pickup_address: new.pickup_address,
            dropoff_address: new.dropoff_address,
            pickup_lat: new.pickup.lat,
            pickup_lng: new.pickup.lng,
            dropoff_lat: new.dropoff.lat,
            dropoff_lng: new.dropoff.lng,
            distance_km: Decimal::ZERO,
            estimated_amount_low: Decimal::ZERO,
            estimated_amount_high: Decimal::ZERO,
            payment_method: new.payment_method,
            city: new.city,
            vehicle_type: new.vehicle_type,
            status: RideRequestStatus::Open,
            requested_at: Utc::now(),
            expires_at,
        }
    }

    pub fn pickup(&self) -> GeoPoint {
        GeoPoint::new(self.pickup_lat, self.pickup_lng)
    }

    pub fn dropoff(&self) -> GeoPoint {
        GeoPoint::new(self.dropoff_lat, self.dropoff_lng)
    }

    pub fn is_open(&self) -> bool {
        self.status == RideRequestStatus::Open
    }

    pub fn is_past_deadline(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |deadline| deadline <= now)
    }
}
