//! Modelo de Ride
//!
//! Viaje creado únicamente desde un Match aceptado. Copia los datos de
//! recogida/destino de la solicitud.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

use super::ride_match::Match;
use super::ride_request::{PaymentMethod, RideRequest};

/// Estado del viaje - mapea al ENUM ride_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "ride_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Accepted,
    InProgress,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Ride {
    pub id: Uuid,
    pub request_id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub end_address: String,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub end_lat: Option<f64>,
    pub end_lng: Option<f64>,
    pub discount: Decimal,
    pub distance_km: Decimal,
    pub estimated_amount_low: Decimal,
    pub estimated_amount_high: Decimal,
    pub amount_total: Decimal,
    pub amount_paid: Decimal,
    pub payment_method: PaymentMethod,
    pub status: RideStatus,
    pub city: String,
    pub vehicle_type: String,
    pub requested_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Ride {
    /// Viaje ACCEPTED a partir de la solicitud y su match aceptado
    pub fn from_accepted_match(request: &RideRequest, accepted: &Match, amount_total: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id: request.id,
            driver_id: accepted.driver_id,
            vehicle_id: accepted.vehicle_id,
            customer_id: request.customer_id,
            pickup_address: request.pickup_address.clone(),
            dropoff_address: request.dropoff_address.clone(),
            end_address: String::new(),
            pickup_lat: request.pickup_lat,
            pickup_lng: request.pickup_lng,
            dropoff_lat: request.dropoff_lat,
            dropoff_lng: request.dropoff_lng,
            end_lat: None,
            end_lng: None,
            discount: Decimal::ZERO,
            distance_km: request.distance_km,
            estimated_amount_low: request.estimated_amount_low,
            estimated_amount_high: request.estimated_amount_high,
            amount_total,
            amount_paid: Decimal::ZERO,
            payment_method: request.payment_method,
            status: RideStatus::Accepted,
            city: request.city.clone(),
            vehicle_type: request.vehicle_type.clone(),
            requested_at: request.requested_at,
            started_at: None,
            ended_at: None,
        }
    }
}
