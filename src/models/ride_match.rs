//! Modelo de Match
//!
//! Emparejamiento candidato entre una solicitud y un conductor.
//! Único por (request_id, driver_id).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado del match - mapea al ENUM match_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "match_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl MatchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MatchStatus::Pending)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Match {
    pub id: Uuid,
    pub request_id: Uuid,
    pub driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub status: MatchStatus,
    pub distance_to_pickup_km: Decimal,
    pub eta_to_pickup_min: i32,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn pending(
        request_id: Uuid,
        driver_id: Uuid,
        vehicle_id: Option<Uuid>,
        distance_to_pickup_km: Decimal,
        eta_to_pickup_min: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            driver_id,
            vehicle_id,
            status: MatchStatus::Pending,
            distance_to_pickup_km,
            eta_to_pickup_min,
            created_at: Utc::now(),
        }
    }
}
