//! Modelo de Driver
//!
//! Entidad externa referenciada por el motor. `is_available` es un recurso
//! que sólo el ciclo de vida del viaje modifica.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Driver {
    pub id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub current_lat: Option<f64>,
    pub current_lng: Option<f64>,
    pub is_available: bool,
    pub total_rides: i32,
    pub rating_avg: Decimal,
}

impl Driver {
    pub fn new(user_id: Uuid, vehicle_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            vehicle_id,
            current_lat: None,
            current_lng: None,
            is_available: true,
            total_rides: 0,
            rating_avg: Decimal::ZERO,
        }
    }

    pub fn at(mut self, lat: f64, lng: f64) -> Self {
        self.current_lat = Some(lat);
        self.current_lng = Some(lng);
        self
    }

    /// Última posición conocida, si existe
    pub fn location(&self) -> Option<GeoPoint> {
        match (self.current_lat, self.current_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }
}
