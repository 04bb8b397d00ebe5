//! Modelo de PricingConfig
//!
//! Configuración de tarifas por (ciudad, tipo de vehículo). Mapea a la tabla
//! `pricing_configs`, con unicidad case-insensitive sobre el par.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Modo de precio - mapea al ENUM pricing_mode
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "pricing_mode", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PricingMode {
    /// Tarifa calculada por distancia/tiempo
    Metered,
    /// Tarifa acordada por ofertas entre pasajero y conductor
    Negotiated,
}

/// Tarifas por defecto cuando no existe configuración para el par
pub const DEFAULT_BASE_FARE: Decimal = Decimal::from_parts(25000, 0, 0, false, 2);
pub const DEFAULT_PER_KM: Decimal = Decimal::from_parts(12000, 0, 0, false, 2);
pub const DEFAULT_PER_MIN: Decimal = Decimal::from_parts(1000, 0, 0, false, 2);
pub const DEFAULT_BOOKING_FEE: Decimal = Decimal::from_parts(10000, 0, 0, false, 2);
pub const DEFAULT_MIN_FARE: Decimal = Decimal::from_parts(60000, 0, 0, false, 2);
pub const DEFAULT_SURGE_MULTIPLIER: Decimal = Decimal::from_parts(100, 0, 0, false, 2);
pub const DEFAULT_COMMISSION_PCT: Decimal = Decimal::from_parts(1500, 0, 0, false, 2);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PricingConfig {
    pub id: Uuid,
    pub city: String,
    pub vehicle_type: String,
    pub mode: PricingMode,
    pub base_fare: Decimal,
    pub per_km: Decimal,
    pub per_min: Decimal,
    pub booking_fee: Decimal,
    pub min_fare: Decimal,
    pub surge_multiplier: Decimal,
    /// Porcentaje 0-100, informativo para el cálculo de pagos al conductor
    pub commission_pct: Decimal,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PricingConfig {
    /// Configuración metered con las tarifas por defecto
    pub fn default_metered(city: &str, vehicle_type: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            city: city.to_string(),
            vehicle_type: vehicle_type.to_string(),
            mode: PricingMode::Metered,
            base_fare: DEFAULT_BASE_FARE,
            per_km: DEFAULT_PER_KM,
            per_min: DEFAULT_PER_MIN,
            booking_fee: DEFAULT_BOOKING_FEE,
            min_fare: DEFAULT_MIN_FARE,
            surge_multiplier: DEFAULT_SURGE_MULTIPLIER,
            commission_pct: DEFAULT_COMMISSION_PCT,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Clave de unicidad normalizada
    pub fn key(&self) -> (String, String) {
        pricing_key(&self.city, &self.vehicle_type)
    }

    pub fn is_negotiated(&self) -> bool {
        self.mode == PricingMode::Negotiated
    }
}

pub fn pricing_key(city: &str, vehicle_type: &str) -> (String, String) {
    (city.trim().to_lowercase(), vehicle_type.trim().to_lowercase())
}
