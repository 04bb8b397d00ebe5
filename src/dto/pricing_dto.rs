use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

use crate::models::{PricingConfig, PricingMode};
use crate::utils::validation::{validate_non_negative, validate_not_empty, validate_percentage};

// Request para crear una configuración de tarifas; lo omitido toma el valor por defecto
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePricingConfigRequest {
    #[validate(custom = "validate_not_empty")]
    pub city: String,
    #[validate(custom = "validate_not_empty")]
    pub vehicle_type: String,
    pub mode: Option<PricingMode>,
    #[validate(custom = "validate_non_negative")]
    pub base_fare: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub per_km: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub per_min: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub booking_fee: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub min_fare: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub surge_multiplier: Option<Decimal>,
    #[validate(custom = "validate_percentage")]
    pub commission_pct: Option<Decimal>,
    pub active: Option<bool>,
}

impl CreatePricingConfigRequest {
    pub fn into_config(self) -> PricingConfig {
        let mut config = PricingConfig::default_metered(self.city.trim(), self.vehicle_type.trim());
        UpdatePricingConfigRequest {
            city: None,
            vehicle_type: None,
            mode: self.mode,
            base_fare: self.base_fare,
            per_km: self.per_km,
            per_min: self.per_min,
            booking_fee: self.booking_fee,
            min_fare: self.min_fare,
            surge_multiplier: self.surge_multiplier,
            commission_pct: self.commission_pct,
            active: self.active,
        }
        .apply(&mut config);
        config
    }
}

// Request para actualizar una configuración de tarifas
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePricingConfigRequest {
    #[validate(custom = "validate_not_empty")]
    pub city: Option<String>,
    #[validate(custom = "validate_not_empty")]
    pub vehicle_type: Option<String>,
    pub mode: Option<PricingMode>,
    #[validate(custom = "validate_non_negative")]
    pub base_fare: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub per_km: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub per_min: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub booking_fee: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub min_fare: Option<Decimal>,
    #[validate(custom = "validate_non_negative")]
    pub surge_multiplier: Option<Decimal>,
    #[validate(custom = "validate_percentage")]
    pub commission_pct: Option<Decimal>,
    pub active: Option<bool>,
}

impl UpdatePricingConfigRequest {
    pub fn apply(self, config: &mut PricingConfig) {
        if let Some(city) = self.city {
            config.city = city.trim().to_string();
        }
        if let Some(vehicle_type) = self.vehicle_type {
            config.vehicle_type = vehicle_type.trim().to_string();
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(v) = self.base_fare {
            config.base_fare = v;
        }
        if let Some(v) = self.per_km {
            config.per_km = v;
        }
        if let Some(v) = self.per_min {
            config.per_min = v;
        }
        if let Some(v) = self.booking_fee {
            config.booking_fee = v;
        }
        if let Some(v) = self.min_fare {
            config.min_fare = v;
        }
        if let Some(v) = self.surge_multiplier {
            config.surge_multiplier = v;
        }
        if let Some(v) = self.commission_pct {
            config.commission_pct = v;
        }
        if let Some(active) = self.active {
            config.active = active;
        }
    }
}
