//! Parámetros del motor de despacho
//!
//! Radio y tamaño de la lista de candidatos, plazos de expiración y las
//! decisiones de producto sobre el modo negociado. Todo sobreescribible con
//! variables `DISPATCH_*`.

use chrono::Duration;

use super::environment::parse_var;
use crate::utils::errors::AppError;

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub search_radius_km: f64,
    pub candidate_limit: usize,
    /// Vida de una solicitud OPEN antes de pasar a EXPIRED
    pub request_ttl_secs: i64,
    /// Vida de un match PENDING antes de pasar a EXPIRED
    pub match_ttl_secs: i64,
    pub expiry_sweep_secs: u64,
    /// Sin oferta no se puede aceptar un match negociado
    pub require_offer_for_negotiated_accept: bool,
    /// Sólo un conductor con match PENDING puede ofertar como DRIVER
    pub restrict_driver_offers_to_matched: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            search_radius_km: 8.0,
            candidate_limit: 5,
            request_ttl_secs: 300,
            match_ttl_secs: 120,
            expiry_sweep_secs: 30,
            require_offer_for_negotiated_accept: true,
            restrict_driver_offers_to_matched: true,
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let config = Self {
            search_radius_km: parse_var("DISPATCH_SEARCH_RADIUS_KM")?
                .unwrap_or(defaults.search_radius_km),
            candidate_limit: parse_var("DISPATCH_CANDIDATE_LIMIT")?
                .unwrap_or(defaults.candidate_limit),
            request_ttl_secs: parse_var("DISPATCH_REQUEST_TTL_SECS")?
                .unwrap_or(defaults.request_ttl_secs),
            match_ttl_secs: parse_var("DISPATCH_MATCH_TTL_SECS")?
                .unwrap_or(defaults.match_ttl_secs),
            expiry_sweep_secs: parse_var("DISPATCH_EXPIRY_SWEEP_SECS")?
                .unwrap_or(defaults.expiry_sweep_secs),
            require_offer_for_negotiated_accept: parse_var(
                "DISPATCH_REQUIRE_OFFER_FOR_NEGOTIATED_ACCEPT",
            )?
            .unwrap_or(defaults.require_offer_for_negotiated_accept),
            restrict_driver_offers_to_matched: parse_var(
                "DISPATCH_RESTRICT_DRIVER_OFFERS_TO_MATCHED",
            )?
            .unwrap_or(defaults.restrict_driver_offers_to_matched),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.search_radius_km.is_nan() || self.search_radius_km <= 0.0 {
            return Err(AppError::Configuration(
                "DISPATCH_SEARCH_RADIUS_KM must be positive".to_string(),
            ));
        }
        if self.request_ttl_secs <= 0 || self.match_ttl_secs <= 0 || self.expiry_sweep_secs == 0 {
            return Err(AppError::Configuration(
                "dispatch TTLs and sweep interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn request_ttl(&self) -> Duration {
        Duration::seconds(self.request_ttl_secs)
    }

    pub fn match_ttl(&self) -> Duration {
        Duration::seconds(self.match_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DispatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search_radius_km, 8.0);
        assert_eq!(config.candidate_limit, 5);
        assert_eq!(config.request_ttl(), Duration::minutes(5));
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        let config = DispatchConfig {
            search_radius_km: 0.0,
            ..DispatchConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
