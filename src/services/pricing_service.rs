//! Motor de precios
//!
//! Banda de tarifa metered, resolución get-or-create de la configuración por
//! (ciudad, tipo de vehículo) y administración de configuraciones.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Actor, PricingConfig, PricingMode};
use crate::repositories::DispatchStore;
use crate::services::candidate_service::TRIP_SPEED_KMH;
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};
use crate::utils::geo::{distance_km, eta_minutes, GeoPoint};
use crate::utils::money::{decimal_2dp, round_money};

/// Fracción de la banda alrededor del total (10%)
const BAND_RATIO: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Banda [low, high] alrededor de un total redondeado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBand {
    pub total: Decimal,
    pub low: Decimal,
    pub high: Decimal,
}

impl PriceBand {
    pub fn zero() -> Self {
        Self {
            total: Decimal::ZERO,
            low: Decimal::ZERO,
            high: Decimal::ZERO,
        }
    }
}

/// Tarifa metered: base + km + min + booking, surge, mínimo, descuento,
/// redondeo half-up a 2 decimales y banda del 10%.
pub fn metered_quote(
    distance_km: Decimal,
    duration_min: Decimal,
    cfg: &PricingConfig,
    discount: Decimal,
) -> PriceBand {
    let mut total = cfg.base_fare + cfg.per_km * distance_km + cfg.per_min * duration_min + cfg.booking_fee;
    total *= cfg.surge_multiplier;
    total = total.max(cfg.min_fare);
    total = (total - discount).max(Decimal::ZERO);
    let total = round_money(total);

    let band = round_money(total * BAND_RATIO);
    PriceBand {
        total,
        low: (total - band).max(Decimal::ZERO),
        high: total + band,
    }
}

/// Duración estimada del viaje (minutos) a velocidad de trayecto
pub fn trip_duration_min(distance_km: Decimal) -> Decimal {
    let km = crate::utils::money::to_f64(distance_km);
    Decimal::from(eta_minutes(km, TRIP_SPEED_KMH))
}

/// Cotización sin persistir nada salvo, quizás, la configuración por defecto
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub mode: PricingMode,
    pub city: String,
    pub vehicle_type: String,
    pub distance_km: Decimal,
    pub low: Decimal,
    pub high: Decimal,
    pub surge: Decimal,
    pub min_fare: Decimal,
}

#[derive(Clone)]
pub struct PricingService {
    store: Arc<dyn DispatchStore>,
}

impl PricingService {
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self { store }
    }

    /// Configuración activa para el par; si no existe se crea la de por defecto.
    ///
    /// Dos primeras llamadas concurrentes para el mismo par compiten en la
    /// restricción única del store; la perdedora vuelve a leer.
    pub async fn get_pricing_config(&self, city: &str, vehicle_type: &str) -> AppResult<PricingConfig> {
        if let Some(config) = self.store.find_active_pricing_config(city, vehicle_type).await? {
            return Ok(config);
        }

        let draft = PricingConfig::default_metered(city.trim(), vehicle_type.trim());
        if let Some(created) = self.store.insert_pricing_config_if_absent(&draft).await? {
            log::info!(
                "🆕 Tarifa por defecto creada para {}/{}",
                created.city,
                created.vehicle_type
            );
            return Ok(created);
        }

        match self.store.find_active_pricing_config(city, vehicle_type).await? {
            Some(config) => Ok(config),
            None => {
                // El par existe pero está inactivo: se cotiza con los valores por defecto
                log::warn!(
                    "⚠️ La tarifa de {}/{} está inactiva, usando valores por defecto",
                    city,
                    vehicle_type
                );
                Ok(draft)
            }
        }
    }

    /// Banda para una distancia ya redondeada; cero en modo negociado
    pub fn estimate_band(&self, distance_km: Decimal, cfg: &PricingConfig) -> PriceBand {
        if cfg.is_negotiated() {
            return PriceBand::zero();
        }
        metered_quote(distance_km, trip_duration_min(distance_km), cfg, Decimal::ZERO)
    }

    pub async fn quote(
        &self,
        pickup: GeoPoint,
        dropoff: GeoPoint,
        city: &str,
        vehicle_type: &str,
    ) -> AppResult<Quote> {
        let cfg = self.get_pricing_config(city, vehicle_type).await?;
        let distance = decimal_2dp(distance_km(pickup, dropoff));
        let band = self.estimate_band(distance, &cfg);

        Ok(Quote {
            mode: cfg.mode,
            city: city.to_string(),
            vehicle_type: vehicle_type.to_string(),
            distance_km: distance,
            low: band.low,
            high: band.high,
            surge: cfg.surge_multiplier,
            min_fare: cfg.min_fare,
        })
    }

    // Administración

    pub async fn list_configs(&self, actor: &Actor) -> AppResult<Vec<PricingConfig>> {
        require_admin(actor)?;
        self.store.list_pricing_configs().await
    }

    pub async fn create_config(&self, actor: &Actor, config: PricingConfig) -> AppResult<PricingConfig> {
        require_admin(actor)?;
        let created = self
            .store
            .insert_pricing_config_if_absent(&config)
            .await?
            .ok_or_else(|| {
                conflict_error(
                    "Pricing config",
                    "city/vehicle_type",
                    &format!("{}/{}", config.city, config.vehicle_type),
                )
            })?;

        log::info!(
            "✅ Tarifa {} creada para {}/{} ({:?})",
            created.id,
            created.city,
            created.vehicle_type,
            created.mode
        );
        Ok(created)
    }

    /// Aplica `change` sobre la configuración existente y la guarda
    pub async fn update_config<F>(&self, actor: &Actor, id: Uuid, change: F) -> AppResult<PricingConfig>
    where
        F: FnOnce(&mut PricingConfig) + Send,
    {
        require_admin(actor)?;
        let mut config = self
            .store
            .find_pricing_config_by_id(id)
            .await?
            .ok_or_else(|| not_found_error("Pricing config", id))?;

        change(&mut config);
        config.updated_at = Utc::now();

        let updated = self.store.update_pricing_config(&config).await?;
        log::info!("✅ Tarifa {} actualizada", updated.id);
        Ok(updated)
    }
}

fn require_admin(actor: &Actor) -> AppResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Unauthorized(
            "Only administrators can manage pricing configs.".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryDispatchStore;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn service() -> (PricingService, Arc<MemoryDispatchStore>) {
        let store = Arc::new(MemoryDispatchStore::new());
        (PricingService::new(store.clone()), store)
    }

    #[test]
    fn test_zero_trip_clamps_to_min_fare() {
        let cfg = PricingConfig::default_metered("Lagos", "Standard");
        let band = metered_quote(Decimal::ZERO, Decimal::ZERO, &cfg, Decimal::ZERO);
        // 250 + 100 = 350 < 600
        assert_eq!(band.total, dec("600.00"));
        assert_eq!(band.low, dec("540.00"));
        assert_eq!(band.high, dec("660.00"));
    }

    #[test]
    fn test_metered_quote_known_values() {
        let cfg = PricingConfig::default_metered("Lagos", "Standard");
        // 250 + 120*10 + 10*27 + 100 = 1820
        let band = metered_quote(dec("10"), dec("27"), &cfg, Decimal::ZERO);
        assert_eq!(band.total, dec("1820.00"));
        assert_eq!(band.low, dec("1638.00"));
        assert_eq!(band.high, dec("2002.00"));
    }

    #[test]
    fn test_surge_discount_and_rounding() {
        let mut cfg = PricingConfig::default_metered("Abuja", "Comfort");
        cfg.surge_multiplier = dec("1.5");
        // (250 + 120*3.33 + 10*9 + 100) * 1.5 = 1259.4, menos 100.05
        let band = metered_quote(dec("3.33"), dec("9"), &cfg, dec("100.05"));
        assert_eq!(band.total, dec("1159.35"));
        // 115.935 -> 115.94
        assert_eq!(band.high - band.total, dec("115.94"));
        assert_eq!(band.total - band.low, dec("115.94"));
    }

    #[test]
    fn test_discount_never_goes_negative() {
        let cfg = PricingConfig::default_metered("Lagos", "Standard");
        let band = metered_quote(Decimal::ZERO, Decimal::ZERO, &cfg, dec("5000"));
        assert_eq!(band, PriceBand::zero());
    }

    #[test]
    fn test_band_properties_hold_over_grid() {
        let mut cfg = PricingConfig::default_metered("Lagos", "Standard");
        for surge in ["0", "0.8", "1", "2.25"] {
            cfg.surge_multiplier = dec(surge);
            for km in ["0", "0.5", "4.37", "18", "250.99"] {
                for min in ["0", "1", "15", "95"] {
                    let band = metered_quote(dec(km), dec(min), &cfg, Decimal::ZERO);
                    assert!(band.low <= band.high);
                    assert!(band.low >= Decimal::ZERO);
                    let spread = round_money(band.total * BAND_RATIO);
                    if band.total >= spread {
                        assert_eq!(band.high - band.low, spread * Decimal::TWO);
                    }
                }
            }
        }
    }

    #[test]
    fn test_trip_duration_uses_trip_speed() {
        assert_eq!(trip_duration_min(dec("11")), dec("30"));
        assert_eq!(trip_duration_min(Decimal::ZERO), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_get_pricing_config_creates_default_once() {
        let (service, store) = service();
        let first = service.get_pricing_config("Lagos", "Standard").await.unwrap();
        let second = service.get_pricing_config("LAGOS", " standard ").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.mode, PricingMode::Metered);
        assert_eq!(first.min_fare, dec("600.00"));
        assert_eq!(store.list_pricing_configs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_creates_one_config() {
        let (service, store) = service();
        let calls = (0..8).map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.get_pricing_config("Ibadan", "Bike").await })
        });
        let ids: Vec<Uuid> = futures::future::join_all(calls)
            .await
            .into_iter()
            .map(|r| r.unwrap().unwrap().id)
            .collect();

        assert!(ids.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(store.list_pricing_configs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_config_falls_back_to_defaults() {
        let (service, store) = service();
        let mut cfg = PricingConfig::default_metered("Kano", "Standard");
        cfg.active = false;
        cfg.base_fare = dec("999");
        store.insert_pricing_config_if_absent(&cfg).await.unwrap();

        let resolved = service.get_pricing_config("Kano", "Standard").await.unwrap();
        assert_ne!(resolved.id, cfg.id);
        assert_eq!(resolved.base_fare, dec("250.00"));
        assert_eq!(store.list_pricing_configs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_quote_negotiated_has_zero_band() {
        let (service, store) = service();
        let mut cfg = PricingConfig::default_metered("Lagos", "Keke");
        cfg.mode = PricingMode::Negotiated;
        store.insert_pricing_config_if_absent(&cfg).await.unwrap();

        let quote = service
            .quote(GeoPoint::new(6.5, 3.3), GeoPoint::new(6.55, 3.35), "Lagos", "Keke")
            .await
            .unwrap();
        assert_eq!(quote.mode, PricingMode::Negotiated);
        assert_eq!(quote.low, Decimal::ZERO);
        assert_eq!(quote.high, Decimal::ZERO);
        assert!(quote.distance_km > Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_admin_only_management() {
        let (service, _store) = service();
        let customer = Actor::customer(Uuid::new_v4());
        let admin = Actor::admin(Uuid::new_v4());

        let err = service.list_configs(&customer).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let created = service
            .create_config(&admin, PricingConfig::default_metered("Enugu", "XL"))
            .await
            .unwrap();
        let dup = service
            .create_config(&admin, PricingConfig::default_metered("enugu", "xl"))
            .await
            .unwrap_err();
        assert!(matches!(dup, AppError::Conflict(_)));

        let updated = service
            .update_config(&admin, created.id, |c| c.surge_multiplier = dec("1.75"))
            .await
            .unwrap();
        assert_eq!(updated.surge_multiplier, dec("1.75"));
    }
}
