//! Negociación de tarifa
//!
//! Ofertas append-only sobre solicitudes OPEN en modo negociado, acotadas por
//! una banda de sensatez derivada de una cotización metered de referencia.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::config::DispatchConfig;
use crate::models::{Actor, MatchStatus, NegotiationOffer, OfferRole, PricingConfig, RideRequest};
use crate::repositories::DispatchStore;
use crate::services::driver_service::DriverService;
use crate::services::pricing_service::{metered_quote, PricingService};
use crate::utils::errors::{not_found_error, AppError, AppResult};
use crate::utils::money::round_money;

/// Duración nominal de la cotización de referencia
const REFERENCE_DURATION_MIN: Decimal = Decimal::from_parts(15, 0, 0, false, 0);
const LOWER_FACTOR: Decimal = Decimal::from_parts(5, 0, 0, false, 1);
const UPPER_FACTOR: Decimal = Decimal::from_parts(2, 0, 0, false, 0);

/// Rango admitido para una oferta, ambos extremos incluidos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SanityBand {
    pub min: Decimal,
    pub max: Decimal,
}

impl SanityBand {
    pub fn contains(&self, amount: Decimal) -> bool {
        amount >= self.min && amount <= self.max
    }
}

/// Banda [0.5 × low, 2.0 × high] de la cotización con las tarifas por defecto
/// y 15 minutos nominales, sobre la distancia de la solicitud.
pub fn sanity_band(distance_km: Decimal) -> SanityBand {
    let reference = PricingConfig::default_metered("", "");
    let band = metered_quote(distance_km, REFERENCE_DURATION_MIN, &reference, Decimal::ZERO);
    SanityBand {
        min: round_money(band.low * LOWER_FACTOR),
        max: round_money(band.high * UPPER_FACTOR),
    }
}

#[derive(Clone)]
pub struct NegotiationService {
    store: Arc<dyn DispatchStore>,
    pricing: PricingService,
    drivers: DriverService,
    config: DispatchConfig,
}

impl NegotiationService {
    pub fn new(store: Arc<dyn DispatchStore>, config: DispatchConfig) -> Self {
        Self {
            pricing: PricingService::new(store.clone()),
            drivers: DriverService::new(store.clone()),
            store,
            config,
        }
    }

    async fn find_request(&self, request_id: Uuid) -> AppResult<RideRequest> {
        self.store
            .find_ride_request(request_id)
            .await?
            .ok_or_else(|| not_found_error("Ride request", request_id))
    }

    /// El actor puede ofertar con `role` sobre la solicitud
    async fn authorize_offer(&self, actor: &Actor, request: &RideRequest, role: OfferRole) -> AppResult<()> {
        match role {
            OfferRole::Rider => {
                if request.customer_id != actor.user_id {
                    return Err(AppError::Unauthorized(
                        "Only the requesting rider can submit rider offers.".to_string(),
                    ));
                }
            }
            OfferRole::Driver => {
                let driver = self.drivers.profile_for(actor).await?;
                if self.config.restrict_driver_offers_to_matched {
                    let holds_pending = self
                        .store
                        .list_matches_for_request(request.id)
                        .await?
                        .iter()
                        .any(|m| m.driver_id == driver.id && m.status == MatchStatus::Pending);
                    if !holds_pending {
                        return Err(AppError::Unauthorized(
                            "Only drivers with a pending match can submit driver offers.".to_string(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    pub async fn submit_offer(
        &self,
        actor: &Actor,
        request_id: Uuid,
        role: OfferRole,
        amount: Decimal,
    ) -> AppResult<NegotiationOffer> {
        let request = self.find_request(request_id).await?;
        let cfg = self
            .pricing
            .get_pricing_config(&request.city, &request.vehicle_type)
            .await?;
        if !cfg.is_negotiated() {
            return Err(AppError::Validation(
                "Negotiation is disabled for this request.".to_string(),
            ));
        }
        if !request.is_open() {
            return Err(AppError::InvalidState(
                "Offers can only be made on open requests.".to_string(),
            ));
        }

        self.authorize_offer(actor, &request, role).await?;

        let band = sanity_band(request.distance_km);
        if !band.contains(amount) {
            log::warn!(
                "⚠️ Oferta {} sobre la solicitud {} fuera de [{}, {}]",
                amount,
                request.id,
                band.min,
                band.max
            );
            return Err(AppError::Validation(format!(
                "Offer must be between {} and {}.",
                band.min, band.max
            )));
        }

        let offer = NegotiationOffer::new(request.id, actor.user_id, role, round_money(amount));
        let saved = self.store.insert_offer(&offer).await?;
        log::info!(
            "💬 Oferta {:?} de {} sobre la solicitud {}",
            saved.role,
            saved.amount,
            saved.request_id
        );
        Ok(saved)
    }

    /// Ofertas de la solicitud, visibles para su cliente y sus conductores candidatos
    pub async fn list_offers_for_request(
        &self,
        actor: &Actor,
        request_id: Uuid,
    ) -> AppResult<Vec<NegotiationOffer>> {
        let request = self.find_request(request_id).await?;

        let visible = actor.is_admin()
            || request.customer_id == actor.user_id
            || match self.store.find_driver_by_user(actor.user_id).await? {
                Some(driver) if actor.is_driver() => self
                    .store
                    .list_matches_for_request(request.id)
                    .await?
                    .iter()
                    .any(|m| m.driver_id == driver.id),
                _ => false,
            };
        if !visible {
            return Err(not_found_error("Ride request", request_id));
        }

        self.store.list_offers_for_request(request_id).await
    }

    pub async fn list_my_offers(&self, actor: &Actor) -> AppResult<Vec<NegotiationOffer>> {
        self.store.list_offers_by_user(actor.user_id).await
    }
}
