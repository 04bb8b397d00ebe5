//! Modelo de NegotiationOffer
//!
//! Ofertas append-only de pasajero o conductor sobre una solicitud en modo
//! negociado. La oferta "actual" es siempre la más reciente.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "offer_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferRole {
    Rider,
    Driver,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct NegotiationOffer {
    pub id: Uuid,
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub role: OfferRole,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl NegotiationOffer {
    pub fn new(request_id: Uuid, user_id: Uuid, role: OfferRole, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            user_id,
            role,
            amount,
            created_at: Utc::now(),
        }
    }
}
