//! Utilidades de dinero
//!
//! Todo importe se redondea half-up a 2 decimales sobre `Decimal`,
//! nunca sobre punto flotante.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

/// Redondeo half-up (lejos de cero en el punto medio) a 2 decimales
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Convierte una magnitud calculada en f64 (p.ej. distancia) a Decimal de 2 decimales
pub fn decimal_2dp(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(round_money)
        .unwrap_or(Decimal::ZERO)
}

pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
