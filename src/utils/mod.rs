//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación,
//! dinero y geometría.

pub mod errors;
pub mod geo;
pub mod money;
pub mod validation;

pub use errors::{AppError, AppResult};
