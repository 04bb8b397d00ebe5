//! Configuración del proyecto
//!
//! Este módulo contiene la configuración de base de datos, variables de entorno
//! y los parámetros del motor de despacho.

pub mod database;
pub mod dispatch;
pub mod environment;

pub use database::DatabaseConfig;
pub use dispatch::DispatchConfig;
pub use environment::*;
