//! Controladores
//!
//! Puente entre los DTOs y los servicios; envuelven el resultado en `ApiResponse`.

pub mod driver_controller;
pub mod match_controller;
pub mod pricing_config_controller;
pub mod ride_controller;
pub mod ride_request_controller;
