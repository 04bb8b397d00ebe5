//! Motor de despacho y tarificación de viajes
//!
//! Cotiza viajes, selecciona conductores cercanos, orquesta la aceptación
//! de matches y lleva el ciclo de vida del viaje, con negociación de precio
//! opcional por ciudad/tipo de vehículo.

pub mod config;
pub mod controllers;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_app;
pub use state::AppState;
