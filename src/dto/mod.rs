//! DTOs de la API
//!
//! Cuerpos de request/response; la validación de campos usa `validator`.

pub mod api_response;
pub mod pricing_dto;
pub mod ride_dto;

pub use api_response::ApiResponse;
