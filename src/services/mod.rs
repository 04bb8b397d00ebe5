//! Services module
//!
//! Lógica de negocio del motor de despacho. Los servicios reciben el
//! `DispatchStore` compartido y nunca hablan HTTP.

pub mod candidate_service;
pub mod driver_service;
pub mod expiry_service;
pub mod jwt_service;
pub mod match_service;
pub mod negotiation_service;
pub mod pricing_service;
pub mod request_service;
pub mod ride_lifecycle_service;

pub use candidate_service::{find_nearby_drivers, CandidateService, DriverCandidate};
pub use expiry_service::ExpiryService;
pub use match_service::MatchService;
pub use negotiation_service::NegotiationService;
pub use pricing_service::PricingService;
pub use request_service::RequestService;
pub use ride_lifecycle_service::RideLifecycleService;
