//! Modelos del sistema
//!
//! Entidades del motor de despacho. Los campos de estado los posee el motor;
//! la durabilidad es cosa del store.

pub mod actor;
pub mod driver;
pub mod negotiation;
pub mod pricing;
pub mod ride;
pub mod ride_match;
pub mod ride_request;

pub use actor::{Actor, ActorRole};
pub use driver::Driver;
pub use negotiation::{NegotiationOffer, OfferRole};
pub use pricing::{PricingConfig, PricingMode};
pub use ride::{Ride, RideStatus};
pub use ride_match::{Match, MatchStatus};
pub use ride_request::{NewRideRequest, PaymentMethod, RideRequest, RideRequestStatus};
