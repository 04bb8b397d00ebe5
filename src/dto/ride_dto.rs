use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{NewRideRequest, OfferRole, PaymentMethod, RideRequest};
use crate::services::pricing_service::Quote;
use crate::utils::geo::GeoPoint;
use crate::utils::validation::{validate_non_negative, validate_not_empty};

fn default_city() -> String {
    "Lagos".to_string()
}

fn default_vehicle_type() -> String {
    "Standard".to_string()
}

// Request para crear una solicitud de viaje
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRideRequestRequest {
    #[serde(default)]
    pub pickup_address: String,
    #[serde(default)]
    pub dropoff_address: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub pickup_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub pickup_lng: f64,
    #[validate(range(min = -90.0, max = 90.0))]
    pub dropoff_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub dropoff_lng: f64,
    pub payment_method: PaymentMethod,
    #[serde(default = "default_city")]
    #[validate(custom = "validate_not_empty")]
    pub city: String,
    #[serde(default = "default_vehicle_type")]
    #[validate(custom = "validate_not_empty")]
    pub vehicle_type: String,
}

impl CreateRideRequestRequest {
    pub fn into_new_request(self, customer_id: Uuid) -> NewRideRequest {
        NewRideRequest {
            customer_id,
            pickup_address: self.pickup_address,
            dropoff_address: self.dropoff_address,
            pickup: GeoPoint::new(self.pickup_lat, self.pickup_lng),
            dropoff: GeoPoint::new(self.dropoff_lat, self.dropoff_lng),
            payment_method: self.payment_method,
            city: self.city.trim().to_string(),
            vehicle_type: self.vehicle_type.trim().to_string(),
        }
    }
}

// Response de creación: la solicitud con sus estimaciones y el número de candidatos
#[derive(Debug, Serialize)]
pub struct CreatedRideRequestResponse {
    #[serde(flatten)]
    pub request: RideRequest,
    pub candidates: usize,
}

// Request de cotización (no persiste nada)
#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub pickup_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub pickup_lng: f64,
    #[validate(range(min = -90.0, max = 90.0))]
    pub dropoff_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub dropoff_lng: f64,
    #[serde(default = "default_city")]
    #[validate(custom = "validate_not_empty")]
    pub city: String,
    #[serde(default = "default_vehicle_type")]
    #[validate(custom = "validate_not_empty")]
    pub vehicle_type: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub quote: Quote,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// Request para cerrar un viaje
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompleteRideRequest {
    #[validate(custom = "validate_non_negative")]
    pub amount_total: Option<Decimal>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub end_lat: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub end_lng: Option<f64>,
    pub end_address: Option<String>,
}

// Request de oferta en modo negociado
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitOfferRequest {
    pub role: OfferRole,
    #[validate(custom = "validate_non_negative")]
    pub amount: Decimal,
}

// Posición actual del conductor
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
    pub vehicle_id: Option<Uuid>,
}
