//! Utilidades geográficas
//!
//! Distancia en línea recta (haversine) y estimación grosera de tiempo de viaje.
//! No es un motor de rutas: no hay red de carreteras.

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Punto lat/lng en grados
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct GeoPoint {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Distancia great-circle en km
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lng1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lng2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Minutes to cover `distance_km` at `avg_speed_kmh`, rounded to the nearest
/// minute with a floor of 1 for any positive distance.
pub fn eta_minutes(distance_km: f64, avg_speed_kmh: f64) -> i32 {
    if avg_speed_kmh <= 0.0 || distance_km <= 0.0 {
        return 0;
    }
    let minutes = (distance_km / avg_speed_kmh) * 60.0;
    (minutes.round() as i32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// km por grado de latitud sobre un meridiano
    const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

    #[test]
    fn test_distance_zero() {
        let p = GeoPoint::new(6.5244, 3.3792);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn test_distance_along_meridian() {
        let a = GeoPoint::new(6.5, 3.4);
        let b = GeoPoint::new(6.5 + 5.0 / KM_PER_DEGREE, 3.4);
        assert!((distance_km(a, b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let lagos = GeoPoint::new(6.5244, 3.3792);
        let abuja = GeoPoint::new(9.0765, 7.3986);
        let d1 = distance_km(lagos, abuja);
        let d2 = distance_km(abuja, lagos);
        assert!((d1 - d2).abs() < 1e-9);
        // ~525 km en línea recta
        assert!(d1 > 520.0 && d1 < 530.0, "got {}", d1);
    }

    #[test]
    fn test_eta_minutes() {
        assert_eq!(eta_minutes(12.0, 24.0), 30);
        assert_eq!(eta_minutes(0.1, 24.0), 1);
        assert_eq!(eta_minutes(5.0, 0.0), 0);
        assert_eq!(eta_minutes(5.0, -3.0), 0);
        assert_eq!(eta_minutes(0.0, 24.0), 0);
        // 11 km a 22 km/h = 30 min
        assert_eq!(eta_minutes(11.0, 22.0), 30);
    }
}
