//! # fleetpulse-geo
//!
//! The two geocoding operations the availability search depends on:
//! resolving a free-text address to coordinates, and the great-circle
//! distance between two points.

pub mod distance;
pub mod nominatim;
pub mod provider;
pub mod retry;

pub use distance::haversine_km;
pub use nominatim::NominatimGeocoder;
pub use provider::GeocodingProvider;
pub use retry::RetryingGeocoder;
