//! Postal code resolution.
//!
//! Turns a postal code into coordinates, an authoritative county and a raw
//! locality guess, falling back to a bundled coarse table when the geocoding
//! collaborator is unavailable or returns placeholder data.

pub mod providers;
pub mod resolver;
pub mod types;

pub use providers::{builtin_lookup, Geocoder, NominatimGeocoder};
pub use resolver::GeoResolver;
pub use types::{GeoSource, GeocodeHit, PostalCode, PostalLocation};
