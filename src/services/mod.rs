//! Service layer for business logic
//!
//! Lookup-and-record and history queries, independent of the HTTP layer.

pub mod geoip;
mod geolocation_service;

pub use geoip::{ExternalApiProvider, GeoIpLookup, GeoIpProvider};
pub use geolocation_service::*;
