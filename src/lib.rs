//! geotrail - IP geolocation lookup service with queryable history
//!
//! Resolves IP addresses through an upstream geolocation API, stores every
//! lookup with a server-side timestamp, and serves history queries over HTTP.
//!
//! # Architecture
//! - `storage`: geolocation records and the SeaORM-backed store
//! - `services`: upstream GeoIP client and the lookup/history service
//! - `api`: HTTP handlers and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and the server mode
//! - `system`: Logging setup

pub mod api;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
