pub mod geolocation;
pub mod health;

pub use geolocation::{GeolocationHandlers, geolocation_routes};
pub use health::{AppStartTime, HealthService, health_routes};
