pub mod geolocation;

pub use geolocation::Entity as GeolocationEntity;
