//! System-level setup shared by all entry points

pub mod logging;

pub use logging::init_logging;
