pub mod backoff;
pub mod time_parser;

pub use backoff::calculate_backoff;
pub use time_parser::TimeParser;
