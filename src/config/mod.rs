pub mod args;
mod r#impl;
mod structs;

pub use args::Args;
pub use r#impl::{get_config, init_config, init_config_from};
pub use structs::*;
