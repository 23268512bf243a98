//! Command-line arguments

use clap::Parser;

use super::structs::DEFAULT_CONFIG_PATH;

/// geotrail - IP geolocation lookup service with queryable history
#[derive(Parser, Debug)]
#[command(name = "geotrail")]
#[command(version)]
#[command(about = "IP geolocation lookup service with queryable history", long_about = None)]
pub struct Args {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Print a sample configuration file and exit
    #[arg(long)]
    pub generate_config: bool,
}
