use clap::Parser;

use geotrail::config::{Args, StaticConfig, get_config, init_config_from};
use geotrail::errors::GeotrailError;
use geotrail::runtime::modes::run_server;
use geotrail::system::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.generate_config {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    }

    dotenvy::dotenv().ok();

    init_config_from(&args.config);
    let config = get_config();

    // guard 必须存活到进程结束，否则日志不会被刷新
    let _guard = init_logging(&config);

    if let Err(e) = run_server().await {
        match e.downcast_ref::<GeotrailError>() {
            Some(err) => eprintln!("{}", err.format_colored()),
            None => eprintln!("{:?}", e),
        }
        std::process::exit(1);
    }

    Ok(())
}
