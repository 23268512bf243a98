//! Server mode
//!
//! This module contains the HTTP server startup logic.

use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::warn;

use crate::api::middleware::{RequestIdMiddleware, TimingMiddleware};
use crate::api::services::{AppStartTime, geolocation_routes, health_routes};
use crate::runtime::lifetime;

/// Run the HTTP server
///
/// This function:
/// 1. Records startup time
/// 2. Prepares server components (storage, upstream provider, service)
/// 3. Configures and starts the HTTP server
/// 4. Listens for graceful shutdown signals
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let startup = lifetime::startup::prepare_server_startup()
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;

    let storage = startup.storage.clone();
    let geolocation_service = startup.geolocation_service.clone();
    warn!("GeoIP provider: {}", startup.geoip.provider_name());

    let config = crate::config::get_config();
    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    // storage 移入闭包前先取出连接，用于关闭
    let db_for_shutdown = storage.get_db().clone();

    let server = HttpServer::new(move || {
        // 最后注册的 wrap 在最外层：RequestId > Timing > DefaultHeaders > Compress
        App::new()
            .app_data(web::Data::new(storage.clone()))
            .app_data(web::Data::new(geolocation_service.clone()))
            .app_data(web::Data::new(app_start_time.clone()))
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add((
                "Cache-Control",
                "no-cache, no-store, must-revalidate",
            )))
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware)
            .service(health_routes())
            .service(geolocation_routes())
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            warn!("Graceful shutdown completed");
        }
    }

    Ok(())
}
