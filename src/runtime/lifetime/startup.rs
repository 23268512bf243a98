use crate::config::get_config;
use crate::services::{GeoIpProvider, GeolocationService};
use crate::storage::{SeaOrmStorage, StorageFactory};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info};

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub geoip: GeoIpProvider,
    pub geolocation_service: Arc<GeolocationService>,
}

/// 准备服务器启动的上下文
/// 包括存储、上游 provider 和业务 service
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    // 可能已由其他组件安装，忽略重复安装
    let _ = rustls::crypto::ring::default_provider().install_default();

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!(
        "Using storage backend: {}",
        storage.get_backend_config().await.storage_type
    );

    let config = get_config();
    let geoip = GeoIpProvider::new(&config.upstream);

    let geolocation_service = Arc::new(GeolocationService::new(
        storage.clone(),
        geoip.clone(),
        config.history.clone(),
    ));
    debug!(
        "GeolocationService initialized (date_format={}, page_index={})",
        config.history.date_format, config.history.page_index
    );

    info!("Pre-startup completed in {:?}", start_time.elapsed());

    Ok(StartupContext {
        storage,
        geoip,
        geolocation_service,
    })
}
