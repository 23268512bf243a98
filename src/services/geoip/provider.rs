//! GeoIP Provider 抽象层

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::external_api::ExternalApiProvider;
use crate::config::UpstreamConfig;
use crate::errors::Result;
use crate::storage::GeolocationRecord;

/// GeoIP 查询 trait
///
/// 实现方返回未打时间戳、未分配 `id` 的记录；失败时返回错误，而不是空结果。
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    /// 查询 IP 地址的地理位置
    async fn lookup(&self, ip: &str) -> Result<GeolocationRecord>;

    /// 获取 provider 名称（用于日志）
    fn name(&self) -> &'static str;
}

/// 统一 GeoIP Provider
#[derive(Clone)]
pub struct GeoIpProvider {
    inner: Arc<dyn GeoIpLookup>,
}

impl GeoIpProvider {
    /// 根据上游配置初始化外部 API provider
    pub fn new(config: &UpstreamConfig) -> Self {
        let inner: Arc<dyn GeoIpLookup> = Arc::new(ExternalApiProvider::new(config));
        info!(
            "GeoIP: Initialized with {} provider ({})",
            inner.name(),
            config.api_url
        );
        Self { inner }
    }

    /// 使用自定义实现（测试替身等）
    pub fn with_lookup(inner: Arc<dyn GeoIpLookup>) -> Self {
        Self { inner }
    }

    /// 查询 IP 地址的地理位置
    pub async fn lookup(&self, ip: &str) -> Result<GeolocationRecord> {
        self.inner.lookup(ip).await
    }

    /// 获取当前使用的 provider 名称
    pub fn provider_name(&self) -> &'static str {
        self.inner.name()
    }
}
