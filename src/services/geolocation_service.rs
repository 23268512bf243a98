//! Geolocation service
//!
//! Resolves an IP through the upstream provider, stamps and persists the
//! result, and answers history queries over the stored records.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::HistoryConfig;
use crate::errors::{GeotrailError, Result};
use crate::services::GeoIpProvider;
use crate::storage::{GeolocationRecord, PageRequest, SeaOrmStorage};
use crate::utils::TimeParser;

/// 页大小上限
pub const MAX_PAGE_SIZE: u64 = u32::MAX as u64;

/// 解析页大小参数 `n`
///
/// 缺失或空白返回 `Ok(None)`；提供了但不在 `1..=MAX_PAGE_SIZE` 内时返回 `MissingParameter`。
pub fn parse_page_size(n: Option<&str>) -> Result<Option<u64>> {
    let Some(raw) = n.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<u64>() {
        Ok(size) if (1..=MAX_PAGE_SIZE).contains(&size) => Ok(Some(size)),
        _ => Err(GeotrailError::missing_parameter(format!(
            "query parameter 'n' must be an integer between 1 and {}, got '{}'",
            MAX_PAGE_SIZE, raw
        ))),
    }
}

/// Geolocation lookup and history service
#[derive(Clone)]
pub struct GeolocationService {
    storage: Arc<SeaOrmStorage>,
    geoip: GeoIpProvider,
    history: HistoryConfig,
}

impl GeolocationService {
    pub fn new(storage: Arc<SeaOrmStorage>, geoip: GeoIpProvider, history: HistoryConfig) -> Self {
        Self {
            storage,
            geoip,
            history,
        }
    }

    /// 查询上游、打时间戳并保存
    ///
    /// 上游失败时直接返回错误，不写入任何记录。
    pub async fn lookup_and_record(&self, ip: &str) -> Result<GeolocationRecord> {
        let record = self.geoip.lookup(ip).await?.stamp(Utc::now());
        let saved = self.storage.save(record).await?;

        info!(
            "Recorded geolocation for {} via {} (id={})",
            ip,
            self.geoip.provider_name(),
            saved.id.as_deref().unwrap_or("-")
        );
        Ok(saved)
    }

    /// 某个 IP 的历史记录
    ///
    /// `start` / `end` 任一为空时返回全部记录，否则只返回两端日期（含）之间的记录。
    pub async fn history_for_ip(
        &self,
        ip: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<GeolocationRecord>> {
        match TimeParser::parse_day_range(start, end, &self.history.date_format)? {
            Some(range) => {
                debug!(
                    "History for {} between {} and {}",
                    ip, range.start, range.end
                );
                self.storage
                    .find_by_ip_and_timestamp_between(ip, &range)
                    .await
            }
            None => self.storage.find_by_ip(ip).await,
        }
    }

    /// 全局历史
    ///
    /// - 无日期：每个 IP 的最新一条，按时间降序分页，`n` 必填
    /// - 有日期：区间内所有记录，按时间降序；`n` 缺省时不分页
    ///
    /// 页码取自 `history.page_index`。
    pub async fn latest_history(
        &self,
        start: Option<&str>,
        end: Option<&str>,
        n: Option<&str>,
    ) -> Result<Vec<GeolocationRecord>> {
        let range = TimeParser::parse_day_range(start, end, &self.history.date_format)?;
        let size = parse_page_size(n)?;
        let page_index = self.history.page_index;

        match range {
            Some(range) => {
                let page = size.map(|size| PageRequest::of(page_index, size));
                self.storage.find_by_timestamp_between(&range, page).await
            }
            None => {
                let size = size.ok_or_else(|| {
                    GeotrailError::missing_parameter(
                        "query parameter 'n' is required when no date range is given",
                    )
                })?;

                debug!("Latest history page {} (size {})", page_index, size);
                self.storage
                    .find_latest_per_ip(Some(PageRequest::of(page_index, size)))
                    .await
            }
        }
    }
}
