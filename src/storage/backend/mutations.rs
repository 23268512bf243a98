//! Write operations for SeaOrmStorage
//!
//! History is append-only: records are inserted once and never updated or deleted.

use sea_orm::EntityTrait;
use tracing::info;
use uuid::Uuid;

use super::SeaOrmStorage;
use super::converters::record_to_active_model;
use super::retry;
use crate::errors::{GeotrailError, Result};
use crate::storage::GeolocationRecord;

use migration::entities::geolocation;

impl SeaOrmStorage {
    /// 插入一条新记录，返回带 store 分配 `id` 的记录
    ///
    /// 记录必须已设置 `timestamp`；传入的 `id` 会被忽略。
    pub async fn save(&self, record: GeolocationRecord) -> Result<GeolocationRecord> {
        let Some(timestamp) = record.timestamp else {
            return Err(GeotrailError::store(format!(
                "记录缺少 timestamp，拒绝写入: {}",
                record.ip
            )));
        };

        let db = &self.db;
        let id = Uuid::new_v4().to_string();

        retry::with_retry(
            &format!("save({})", record.ip),
            self.retry_policy,
            || async {
                geolocation::Entity::insert(record_to_active_model(&record, &id, timestamp))
                    .exec(db)
                    .await
            },
        )
        .await
        .map_err(|e| {
            GeotrailError::store(format!("保存地理位置记录失败 ({}): {}", record.ip, e))
        })?;

        info!("Geolocation record saved: ip={}, id={}", record.ip, id);

        Ok(GeolocationRecord {
            id: Some(id),
            ..record
        })
    }
}
