use crate::storage::GeolocationRecord;
use chrono::{DateTime, Utc};
use migration::entities::geolocation;

/// 将 Sea-ORM Model 转换为 GeolocationRecord
pub fn model_to_record(model: geolocation::Model) -> GeolocationRecord {
    GeolocationRecord {
        id: Some(model.id),
        ip: model.ip,
        city: model.city,
        region: model.region,
        country_name: model.country_name,
        postal: model.postal,
        latitude: model.latitude,
        longitude: model.longitude,
        timezone: model.timezone,
        timestamp: Some(model.timestamp),
    }
}

/// 将 GeolocationRecord 转换为用于插入的 ActiveModel
///
/// `id` 与 `timestamp` 由调用方提供，记录自身的值被忽略
pub fn record_to_active_model(
    record: &GeolocationRecord,
    id: &str,
    timestamp: DateTime<Utc>,
) -> geolocation::ActiveModel {
    use sea_orm::ActiveValue::*;

    geolocation::ActiveModel {
        id: Set(id.to_string()),
        ip: Set(record.ip.clone()),
        city: Set(record.city.clone()),
        region: Set(record.region.clone()),
        country_name: Set(record.country_name.clone()),
        postal: Set(record.postal.clone()),
        latitude: Set(record.latitude.clone()),
        longitude: Set(record.longitude.clone()),
        timezone: Set(record.timezone.clone()),
        timestamp: Set(timestamp),
    }
}
