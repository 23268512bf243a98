use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 一次地理位置查询的结果
///
/// `id` is assigned by the store on save; `timestamp` is assigned by the
/// service right before the save and never taken from the upstream response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GeolocationRecord {
    #[serde(default)]
    pub id: Option<String>,
    /// The address as the upstream reports it, falling back to the requested
    /// string when the response has no `ip`.
    ///
    /// Upstream may normalise the address (IPv6 zero compression, letter
    /// case), so history is keyed by that form: a later per-IP history query
    /// must use the normalised spelling to find these records.
    pub ip: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub postal: Option<String>,
    #[serde(default)]
    pub latitude: Option<String>,
    #[serde(default)]
    pub longitude: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl GeolocationRecord {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            ..Default::default()
        }
    }

    /// 设置采集时间
    pub fn stamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageConfig {
    pub storage_type: String,
}
