use chrono::{DateTime, Days, NaiveDate, Utc};

use crate::errors::{GeotrailError, Result};
use crate::storage::TimestampRange;

/// 日期 / 时间解析工具
pub struct TimeParser;

impl TimeParser {
    /// 按给定 chrono 格式解析日历日期（如 `%m.%d.%Y` → `03.14.2024`）
    pub fn parse_day(input: &str, format: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(input.trim(), format).map_err(|e| {
            GeotrailError::invalid_date_format(format!(
                "'{}' does not match date format '{}': {}",
                input, format, e
            ))
        })
    }

    /// 解析 `start` / `end` 查询参数为时间范围
    ///
    /// 任一参数为空（缺失或仅空白）时返回 `Ok(None)`，表示不做时间过滤。
    /// 两个日期都包含在内：`[start 00:00:00, end + 1 day 00:00:00)`，UTC。
    pub fn parse_day_range(
        start: Option<&str>,
        end: Option<&str>,
        format: &str,
    ) -> Result<Option<TimestampRange>> {
        let (Some(start), Some(end)) = (non_blank(start), non_blank(end)) else {
            return Ok(None);
        };

        let start_day = Self::parse_day(start, format)?;
        let end_day = Self::parse_day(end, format)?;

        let end_exclusive = end_day.checked_add_days(Days::new(1)).ok_or_else(|| {
            GeotrailError::invalid_date_format(format!("'{}' is out of range", end))
        })?;

        Ok(Some(TimestampRange {
            start: start_of_day(start_day),
            end: start_of_day(end_exclusive),
        }))
    }

    /// 格式化持续时间为人类可读的字符串
    pub fn format_duration_human(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
        let duration = to.signed_duration_since(from);

        if duration.num_seconds() < 0 {
            return "0s".to_string();
        }

        let days = duration.num_days();
        let hours = (duration.num_seconds() % 86400) / 3600;
        let minutes = (duration.num_seconds() % 3600) / 60;

        if days > 0 {
            if hours > 0 {
                format!("{}d {}h", days, hours)
            } else {
                format!("{}d", days)
            }
        } else if hours > 0 {
            if minutes > 0 {
                format!("{}h {}m", hours, minutes)
            } else {
                format!("{}h", hours)
            }
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            format!("{}s", duration.num_seconds())
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}
