//! SeaORM storage backend
//!
//! This module provides the geolocation history store on top of SeaORM,
//! supporting SQLite, MySQL/MariaDB, and PostgreSQL.

mod connection;
mod converters;
mod mutations;
mod query;
pub mod retry;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::config::DatabaseConfig;
use crate::errors::{GeotrailError, Result};
use crate::storage::models::StorageConfig;
use retry::RetryPolicy;

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use converters::{model_to_record, record_to_active_model};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite://")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(GeotrailError::database_config(format!(
            "无法从 URL 推断数据库类型: {}. 支持的 URL 格式: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// 半开时间区间 `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimestampRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimestampRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// 分页参数，`page` 从 0 开始
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub size: u64,
}

impl PageRequest {
    pub fn of(page: u64, size: u64) -> Self {
        Self { page, size }
    }

    /// 跳过的行数
    ///
    /// `LIMIT` / `OFFSET` 以 i64 绑定，任一超出范围时返回 None
    pub fn offset(&self) -> Option<u64> {
        const SQL_MAX: u64 = i64::MAX as u64;
        if self.size > SQL_MAX {
            return None;
        }
        self.page
            .checked_mul(self.size)
            .filter(|offset| *offset <= SQL_MAX)
    }
}

/// SeaORM-based geolocation store
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    retry_policy: RetryPolicy,
}

impl SeaOrmStorage {
    /// 使用全局配置中的 `[database]` 段
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        let config = crate::config::get_config();
        Self::with_config(database_url, backend_name, &config.database).await
    }

    pub async fn with_config(
        database_url: &str,
        backend_name: &str,
        database: &DatabaseConfig,
    ) -> Result<Self> {
        if database_url.is_empty() {
            return Err(GeotrailError::database_config(
                "database_url 未设置".to_string(),
            ));
        }

        // 根据不同数据库类型配置连接选项
        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url, database).await?
        } else {
            connect_generic(database_url, backend_name, database).await?
        };

        let storage = SeaOrmStorage {
            db,
            backend_name: backend_name.to_string(),
            retry_policy: RetryPolicy::from_config(database),
        };

        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    pub async fn get_backend_config(&self) -> StorageConfig {
        StorageConfig {
            storage_type: self.backend_name.clone(),
        }
    }

    /// 获取数据库连接（关闭连接池等需要直接访问数据库的场景）
    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
