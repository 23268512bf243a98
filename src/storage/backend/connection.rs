use std::str::FromStr;
use std::time::Duration;

use sea_orm::sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, SqlxSqliteConnector};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::errors::{GeotrailError, Result};
use migration::{Migrator, MigratorTrait};

fn operation_timeout(config: &DatabaseConfig) -> Duration {
    Duration::from_secs(config.timeout.max(1))
}

/// SQLite 连接池参数，池大小和获取超时取自配置
pub fn sqlite_pool_options(config: &DatabaseConfig) -> SqlitePoolOptions {
    SqlitePoolOptions::new()
        .max_connections(config.pool_size.max(1))
        .acquire_timeout(operation_timeout(config))
}

fn sqlite_connect_options(
    database_url: &str,
    config: &DatabaseConfig,
) -> Result<SqliteConnectOptions> {
    let opt = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| GeotrailError::database_config(format!("SQLite URL 解析失败: {}", e)))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        // 锁等待不超过单次操作超时，剩余时间留给重试
        .busy_timeout(operation_timeout(config).min(Duration::from_secs(5)))
        .pragma("cache_size", "-64000")
        .pragma("temp_store", "memory");
    Ok(opt)
}

/// 连接 SQLite 数据库（自动创建文件，WAL 模式）
pub async fn connect_sqlite(
    database_url: &str,
    config: &DatabaseConfig,
) -> Result<DatabaseConnection> {
    let opt = sqlite_connect_options(database_url, config)?;
    let pool_options = sqlite_pool_options(config);

    debug!(
        "SQLite pool: max_connections={}, acquire_timeout={:?}",
        pool_options.get_max_connections(),
        pool_options.get_acquire_timeout()
    );

    let pool = pool_options.connect_with(opt).await.map_err(|e| {
        GeotrailError::database_connection(format!("无法连接到 SQLite 数据库: {}", e))
    })?;

    Ok(SqlxSqliteConnector::from_sqlx_sqlite_pool(pool))
}

/// 连接通用数据库（MySQL/PostgreSQL）
pub async fn connect_generic(
    database_url: &str,
    backend_name: &str,
    config: &DatabaseConfig,
) -> Result<DatabaseConnection> {
    let pool_size = config.pool_size.max(1);
    let timeout = operation_timeout(config);

    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(pool_size)
        .min_connections(pool_size.min(5))
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(3600))
        .sqlx_logging(false);

    Database::connect(opt).await.map_err(|e| {
        GeotrailError::database_connection(format!(
            "无法连接到 {} 数据库: {}",
            backend_name.to_uppercase(),
            e
        ))
    })
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    Migrator::up(db, None)
        .await
        .map_err(|e| GeotrailError::store(format!("迁移失败: {}", e)))?;

    info!("Database migrations completed");
    Ok(())
}
