//! 存储操作的超时与重试
//!
//! 每次尝试有独立超时。只有连接类失败和锁竞争会重试，
//! 约束冲突、记录缺失等确定性错误立即返回。

use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::utils::calculate_backoff;

/// 锁竞争对应的数据库错误码
///
/// SQLite BUSY / LOCKED / BUSY_SNAPSHOT，MySQL 死锁 / 锁等待超时，
/// PostgreSQL 序列化失败 / 死锁
const LOCK_CONTENTION_CODES: &[&str] = &["5", "6", "517", "1213", "1205", "40001", "40P01"];

const LOCK_CONTENTION_MESSAGES: &[&str] = &[
    "database is locked",
    "database table is locked",
    "deadlock",
    "lock wait timeout",
    "could not serialize access",
];

/// 瞬时失败的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientFailure {
    /// 连接池获取失败或连接断开
    Connection,
    /// 锁竞争，稍后重试通常可以成功
    LockContention,
}

/// 判断失败是否为瞬时失败，`None` 表示不应重试
pub fn classify(err: &DbErr) -> Option<TransientFailure> {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => Some(TransientFailure::Connection),
        DbErr::Exec(runtime) | DbErr::Query(runtime) => {
            is_lock_contention(runtime).then_some(TransientFailure::LockContention)
        }
        _ => None,
    }
}

fn is_lock_contention(err: &RuntimeErr) -> bool {
    let message = match err {
        RuntimeErr::SqlxError(sqlx_err) => {
            let code = sqlx_err
                .as_database_error()
                .and_then(|db_err| db_err.code().map(|c| c.into_owned()));
            if let Some(code) = code {
                return LOCK_CONTENTION_CODES.contains(&code.as_str());
            }
            sqlx_err.to_string()
        }
        RuntimeErr::Internal(msg) => msg.clone(),
        #[allow(unreachable_patterns)]
        _ => return false,
    };

    let message = message.to_lowercase();
    LOCK_CONTENTION_MESSAGES.iter().any(|m| message.contains(m))
}

/// 存储操作的重试策略
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// 单次尝试的超时
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
            attempt_timeout: Duration::from_secs(config.timeout.max(1)),
        }
    }
}

/// 在策略下执行一次存储操作
///
/// 超时视为瞬时失败；重试耗尽后超时以 `DbErr::Custom` 返回。
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut attempt = 0;
    loop {
        let failure = match tokio::time::timeout(policy.attempt_timeout, operation()).await {
            Ok(Ok(value)) => {
                if attempt > 0 {
                    debug!("'{}' succeeded after {} retries", operation_name, attempt);
                }
                return Ok(value);
            }
            Ok(Err(e)) => match classify(&e) {
                Some(kind) if attempt < policy.max_retries => format!("{:?}: {}", kind, e),
                _ => return Err(e),
            },
            Err(_) if attempt < policy.max_retries => {
                format!("timed out after {:?}", policy.attempt_timeout)
            }
            Err(_) => {
                warn!(
                    "'{}' timed out after {:?}, retries exhausted",
                    operation_name, policy.attempt_timeout
                );
                return Err(DbErr::Custom(format!(
                    "'{}' timed out after {:?}",
                    operation_name, policy.attempt_timeout
                )));
            }
        };

        attempt += 1;
        let delay = calculate_backoff(attempt, policy.base_delay_ms, policy.max_delay_ms);
        warn!(
            "'{}' failed (attempt {}/{}), {}; retrying in {}ms",
            operation_name,
            attempt,
            policy.max_retries + 1,
            failure,
            delay
        );
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
}
