//! 外部 GeoIP API 实现
//!
//! 使用外部 HTTP API 进行 IP 地理位置查询（默认 ipapi.co）。
//! 瞬时失败（连接错误、超时、429、5xx）按配置做有限次重试。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace, warn};
use ureq::Agent;

use super::provider::GeoIpLookup;
use crate::config::UpstreamConfig;
use crate::errors::{GeotrailError, Result};
use crate::storage::GeolocationRecord;
use crate::utils::calculate_backoff;

/// 重试退避上限
const RETRY_MAX_DELAY_MS: u64 = 2000;

/// 外部 API GeoIP Provider
pub struct ExternalApiProvider {
    /// ureq 的 Agent 是 Send + Sync，内部共享连接池
    agent: Agent,
    api_url_template: String,
    user_agent: String,
    retry_count: u32,
    retry_base_delay_ms: u64,
}

impl ExternalApiProvider {
    /// 创建外部 API Provider
    ///
    /// `api_url` 使用 `{ip}` 作为占位符，例如 `https://ipapi.co/{ip}/json/`
    pub fn new(config: &UpstreamConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs.max(1))))
            .build()
            .into();

        Self {
            agent,
            api_url_template: config.api_url.clone(),
            user_agent: config.user_agent.clone(),
            retry_count: config.retry_count,
            retry_base_delay_ms: config.retry_base_delay_ms,
        }
    }

    /// 用 IP 填充 URL 模板
    pub fn build_url(&self, ip: &str) -> String {
        self.api_url_template.replace("{ip}", &urlencoding::encode(ip))
    }

    /// 发起一次 GET 并读取完整响应体（同步，在 spawn_blocking 中调用）
    fn fetch_body_sync(
        agent: &Agent,
        url: &str,
        user_agent: &str,
    ) -> std::result::Result<String, ureq::Error> {
        agent
            .get(url)
            .header("User-Agent", user_agent)
            .call()?
            .into_body()
            .read_to_string()
    }

    /// 带重试的异步包装
    async fn fetch_body(&self, ip: &str) -> Result<String> {
        let url = self.build_url(ip);
        let mut attempt = 0;

        loop {
            let agent = self.agent.clone();
            let request_url = url.clone();
            let user_agent = self.user_agent.clone();

            // 使用 spawn_blocking 在线程池中执行同步 HTTP 请求
            let outcome = tokio::task::spawn_blocking(move || {
                Self::fetch_body_sync(&agent, &request_url, &user_agent)
            })
            .await
            .map_err(|e| {
                GeotrailError::upstream_unavailable(format!("GeoIP request task failed: {}", e))
            })?;

            match outcome {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.retry_count && is_transient(&e) => {
                    let delay =
                        calculate_backoff(attempt, self.retry_base_delay_ms, RETRY_MAX_DELAY_MS);
                    warn!(
                        "GeoIP API request to \"{}\" failed (attempt {}/{}): {}, retrying in {}ms",
                        url,
                        attempt + 1,
                        self.retry_count + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("GeoIP API request to \"{}\" failed: {}", url, e);
                    return Err(GeotrailError::upstream_unavailable(describe_failure(&e)));
                }
            }
        }
    }
}

/// 连接错误、超时、429 与 5xx 视为瞬时失败
fn is_transient(err: &ureq::Error) -> bool {
    match err {
        ureq::Error::StatusCode(code) => *code == 429 || *code >= 500,
        ureq::Error::Timeout(_)
        | ureq::Error::Io(_)
        | ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound => true,
        _ => false,
    }
}

fn describe_failure(err: &ureq::Error) -> String {
    match err {
        ureq::Error::StatusCode(code) => format!("upstream responded with HTTP {}", code),
        ureq::Error::Timeout(_) => "upstream request timed out".to_string(),
        other => format!("upstream request failed: {}", other),
    }
}

/// 字段值统一转为文本：字符串原样保留，数字/布尔转为其文本形式，null 视为缺失
fn text_field(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 解析上游响应体
///
/// ipapi.co 对保留地址等情况返回 HTTP 200 + `{"error": true, "reason": ...}`。
/// 上游的 `timestamp` 字段（如有）被忽略。
pub(crate) fn parse_response(requested_ip: &str, body: &str) -> Result<GeolocationRecord> {
    let json: Value = serde_json::from_str(body)?;

    if !json.is_object() {
        return Err(GeotrailError::upstream_parse(format!(
            "expected a JSON object from upstream, got: {}",
            body.chars().take(64).collect::<String>()
        )));
    }

    if json.get("error").and_then(Value::as_bool) == Some(true) {
        let reason = text_field(&json, "reason").unwrap_or_else(|| "unknown reason".to_string());
        return Err(GeotrailError::upstream_rejected(format!(
            "upstream rejected lookup for {}: {}",
            requested_ip, reason
        )));
    }

    let record = GeolocationRecord {
        id: None,
        ip: text_field(&json, "ip").unwrap_or_else(|| requested_ip.to_string()),
        city: text_field(&json, "city"),
        region: text_field(&json, "region"),
        country_name: text_field(&json, "country_name"),
        postal: text_field(&json, "postal"),
        latitude: text_field(&json, "latitude"),
        longitude: text_field(&json, "longitude"),
        timezone: text_field(&json, "timezone"),
        timestamp: None,
    };

    trace!(
        "External API lookup: ip={}, city={:?}, country={:?}",
        record.ip, record.city, record.country_name
    );

    Ok(record)
}

#[async_trait]
impl GeoIpLookup for ExternalApiProvider {
    async fn lookup(&self, ip: &str) -> Result<GeolocationRecord> {
        debug!("GeoIP lookup for {}", ip);
        let body = self.fetch_body(ip).await?;
        parse_response(ip, &body)
    }

    fn name(&self) -> &'static str {
        "ExternalAPI"
    }
}
