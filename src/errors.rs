use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(Debug, Clone)]
pub enum GeotrailError {
    UpstreamUnavailable(String),
    UpstreamParse(String),
    UpstreamRejected(String),
    InvalidDateFormat(String),
    MissingParameter(String),
    Store(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
}

/// API 错误码
///
/// 按千位分域：
/// - 1000-1099: 请求参数错误
/// - 2000-2099: 上游服务错误
/// - 3000-3099: 存储错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    InvalidDateFormat = 1012,
    MissingParameter = 1013,

    UpstreamUnavailable = 2000,
    UpstreamParseError = 2001,
    UpstreamRejected = 2002,

    StoreError = 3000,
    DatabaseConfig = 3001,
    DatabaseConnection = 3002,
}

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: ErrorCode,
    pub error: &'static str,
    pub message: &'a str,
}

impl GeotrailError {
    /// 获取错误码
    pub fn code(&self) -> ErrorCode {
        match self {
            GeotrailError::UpstreamUnavailable(_) => ErrorCode::UpstreamUnavailable,
            GeotrailError::UpstreamParse(_) => ErrorCode::UpstreamParseError,
            GeotrailError::UpstreamRejected(_) => ErrorCode::UpstreamRejected,
            GeotrailError::InvalidDateFormat(_) => ErrorCode::InvalidDateFormat,
            GeotrailError::MissingParameter(_) => ErrorCode::MissingParameter,
            GeotrailError::Store(_) => ErrorCode::StoreError,
            GeotrailError::DatabaseConfig(_) => ErrorCode::DatabaseConfig,
            GeotrailError::DatabaseConnection(_) => ErrorCode::DatabaseConnection,
        }
    }

    /// Machine-readable error kind, returned in the `error` field of API responses
    pub fn kind(&self) -> &'static str {
        match self {
            GeotrailError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            GeotrailError::UpstreamParse(_) => "UpstreamParseError",
            GeotrailError::UpstreamRejected(_) => "UpstreamRejected",
            GeotrailError::InvalidDateFormat(_) => "InvalidDateFormat",
            GeotrailError::MissingParameter(_) => "MissingParameter",
            GeotrailError::Store(_) => "StoreError",
            GeotrailError::DatabaseConfig(_) => "DatabaseConfig",
            GeotrailError::DatabaseConnection(_) => "DatabaseConnection",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            GeotrailError::UpstreamUnavailable(_) => "Upstream Unavailable",
            GeotrailError::UpstreamParse(_) => "Upstream Parse Error",
            GeotrailError::UpstreamRejected(_) => "Upstream Rejected Lookup",
            GeotrailError::InvalidDateFormat(_) => "Invalid Date Format",
            GeotrailError::MissingParameter(_) => "Missing Parameter",
            GeotrailError::Store(_) => "Store Error",
            GeotrailError::DatabaseConfig(_) => "Database Configuration Error",
            GeotrailError::DatabaseConnection(_) => "Database Connection Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            GeotrailError::UpstreamUnavailable(msg) => msg,
            GeotrailError::UpstreamParse(msg) => msg,
            GeotrailError::UpstreamRejected(msg) => msg,
            GeotrailError::InvalidDateFormat(msg) => msg,
            GeotrailError::MissingParameter(msg) => msg,
            GeotrailError::Store(msg) => msg,
            GeotrailError::DatabaseConfig(msg) => msg,
            GeotrailError::DatabaseConnection(msg) => msg,
        }
    }

    /// 格式化为彩色输出（用于启动失败时的终端输出）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            (self.code() as i32).to_string().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for GeotrailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for GeotrailError {}

impl ResponseError for GeotrailError {
    fn status_code(&self) -> StatusCode {
        match self {
            GeotrailError::InvalidDateFormat(_) | GeotrailError::MissingParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            GeotrailError::UpstreamUnavailable(_) | GeotrailError::UpstreamParse(_) => {
                StatusCode::BAD_GATEWAY
            }
            GeotrailError::UpstreamRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            GeotrailError::Store(_)
            | GeotrailError::DatabaseConfig(_)
            | GeotrailError::DatabaseConnection(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            code: self.code(),
            error: self.kind(),
            message: self.message(),
        })
    }
}

// 便捷的构造函数
impl GeotrailError {
    pub fn upstream_unavailable<T: Into<String>>(msg: T) -> Self {
        GeotrailError::UpstreamUnavailable(msg.into())
    }

    pub fn upstream_parse<T: Into<String>>(msg: T) -> Self {
        GeotrailError::UpstreamParse(msg.into())
    }

    pub fn upstream_rejected<T: Into<String>>(msg: T) -> Self {
        GeotrailError::UpstreamRejected(msg.into())
    }

    pub fn invalid_date_format<T: Into<String>>(msg: T) -> Self {
        GeotrailError::InvalidDateFormat(msg.into())
    }

    pub fn missing_parameter<T: Into<String>>(msg: T) -> Self {
        GeotrailError::MissingParameter(msg.into())
    }

    pub fn store<T: Into<String>>(msg: T) -> Self {
        GeotrailError::Store(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        GeotrailError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        GeotrailError::DatabaseConnection(msg.into())
    }
}

impl From<sea_orm::DbErr> for GeotrailError {
    fn from(err: sea_orm::DbErr) -> Self {
        GeotrailError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for GeotrailError {
    fn from(err: serde_json::Error) -> Self {
        GeotrailError::UpstreamParse(err.to_string())
    }
}

impl From<chrono::ParseError> for GeotrailError {
    fn from(err: chrono::ParseError) -> Self {
        GeotrailError::InvalidDateFormat(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GeotrailError>;
