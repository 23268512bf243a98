//! GeoIP 服务模块
//!
//! 通过外部 HTTP API（默认 ipapi.co）查询 IP 地址的地理位置。

mod external_api;
mod provider;

pub use external_api::ExternalApiProvider;
pub use provider::{GeoIpLookup, GeoIpProvider};
