use std::sync::Arc;

use actix_web::error::QueryPayloadError;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;
use tracing::{error, trace, warn};

use crate::errors::GeotrailError;
use crate::services::GeolocationService;

/// `start` / `end` 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// 全局历史查询参数；`n` 保留原始字符串，由 service 校验
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub n: Option<String>,
}

pub struct GeolocationHandlers;

impl GeolocationHandlers {
    /// `GET /geolocation/{ip}`
    pub async fn lookup(
        path: web::Path<String>,
        service: web::Data<Arc<GeolocationService>>,
    ) -> Result<HttpResponse, GeotrailError> {
        let ip = path.into_inner();
        trace!("Geolocation lookup request for {}", ip);

        let record = service.lookup_and_record(&ip).await.inspect_err(|e| {
            error!("Geolocation lookup for {} failed: {}", ip, e);
        })?;

        Ok(HttpResponse::Ok().json(vec![record]))
    }

    /// `GET /geolocation/{ip}/history?start&end`
    pub async fn history_for_ip(
        path: web::Path<String>,
        query: web::Query<DateRangeQuery>,
        service: web::Data<Arc<GeolocationService>>,
    ) -> Result<HttpResponse, GeotrailError> {
        let ip = path.into_inner();
        let records = service
            .history_for_ip(&ip, query.start.as_deref(), query.end.as_deref())
            .await?;

        trace!("History for {}: {} records", ip, records.len());
        Ok(HttpResponse::Ok().json(records))
    }

    /// `GET /geolocation/history?start&end&n`
    pub async fn latest_history(
        query: web::Query<HistoryQuery>,
        service: web::Data<Arc<GeolocationService>>,
    ) -> Result<HttpResponse, GeotrailError> {
        let records = service
            .latest_history(
                query.start.as_deref(),
                query.end.as_deref(),
                query.n.as_deref(),
            )
            .await?;

        trace!("Global history: {} records", records.len());
        Ok(HttpResponse::Ok().json(records))
    }
}

/// 查询串解析失败（如重复字段）同样返回 JSON 错误体
fn query_error_handler(err: QueryPayloadError, req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected query string on {}: {}", req.path(), err);
    GeotrailError::missing_parameter(format!("invalid query string: {}", err)).into()
}

/// Geolocation 路由配置
///
/// `/history` 必须先于 `/{ip}` 注册，否则会被当作 IP 处理。
pub fn geolocation_routes() -> actix_web::Scope {
    web::scope("/geolocation")
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .route(
            "/history",
            web::get().to(GeolocationHandlers::latest_history),
        )
        .route(
            "/{ip}/history",
            web::get().to(GeolocationHandlers::history_for_ip),
        )
        .route("/{ip}", web::get().to(GeolocationHandlers::lookup))
}
