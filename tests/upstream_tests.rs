//! Upstream client tests
//!
//! Runs `ExternalApiProvider` against an in-process actix-web mock of the
//! geolocation API.

use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use geotrail::config::UpstreamConfig;
use geotrail::errors::GeotrailError;
use geotrail::services::{ExternalApiProvider, GeoIpLookup};

const TEST_USER_AGENT: &str = "geotrail-test-agent";

/// 每条路由的命中次数
#[derive(Default)]
struct Hits {
    ok: AtomicUsize,
    fail: AtomicUsize,
    missing: AtomicUsize,
}

async fn ok_handler(
    req: HttpRequest,
    path: web::Path<String>,
    hits: web::Data<Arc<Hits>>,
) -> HttpResponse {
    hits.ok.fetch_add(1, Ordering::SeqCst);

    let user_agent = req
        .headers()
        .get("User-Agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if user_agent != TEST_USER_AGENT {
        return HttpResponse::BadRequest().body("unexpected user agent");
    }

    HttpResponse::Ok().json(serde_json::json!({
        "ip": path.into_inner(),
        "city": "Mountain View",
        "region": "California",
        "country_name": "United States",
        "postal": "94043",
        "latitude": 37.42301,
        "longitude": -122.083352,
        "timezone": "America/Los_Angeles",
        "timestamp": "1999-01-01T00:00:00Z"
    }))
}

async fn fail_handler(hits: web::Data<Arc<Hits>>) -> HttpResponse {
    hits.fail.fetch_add(1, Ordering::SeqCst);
    HttpResponse::InternalServerError().body("boom")
}

async fn missing_handler(hits: web::Data<Arc<Hits>>) -> HttpResponse {
    hits.missing.fetch_add(1, Ordering::SeqCst);
    HttpResponse::NotFound().finish()
}

async fn garbage_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html")
        .body("<html>rate limited</html>")
}

async fn reserved_handler(path: web::Path<String>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "ip": path.into_inner(),
        "error": true,
        "reason": "Reserved IP Address"
    }))
}

/// 启动 mock 上游，返回 base URL
fn start_mock_upstream(hits: Arc<Hits>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(hits.clone()))
            .route("/ok/{ip}/json/", web::get().to(ok_handler))
            .route("/fail/{ip}/json/", web::get().to(fail_handler))
            .route("/missing/{ip}/json/", web::get().to(missing_handler))
            .route("/garbage/{ip}/json/", web::get().to(garbage_handler))
            .route("/reserved/{ip}/json/", web::get().to(reserved_handler))
    })
    .workers(1)
    .listen(listener)
    .unwrap()
    .run();

    actix_web::rt::spawn(server);
    format!("http://127.0.0.1:{}", port)
}

fn provider(base: &str, route: &str) -> ExternalApiProvider {
    ExternalApiProvider::new(&UpstreamConfig {
        api_url: format!("{}/{}/{{ip}}/json/", base, route),
        user_agent: TEST_USER_AGENT.to_string(),
        timeout_secs: 2,
        retry_count: 1,
        retry_base_delay_ms: 10,
    })
}

#[actix_web::test]
async fn test_successful_lookup() {
    let hits = Arc::new(Hits::default());
    let base = start_mock_upstream(hits.clone());

    let record = provider(&base, "ok").lookup("8.8.8.8").await.unwrap();

    assert_eq!(record.ip, "8.8.8.8");
    assert_eq!(record.city.as_deref(), Some("Mountain View"));
    assert_eq!(record.latitude.as_deref(), Some("37.42301"));
    assert_eq!(record.timezone.as_deref(), Some("America/Los_Angeles"));
    assert!(record.id.is_none());
    assert!(record.timestamp.is_none());
    assert_eq!(hits.ok.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_server_error_is_retried_once() {
    let hits = Arc::new(Hits::default());
    let base = start_mock_upstream(hits.clone());

    let err = provider(&base, "fail").lookup("8.8.8.8").await.unwrap_err();

    assert!(matches!(err, GeotrailError::UpstreamUnavailable(_)));
    assert!(err.message().contains("500"));
    assert_eq!(hits.fail.load(Ordering::SeqCst), 2);
}

#[actix_web::test]
async fn test_client_error_is_not_retried() {
    let hits = Arc::new(Hits::default());
    let base = start_mock_upstream(hits.clone());

    let err = provider(&base, "missing").lookup("8.8.8.8").await.unwrap_err();

    assert!(matches!(err, GeotrailError::UpstreamUnavailable(_)));
    assert_eq!(hits.missing.load(Ordering::SeqCst), 1);
}

#[actix_web::test]
async fn test_non_json_body_is_parse_error() {
    let base = start_mock_upstream(Arc::new(Hits::default()));

    let err = provider(&base, "garbage").lookup("8.8.8.8").await.unwrap_err();
    assert!(matches!(err, GeotrailError::UpstreamParse(_)));
}

#[actix_web::test]
async fn test_error_flag_is_rejection() {
    let base = start_mock_upstream(Arc::new(Hits::default()));

    let err = provider(&base, "reserved").lookup("127.0.0.1").await.unwrap_err();
    assert!(matches!(err, GeotrailError::UpstreamRejected(_)));
    assert!(err.message().contains("Reserved IP Address"));
}

#[actix_web::test]
async fn test_connection_refused_is_unavailable() {
    // 绑定后立即释放端口，保证无人监听
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let provider = ExternalApiProvider::new(&UpstreamConfig {
        api_url: format!("http://127.0.0.1:{}/{{ip}}/json/", port),
        user_agent: TEST_USER_AGENT.to_string(),
        timeout_secs: 1,
        retry_count: 0,
        retry_base_delay_ms: 10,
    });

    let err = provider.lookup("8.8.8.8").await.unwrap_err();
    assert!(matches!(err, GeotrailError::UpstreamUnavailable(_)));
}
