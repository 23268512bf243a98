//! HTTP timing middleware
//!
//! Logs method, path, status and latency of every request, and reports the
//! latency back to the client as `Server-Timing: app;dur=<ms>`.

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::time::Instant;
use tracing::{info, warn};

/// 超过该耗时的请求以 warn 级别记录
const SLOW_REQUEST_MS: u128 = 1000;

pub const SERVER_TIMING_HEADER: &str = "server-timing";

/// HTTP timing middleware factory
#[derive(Clone, Default)]
pub struct TimingMiddleware;

impl<S, B> Transform<S, ServiceRequest> for TimingMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = TimingService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TimingService {
            service: Rc::new(service),
        }))
    }
}

pub struct TimingService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for TimingService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();

        Box::pin(async move {
            let mut result = srv.call(req).await;

            let elapsed = start.elapsed();
            if let Ok(response) = result.as_mut() {
                let dur = format!("app;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
                if let Ok(value) = HeaderValue::from_str(&dur) {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static(SERVER_TIMING_HEADER), value);
                }
            }

            let status = match &result {
                Ok(response) => response.status().as_u16(),
                Err(e) => e.as_response_error().status_code().as_u16(),
            };

            if elapsed.as_millis() >= SLOW_REQUEST_MS {
                warn!(
                    method = %method,
                    path = %path,
                    status,
                    latency_ms = elapsed.as_millis() as u64,
                    "slow request"
                );
            } else {
                info!(
                    method = %method,
                    path = %path,
                    status,
                    latency_ms = elapsed.as_millis() as u64,
                    "request completed"
                );
            }

            result
        })
    }
}
