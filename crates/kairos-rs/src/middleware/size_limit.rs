//! Request size limiting middleware.
//!
//! Enforces `maxBodySize`, `maxHeaderSize`, `maxHeaderCount`,
//! `maxUrlLength`, and `maxQueryParams`, returning 413/414/431 per
//! subtype. GET and HEAD skip the body check since they carry no
//! meaningful payload.

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{Method, StatusCode},
    Error as ActixError, HttpMessage, HttpResponse, ResponseError,
};
use futures::future::{LocalBoxFuture, Ready};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::{
    sync::Arc,
    task::{Context, Poll},
};

use crate::middleware::chain::RequestContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizeLimitConfig {
    #[serde(default = "default_max_body")]
    pub max_body_size: u64,
    #[serde(default = "default_max_header_size")]
    pub max_header_size: usize,
    #[serde(default = "default_max_header_count")]
    pub max_header_count: usize,
    #[serde(default = "default_max_url_length")]
    pub max_url_length: usize,
    #[serde(default = "default_max_query_params")]
    pub max_query_params: usize,
}

fn default_max_body() -> u64 {
    10 * 1024 * 1024
}
fn default_max_header_size() -> usize {
    8 * 1024
}
fn default_max_header_count() -> usize {
    100
}
fn default_max_url_length() -> usize {
    8 * 1024
}
fn default_max_query_params() -> usize {
    100
}

impl Default for SizeLimitConfig {
    fn default() -> Self {
        Self {
            max_body_size: default_max_body(),
            max_header_size: default_max_header_size(),
            max_header_count: default_max_header_count(),
            max_url_length: default_max_url_length(),
            max_query_params: default_max_query_params(),
        }
    }
}

/// Which subtype of size limit was exceeded, carrying its own status code
/// per `spec.md` §4.2/§8 (body→413, URL→414, headers→431, query count→414).
#[derive(Debug, Clone, Copy)]
enum SizeLimitKind {
    Body,
    Url,
    HeaderSize,
    HeaderCount,
    QueryParams,
}

impl SizeLimitKind {
    fn message(&self) -> &'static str {
        match self {
            SizeLimitKind::Body => "request body exceeds the configured size limit",
            SizeLimitKind::Url => "request URL exceeds the configured length limit",
            SizeLimitKind::HeaderSize => "request headers exceed the configured size limit",
            SizeLimitKind::HeaderCount => "too many request headers",
            SizeLimitKind::QueryParams => "too many query parameters",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            SizeLimitKind::Body => "PAYLOAD_TOO_LARGE",
            SizeLimitKind::Url => "URI_TOO_LONG",
            SizeLimitKind::HeaderSize | SizeLimitKind::HeaderCount => "HEADERS_TOO_LARGE",
            SizeLimitKind::QueryParams => "TOO_MANY_QUERY_PARAMS",
        }
    }
}

/// Carries the request id alongside the violated limit so the JSON error
/// body's `requestId` can match the `X-Request-Id` response header.
#[derive(Debug)]
struct SizeLimitError {
    kind: SizeLimitKind,
    request_id: String,
}

impl fmt::Display for SizeLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.message())
    }
}

impl ResponseError for SizeLimitError {
    fn status_code(&self) -> StatusCode {
        match self.kind {
            SizeLimitKind::Body => StatusCode::PAYLOAD_TOO_LARGE,
            SizeLimitKind::Url | SizeLimitKind::QueryParams => StatusCode::URI_TOO_LONG,
            SizeLimitKind::HeaderSize | SizeLimitKind::HeaderCount => StatusCode::from_u16(431).unwrap(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": {
                "code": self.kind.code(),
                "message": self.to_string(),
                "requestId": self.request_id,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }
        }))
    }
}

fn check(req: &ServiceRequest, config: &SizeLimitConfig) -> Result<(), SizeLimitKind> {
    if req.uri().to_string().len() > config.max_url_length {
        return Err(SizeLimitKind::Url);
    }

    let query_param_count = req.query_string().split('&').filter(|p| !p.is_empty()).count();
    if query_param_count > config.max_query_params {
        return Err(SizeLimitKind::QueryParams);
    }

    if req.headers().len() > config.max_header_count {
        return Err(SizeLimitKind::HeaderCount);
    }
    let header_bytes: usize = req
        .headers()
        .iter()
        .map(|(name, value)| name.as_str().len() + value.len() + 4)
        .sum();
    if header_bytes > config.max_header_size {
        return Err(SizeLimitKind::HeaderSize);
    }

    if *req.method() != Method::GET && *req.method() != Method::HEAD {
        if let Some(content_length) = req
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
        {
            if content_length > config.max_body_size {
                return Err(SizeLimitKind::Body);
            }
        }
    }

    Ok(())
}

/// Size-limiting middleware factory.
#[derive(Clone)]
pub struct SizeLimiter {
    config: Arc<SizeLimitConfig>,
}

impl SizeLimiter {
    pub fn new(config: SizeLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for SizeLimiter {
    fn default() -> Self {
        Self::new(SizeLimitConfig::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for SizeLimiter
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Transform = SizeLimiterMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures::future::ready(Ok(SizeLimiterMiddleware {
            service: Arc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct SizeLimiterMiddleware<S> {
    service: Arc<S>,
    config: Arc<SizeLimitConfig>,
}

impl<S, B> Service<ServiceRequest> for SizeLimiterMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Err(kind) = check(&req, &self.config) {
            let request_id = req
                .extensions()
                .get::<RequestContext>()
                .map(|ctx| ctx.request_id.clone())
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            return Box::pin(async move { Err(ActixError::from(SizeLimitError { kind, request_id })) });
        }
        let service = self.service.clone();
        Box::pin(async move { service.call(req).await })
    }
}
