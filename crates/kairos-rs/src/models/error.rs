//! Gateway error taxonomy and the stable JSON error contract.
//!
//! Every error that can surface to a client flows through [`GatewayError`].
//! It implements [`actix_web::ResponseError`] so handlers can propagate with
//! `?` and the outermost middleware never has to special-case a variant.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Taxonomy of everything that can go wrong while serving a proxied request.
///
/// Variant names and fields for `RouteNotFound`, `Config`, `MethodNotAllowed`,
/// `Upstream`, `Timeout` and `CircuitOpen` are fixed by existing call sites in
/// `services::http`; the remaining variants implement the broader
/// classification (input/auth/policy/internal) used by the middleware chain.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No route matched the request path.
    #[error("no route matches path {path}")]
    RouteNotFound { path: String },

    /// A route matched but not for this HTTP method.
    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: String, path: String },

    /// The route/gateway configuration itself is broken.
    #[error("configuration error for route {route}: {message}")]
    Config { message: String, route: String },

    /// The upstream returned a transport-level failure (connection reset,
    /// DNS failure, TLS handshake failure, etc).
    #[error("upstream error calling {url}: {message}")]
    Upstream {
        message: String,
        url: String,
        status: Option<u16>,
    },

    /// The upstream did not respond within the configured deadline.
    #[error("upstream timed out after {timeout:?}")]
    Timeout { timeout: std::time::Duration },

    /// The circuit breaker for the target service is open.
    #[error("circuit open for service {service}")]
    CircuitOpen { service: String },

    /// No healthy target remained in the pool for this route.
    #[error("no healthy upstream available for {route}")]
    NoHealthyUpstream { route: String },

    /// Request failed validation (size limit, malformed body, bad header).
    #[error("invalid request: {message}")]
    InputError { message: String },

    /// Missing or malformed credentials.
    #[error("unauthenticated: {message}")]
    Unauthenticated { message: String },

    /// Credentials presented but insufficient.
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// Rate limit or other traffic policy rejected the request.
    #[error("policy rejected request: {message}")]
    PolicyRejected { message: String },

    /// Anything else — should be rare and always logged at `error`.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// Stable machine-readable code used in the JSON error body.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            GatewayError::MethodNotAllowed { .. } => "METHOD_NOT_ALLOWED",
            GatewayError::Config { .. } => "CONFIG_ERROR",
            GatewayError::Upstream { .. } => "UPSTREAM_TRANSPORT_ERROR",
            GatewayError::Timeout { .. } => "UPSTREAM_TIMEOUT",
            GatewayError::CircuitOpen { .. } => "CIRCUIT_BREAKER_OPEN",
            GatewayError::NoHealthyUpstream { .. } => "NO_HEALTHY_UPSTREAM",
            GatewayError::InputError { .. } => "INPUT_ERROR",
            GatewayError::Unauthenticated { .. } => "UNAUTHENTICATED",
            GatewayError::Forbidden { .. } => "FORBIDDEN",
            GatewayError::PolicyRejected { .. } => "POLICY_REJECTED",
            GatewayError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// Extra structured detail for the `details` field of the error body.
    /// Only populated for variants where it adds diagnostic value.
    fn details(&self) -> Option<Value> {
        match self {
            GatewayError::Upstream { url, status, .. } => Some(serde_json::json!({
                "url": url,
                "upstreamStatus": status,
            })),
            GatewayError::CircuitOpen { service } => Some(serde_json::json!({
                "service": service,
            })),
            GatewayError::Timeout { timeout } => Some(serde_json::json!({
                "timeoutMs": timeout.as_millis() as u64,
            })),
            _ => None,
        }
    }
}

/// Body shape for every error response: `{"error": {...}}`.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: &'static str,
    message: String,
    #[serde(rename = "requestId")]
    request_id: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl GatewayError {
    /// Builds the error response with a caller-supplied request id, so it
    /// matches the `X-Request-Id` response header set by
    /// [`crate::middleware::chain::RequestContextInit`]. Callers that have
    /// the originating request in scope (the dispatcher, the error-handling
    /// middleware) should always prefer this over the plain
    /// [`ResponseError::error_response`], which has no way to see the
    /// request and falls back to minting a fresh id.
    pub fn error_response_with_request_id(&self, request_id: &str) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        if matches!(self, GatewayError::CircuitOpen { .. } | GatewayError::NoHealthyUpstream { .. }) {
            builder.insert_header(("Retry-After", "60"));
        }
        let body = ErrorBody {
            error: ErrorPayload {
                code: self.code(),
                message: self.to_string(),
                request_id: request_id.to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                details: self.details(),
            },
        };
        builder.json(body)
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::NoHealthyUpstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::InputError { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::Forbidden { .. } => StatusCode::FORBIDDEN,
            GatewayError::PolicyRejected { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Framework-invoked fallback for paths that never had a request in
    /// scope (there is no `req` in the `ResponseError` signature). Anywhere
    /// the request is available, [`Self::error_response_with_request_id`] is
    /// used instead so the body's `requestId` matches `X-Request-Id`.
    fn error_response(&self) -> HttpResponse {
        self.error_response_with_request_id(&Uuid::new_v4().to_string())
    }
}
