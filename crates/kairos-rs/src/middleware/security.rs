//! Security response headers.
//!
//! Attaches a declarative set of hardening headers to every response:
//! HSTS (HTTPS only), `X-Content-Type-Options`, `X-Frame-Options`,
//! `Referrer-Policy`, a Content-Security-Policy, and `Permissions-Policy`.

use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error as ActixError,
};
use futures::future::{LocalBoxFuture, Ready};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    task::{Context, Poll},
};

/// Declarative security header policy. All fields have conservative
/// defaults suitable for an API gateway (no inline scripts assumed, no
/// framing allowed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityHeadersConfig {
    #[serde(default = "default_true")]
    pub hsts_enabled: bool,
    #[serde(default = "default_hsts_max_age")]
    pub hsts_max_age_secs: u64,
    #[serde(default = "default_frame_options")]
    pub frame_options: String,
    #[serde(default = "default_referrer_policy")]
    pub referrer_policy: String,
    #[serde(default = "default_csp")]
    pub content_security_policy: String,
    #[serde(default = "default_permissions_policy")]
    pub permissions_policy: String,
}

fn default_true() -> bool {
    true
}
fn default_hsts_max_age() -> u64 {
    31_536_000
}
fn default_frame_options() -> String {
    "DENY".to_string()
}
fn default_referrer_policy() -> String {
    "no-referrer".to_string()
}
fn default_csp() -> String {
    "default-src 'none'".to_string()
}
fn default_permissions_policy() -> String {
    "geolocation=(), microphone=(), camera=()".to_string()
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            hsts_enabled: default_true(),
            hsts_max_age_secs: default_hsts_max_age(),
            frame_options: default_frame_options(),
            referrer_policy: default_referrer_policy(),
            content_security_policy: default_csp(),
            permissions_policy: default_permissions_policy(),
        }
    }
}

/// Builds the security-headers middleware with default policy.
///
/// # Examples
///
/// ```rust
/// use actix_web::App;
/// use kairos_rs::middleware::security::security_headers;
///
/// let _app = App::new().wrap(security_headers());
/// ```
pub fn security_headers() -> SecurityHeaders {
    SecurityHeaders::new(SecurityHeadersConfig::default())
}

#[derive(Clone)]
pub struct SecurityHeaders {
    config: Arc<SecurityHeadersConfig>,
}

impl SecurityHeaders {
    pub fn new(config: SecurityHeadersConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Transform = SecurityHeadersMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures::future::ready(Ok(SecurityHeadersMiddleware {
            service: Arc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: Arc<S>,
    config: Arc<SecurityHeadersConfig>,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let config = self.config.clone();
        let is_https = req.connection_info().scheme() == "https";

        Box::pin(async move {
            let mut res = service.call(req).await?;
            let headers = res.headers_mut();

            if is_https && config.hsts_enabled {
                insert(headers, "strict-transport-security", &format!("max-age={}; includeSubDomains", config.hsts_max_age_secs));
            }
            insert(headers, "x-content-type-options", "nosniff");
            insert(headers, "x-frame-options", &config.frame_options);
            insert(headers, "referrer-policy", &config.referrer_policy);
            insert(headers, "content-security-policy", &config.content_security_policy);
            insert(headers, "permissions-policy", &config.permissions_policy);

            Ok(res)
        })
    }
}

fn insert(headers: &mut actix_web::http::header::HeaderMap, name: &'static str, value: &str) {
    if let (Ok(name), Ok(value)) = (HeaderName::from_static(name), HeaderValue::from_str(value)) {
        headers.insert(name, value);
    }
}
