//! CORS middleware.
//!
//! Handles preflight `OPTIONS` requests directly and attaches
//! `Access-Control-*` headers to normal responses. Rejects the unsafe
//! combination of a wildcard origin with credentialed requests.

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::{
        header::{HeaderName, HeaderValue},
        Method, StatusCode,
    },
    Error as ActixError, HttpResponse,
};
use futures::future::{LocalBoxFuture, Ready};
use serde::{Deserialize, Serialize};
use std::{
    sync::Arc,
    task::{Context, Poll},
};

/// Declarative CORS policy for one gateway instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. `["*"]` means any origin, but is rejected at
    /// construction time when `allow_credentials` is also true.
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_methods")]
    pub allowed_methods: Vec<String>,
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    #[serde(default)]
    pub allow_credentials: bool,
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
}

fn default_methods() -> Vec<String> {
    vec!["GET".into(), "POST".into(), "PUT".into(), "DELETE".into(), "PATCH".into(), "OPTIONS".into()]
}

fn default_max_age() -> u64 {
    600
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: default_methods(),
            allowed_headers: vec!["Authorization".into(), "Content-Type".into()],
            allow_credentials: false,
            max_age_secs: default_max_age(),
        }
    }
}

impl CorsConfig {
    /// `None` if the policy is internally consistent; `Some(message)`
    /// naming the conflict otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.allow_credentials && self.allowed_origins.iter().any(|o| o == "*") {
            return Some("wildcard origin cannot be combined with allow_credentials".to_string());
        }
        None
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
    }
}

/// CORS middleware factory. Panics at construction if the policy is
/// internally inconsistent (caught by [`CorsConfig::validate`] during
/// startup config validation too, so this is a last-resort guard).
#[derive(Clone)]
pub struct Cors {
    config: Arc<CorsConfig>,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        if let Some(reason) = config.validate() {
            panic!("invalid CORS configuration: {}", reason);
        }
        Self {
            config: Arc::new(config),
        }
    }
}

impl Default for Cors {
    fn default() -> Self {
        Self::new(CorsConfig::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for Cors
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Transform = CorsMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures::future::ready(Ok(CorsMiddleware {
            service: Arc::new(service),
            config: self.config.clone(),
        }))
    }
}

pub struct CorsMiddleware<S> {
    service: Arc<S>,
    config: Arc<CorsConfig>,
}

impl<S, B> Service<ServiceRequest> for CorsMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let config = self.config.clone();
        let origin = req
            .headers()
            .get("Origin")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if req.method() == Method::OPTIONS {
            let (http_req, _) = req.into_parts();
            let mut builder = HttpResponse::build(StatusCode::NO_CONTENT);
            if let Some(ref origin) = origin {
                if config.origin_allowed(origin) {
                    apply_cors_headers(&mut builder, &config, origin);
                    builder.insert_header(("Access-Control-Max-Age", config.max_age_secs.to_string()));
                    builder.insert_header(("Access-Control-Allow-Methods", config.allowed_methods.join(", ")));
                    builder.insert_header(("Access-Control-Allow-Headers", config.allowed_headers.join(", ")));
                }
            }
            let response = builder.finish();
            return Box::pin(async move { Ok(ServiceResponse::new(http_req, response.map_into_right_body())) });
        }

        let service = self.service.clone();
        Box::pin(async move {
            let mut res = service.call(req).await?.map_into_left_body();
            if let Some(ref origin) = origin {
                if config.origin_allowed(origin) {
                    apply_cors_headers_to_response(res.headers_mut(), &config, origin);
                }
            }
            Ok(res)
        })
    }
}

fn apply_cors_headers(builder: &mut actix_web::HttpResponseBuilder, config: &CorsConfig, origin: &str) {
    let allow_origin = if config.allowed_origins.iter().any(|o| o == "*") && !config.allow_credentials {
        "*".to_string()
    } else {
        origin.to_string()
    };
    builder.insert_header(("Access-Control-Allow-Origin", allow_origin));
    if config.allow_credentials {
        builder.insert_header(("Access-Control-Allow-Credentials", "true"));
    }
}

fn apply_cors_headers_to_response(headers: &mut actix_web::http::header::HeaderMap, config: &CorsConfig, origin: &str) {
    let allow_origin = if config.allowed_origins.iter().any(|o| o == "*") && !config.allow_credentials {
        "*".to_string()
    } else {
        origin.to_string()
    };
    if let (Ok(name), Ok(value)) = (HeaderName::from_static("access-control-allow-origin"), HeaderValue::from_str(&allow_origin)) {
        headers.insert(name, value);
    }
    if config.allow_credentials {
        headers.insert(
            HeaderName::from_static("access-control-allow-credentials"),
            HeaderValue::from_static("true"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_with_credentials_is_rejected() {
        let config = CorsConfig {
            allow_credentials: true,
            ..CorsConfig::default()
        };
        assert!(config.validate().is_some());
    }

    #[test]
    fn named_origin_with_credentials_is_fine() {
        let config = CorsConfig {
            allowed_origins: vec!["https://app.example.com".to_string()],
            allow_credentials: true,
            ..CorsConfig::default()
        };
        assert!(config.validate().is_none());
    }

    #[test]
    fn origin_matching_respects_wildcard() {
        let config = CorsConfig::default();
        assert!(config.origin_allowed("https://anything.example.com"));
    }

    #[actix_web::test]
    #[should_panic(expected = "invalid CORS configuration")]
    async fn constructing_with_bad_config_panics() {
        let _ = Cors::new(CorsConfig {
            allow_credentials: true,
            ..CorsConfig::default()
        });
    }
}
