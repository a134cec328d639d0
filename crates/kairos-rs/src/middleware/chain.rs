//! Per-request context threaded through the middleware chain.
//!
//! [`RequestContext`] carries the request id, the sanitized client IP, and a
//! free-form scratch map that later middleware (and the dispatcher) can use
//! to pass data forward without widening every function signature. It is
//! inserted into request extensions by [`RequestContextInit`], which must run
//! before everything downstream — including the built-ins in
//! [`super::size_limit`], [`super::validation`], [`super::auth`],
//! [`super::cors`], [`super::rate_limit`], and [`super::security`] — so they
//! can rely on it being present.
//!
//! Built-in ordering, outermost to innermost:
//! `RequestContextInit` → [`super::error_handler`] → [`super::size_limit`] →
//! [`super::validation`] → [`super::rate_limit`] → [`super::cors`] →
//! [`super::auth`] → [`super::security`] → route handler.
//! `actix-web` runs `.wrap()` layers in reverse registration order, so the
//! binary registers them bottom-up (innermost first) to get this effective
//! order.

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::HeaderValue,
    Error as ActixError, HttpMessage,
};
use futures::future::{LocalBoxFuture, Ready};
use serde_json::{Map, Value};
use std::{
    net::IpAddr,
    sync::Arc,
    task::{Context, Poll},
};
use uuid::Uuid;

use crate::services::client_ip::{extract_client_ip, ClientIpConfig};

/// Per-request state available to every layer below `RequestContextInit`.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub client_ip: Option<IpAddr>,
    /// Free-form scratch space for middleware that needs to pass a value
    /// forward (e.g. which route matched, which target was selected).
    pub scratch: Map<String, Value>,
}

impl RequestContext {
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.scratch.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.scratch.get(key)
    }
}

/// Installs a [`RequestContext`] in request extensions and stamps the
/// response with `X-Request-Id`. Should be the outermost application-level
/// middleware (registered last, ahead of only the logger and compressor) so
/// every other layer below it — including the error handler — can read the
/// request id from extensions.
#[derive(Clone)]
pub struct RequestContextInit {
    client_ip_config: Arc<ClientIpConfig>,
}

impl RequestContextInit {
    pub fn new(client_ip_config: ClientIpConfig) -> Self {
        Self {
            client_ip_config: Arc::new(client_ip_config),
        }
    }
}

impl Default for RequestContextInit {
    fn default() -> Self {
        Self::new(ClientIpConfig::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestContextInit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Transform = RequestContextInitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures::future::ready(Ok(RequestContextInitMiddleware {
            service: Arc::new(service),
            client_ip_config: self.client_ip_config.clone(),
        }))
    }
}

pub struct RequestContextInitMiddleware<S> {
    service: Arc<S>,
    client_ip_config: Arc<ClientIpConfig>,
}

impl<S, B> Service<ServiceRequest> for RequestContextInitMiddleware<S>
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
        let service = self.service.clone();
        let request_id = req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let client_ip = extract_client_ip(req.request(), &self.client_ip_config);

        let ctx = RequestContext {
            request_id: request_id.clone(),
            client_ip,
            scratch: Map::new(),
        };
        req.extensions_mut().insert(ctx);

        Box::pin(async move {
            let mut res = service.call(req).await?;
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut().insert(
                    actix_web::http::header::HeaderName::from_static("x-request-id"),
                    value,
                );
            }
            Ok(res)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App, HttpMessage, HttpResponse};

    #[actix_web::test]
    async fn installs_context_and_stamps_request_id() {
        let app = test::init_service(App::new().wrap(RequestContextInit::default()).route(
            "/",
            web::get().to(|req: actix_web::HttpRequest| async move {
                let ctx = req.extensions().get::<RequestContext>().cloned().unwrap();
                assert!(!ctx.request_id.is_empty());
                HttpResponse::Ok().finish()
            }),
        ))
        .await;
        let req = test::TestRequest::get().uri("/").to_request();
        let res = test::call_service(&app, req).await;
        assert!(res.headers().get("x-request-id").is_some());
    }

    #[actix_web::test]
    async fn existing_request_id_header_is_preserved() {
        let app = test::init_service(
            App::new()
                .wrap(RequestContextInit::default())
                .route("/", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("x-request-id", "caller-supplied-id"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.headers().get("x-request-id").unwrap(), "caller-supplied-id");
    }

    #[test]
    fn scratch_map_round_trips_values() {
        let mut ctx = RequestContext {
            request_id: "r1".to_string(),
            client_ip: None,
            scratch: Map::new(),
        };
        ctx.insert("matched_route", "users-api");
        assert_eq!(ctx.get("matched_route").unwrap(), "users-api");
    }
}
