//! Route registration for the gateway's dynamic route table.
//!
//! Wires each configured [`Router`] to the dispatcher, wrapping routes that
//! set `auth_required` with the JWT middleware and leaving the rest public.
//! Unmatched requests fall through to the dispatcher's own route-matcher
//! error (`404`/`405` via [`crate::models::error::GatewayError`]).

use crate::middleware::auth::{JwtAuth, JwtConfig};
use crate::models::router::Router;
use crate::models::settings::Settings;
use crate::services::http::RouteHandler;
use actix_web::{web, HttpRequest};
use std::sync::Arc;

/// Registers every configured route on `cfg`, applying JWT auth where the
/// route requires it.
pub fn configure_auth_routes(cfg: &mut web::ServiceConfig, handler: RouteHandler, settings: &Settings) {
    let handler = Arc::new(handler);
    let jwt_config = settings.jwt.as_ref().map(|jwt_settings| {
        JwtConfig::new(jwt_settings.secret.clone())
            .with_issuer(jwt_settings.issuer.clone().unwrap_or_default())
            .with_audience(jwt_settings.audience.clone().unwrap_or_default())
    });

    for router in &settings.routers {
        if router.auth_required {
            if let Some(ref jwt_config) = jwt_config {
                register_authenticated_route(cfg, router, &handler, jwt_config.clone());
            }
        } else {
            register_public_route(cfg, router, &handler);
        }
    }

    let fallback_handler = handler.clone();
    cfg.default_service(web::route().to(move |req: HttpRequest, body: web::Bytes| {
        let handler = fallback_handler.clone();
        async move { handler.handle_request(req, body).await }
    }));
}

fn register_public_route(cfg: &mut web::ServiceConfig, router: &Router, handler: &Arc<RouteHandler>) {
    for method in &router.methods {
        let path = router.external_path.clone();
        let handler = handler.clone();
        let route_fn = move |req: HttpRequest, body: web::Bytes| {
            let handler = handler.clone();
            async move { handler.handle_request(req, body).await }
        };
        match method.to_uppercase().as_str() {
            "GET" => cfg.route(&path, web::get().to(route_fn)),
            "POST" => cfg.route(&path, web::post().to(route_fn)),
            "PUT" => cfg.route(&path, web::put().to(route_fn)),
            "DELETE" => cfg.route(&path, web::delete().to(route_fn)),
            "PATCH" => cfg.route(&path, web::patch().to(route_fn)),
            "HEAD" => cfg.route(&path, web::head().to(route_fn)),
            "OPTIONS" => cfg.route(&path, web::method(actix_web::http::Method::OPTIONS).to(route_fn)),
            _ => cfg,
        };
    }
}

fn register_authenticated_route(
    cfg: &mut web::ServiceConfig,
    router: &Router,
    handler: &Arc<RouteHandler>,
    jwt_config: JwtConfig,
) {
    for method in &router.methods {
        let path = router.external_path.clone();
        let handler = handler.clone();
        let jwt_middleware = JwtAuth::new(jwt_config.clone());
        let route_fn = move |req: HttpRequest, body: web::Bytes| {
            let handler = handler.clone();
            async move { handler.handle_request(req, body).await }
        };
        let resource = match method.to_uppercase().as_str() {
            "GET" => web::resource(&path).wrap(jwt_middleware).route(web::get().to(route_fn)),
            "POST" => web::resource(&path).wrap(jwt_middleware).route(web::post().to(route_fn)),
            "PUT" => web::resource(&path).wrap(jwt_middleware).route(web::put().to(route_fn)),
            "DELETE" => web::resource(&path).wrap(jwt_middleware).route(web::delete().to(route_fn)),
            "PATCH" => web::resource(&path).wrap(jwt_middleware).route(web::patch().to(route_fn)),
            _ => continue,
        };
        cfg.service(resource);
    }
}
