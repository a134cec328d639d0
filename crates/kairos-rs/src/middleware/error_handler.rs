//! Outermost error-handling middleware.
//!
//! Everything above this layer can fail with any `actix_web::Error`. This
//! middleware is the single place that decides what a client actually sees:
//! known [`GatewayError`] variants already carry the right status code and
//! JSON body, so they pass through untouched; anything else is logged at
//! `error` and collapsed into a generic `INTERNAL_ERROR` response so stack
//! traces and internal messages never leak to a caller. In
//! [`Environment::Development`] the original message is included to speed up
//! local debugging.

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error as ActixError, HttpMessage, HttpResponse,
};
use futures::future::{LocalBoxFuture, Ready};
use log::error;
use std::{
    sync::Arc,
    task::{Context, Poll},
};

use crate::middleware::chain::RequestContext;
use crate::models::settings::Environment;

#[derive(Clone)]
pub struct ErrorHandler {
    environment: Environment,
}

impl ErrorHandler {
    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

impl<S, B> Transform<S, ServiceRequest> for ErrorHandler
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Transform = ErrorHandlerMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures::future::ready(Ok(ErrorHandlerMiddleware {
            service: Arc::new(service),
            environment: self.environment,
        }))
    }
}

pub struct ErrorHandlerMiddleware<S> {
    service: Arc<S>,
    environment: Environment,
}

impl<S, B> Service<ServiceRequest> for ErrorHandlerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let environment = self.environment;
        let request_path = req.path().to_string();
        let request_id = req
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.request_id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Box::pin(async move {
            match service.call(req).await {
                Ok(res) => Ok(res.map_into_left_body()),
                Err(err) => {
                    // `GatewayError` (and any other `ResponseError` that
                    // already renders a sane body) is passed through as-is.
                    // Only a raw, uncategorized failure gets collapsed here.
                    if err.as_response_error().error_response().status().as_u16() != 500
                        || err.as_error::<crate::models::error::GatewayError>().is_some()
                    {
                        return Err(err);
                    }

                    error!("unhandled error serving {}: {}", request_path, err);
                    let message = if matches!(environment, Environment::Development) {
                        err.to_string()
                    } else {
                        "an internal error occurred".to_string()
                    };
                    let body = serde_json::json!({
                        "error": {
                            "code": "INTERNAL_ERROR",
                            "message": message,
                            "requestId": request_id,
                            "timestamp": chrono::Utc::now().to_rfc3339(),
                        }
                    });
                    let response = HttpResponse::InternalServerError().json(body);
                    Err(actix_web::error::InternalError::from_response(err, response).into())
                }
            }
        })
    }
}
