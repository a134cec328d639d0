//! HTTP route handlers and endpoint definitions for the kairos-rs gateway.
//!
//! This module contains all HTTP route handlers, endpoint configurations, and
//! request processing logic. It provides the web interface layer that clients
//! interact with, including health checks and dynamic proxy routing.
//!
//! # Module Organization
//!
//! - [`health`] - Health check endpoints for monitoring and Kubernetes probes
//! - [`auth_http`] - Dynamic route registration, with JWT applied per-route
//! - [`management`] - Runtime route table inspection and hot-reload endpoints
//! - [`metrics`] - Prometheus-style metrics endpoint
//! - [`config_reload`] - Hot configuration reload endpoint
//!
//! # Route Architecture
//!
//! ```text
//! Client Request → Route Handler → Service Layer → Upstream Service
//!       ↓              ↓              ↓               ↓
//!     HTTP        Path Matching    Business Logic   HTTP Client
//!    Headers       Validation       Error Handling   Connection Pool
//!    Body          Middleware       Logging          Response Processing
//! ```
//!
//! # Route Configuration
//!
//! Routes are configured through the main application using Actix Web's
//! service configuration system:
//!
//! ```rust
//! # use actix_web::{App, web};
//! # use std::sync::Arc;
//! #
//! # struct RouteHandler;
//! # impl RouteHandler {
//! #     fn new(_routes: Vec<Router>, _timeout: u64) -> Arc<Self> {
//! #         Arc::new(RouteHandler)
//! #     }
//! # }
//! #
//! # struct Router;
//! #
//! # fn configure_health(_cfg: &mut web::ServiceConfig) {}
//!
//! let routes: Vec<Router> = vec![];
//! let handler = RouteHandler::new(routes, 30);
//!
//! let app = App::new()
//!     .configure(configure_health);
//! ```

pub mod auth_http;
pub mod config_reload;
pub mod health;
pub mod management;
pub mod metrics;
