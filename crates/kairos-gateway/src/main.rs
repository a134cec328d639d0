//! Kairos API Gateway Server
//!
//! High-performance HTTP API gateway built with Rust and Actix Web.
//!
//! This binary provides the main server entry point for the Kairos gateway,
//! configuring and starting the HTTP server with the full middleware chain
//! and dynamic routing.

use kairos_rs::cluster::{is_worker_process, ClusterConfig, ClusterSupervisor};
use kairos_rs::config::settings::load_settings;
use kairos_rs::config::validation::ConfigValidator;
use kairos_rs::logs::logger::configure_logger;
use kairos_rs::middleware::chain::RequestContextInit;
use kairos_rs::middleware::cors::Cors;
use kairos_rs::middleware::error_handler::ErrorHandler;
use kairos_rs::middleware::rate_limit::AdvancedRateLimit;
use kairos_rs::middleware::security::security_headers;
use kairos_rs::middleware::size_limit::SizeLimiter;
use kairos_rs::middleware::validation::InputValidator;
use kairos_rs::models::settings::{Environment, Settings};
use kairos_rs::routes::{auth_http, config_reload, health, management, metrics};
use kairos_rs::services::http::RouteHandler;
use kairos_rs::services::metrics_store::MetricsStore;

use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{middleware::Logger, App, HttpServer};
use chrono::Duration as ChronoDuration;
use log::{error, info};
use std::sync::Arc;
use tokio::signal;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    configure_logger();

    let environment = Environment::from_env();
    let config: Settings = load_settings().expect("Failed to load settings");

    info!("Starting Kairos-rs API Gateway v{} ({:?})", config.version, environment);

    let validation_result = ConfigValidator::validate_comprehensive(&config);
    if !validation_result.is_valid {
        error!("Configuration validation failed:");
        for error in &validation_result.errors {
            error!("  - {}", error);
        }
        std::process::exit(1);
    }
    info!("Configuration validated successfully with {} warnings", validation_result.warnings.len());

    if should_supervise_cluster() && !is_worker_process() {
        return run_cluster_supervisor().await;
    }

    run_worker(config, environment).await
}

/// Whether this invocation should fork worker processes instead of serving
/// directly. Opt-in via `KAIROS_CLUSTER=1`; a bare run (e.g. under a process
/// manager that already handles fan-out) serves directly.
fn should_supervise_cluster() -> bool {
    std::env::var("KAIROS_CLUSTER").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Parent process: spawns and supervises `workers` copies of this same
/// binary (re-exec'd with `CLUSTER_WORKER=1`), each serving independently.
async fn run_cluster_supervisor() -> std::io::Result<()> {
    let exe = std::env::current_exe()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = ClusterConfig::default();
    info!("cluster: supervising {} worker processes", config.workers);

    let supervisor = Arc::new(ClusterSupervisor::new(config, Arc::new(kairos_rs::clock::SystemClock), move |_id| {
        let mut command = tokio::process::Command::new(&exe);
        command.args(&args);
        command
    }));

    supervisor.start().await?;

    signal::ctrl_c().await?;
    info!("cluster: received shutdown signal, stopping workers...");
    supervisor.shutdown().await;
    Ok(())
}

/// Runs the actual gateway server: either a single process (default) or one
/// cluster worker (when spawned by [`run_cluster_supervisor`]).
async fn run_worker(config: Settings, environment: Environment) -> std::io::Result<()> {
    let route_handler = RouteHandler::new(config.routers.clone(), 30);

    let metrics_collector = metrics::MetricsCollector::default();
    let metrics_store = MetricsStore::new(10_000, ChronoDuration::hours(24));

    let config_path = std::env::var("KAIROS_CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
    let route_manager = management::RouteManager::new(config.clone(), config_path);

    let governor_conf = GovernorConfigBuilder::default()
        .per_second(100)
        .burst_size(200)
        .finish()
        .unwrap();

    let host = std::env::var("KAIROS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("KAIROS_PORT")
        .unwrap_or_else(|_| "5900".to_string())
        .parse::<u16>()
        .unwrap_or(5900);

    info!("Starting server on {}:{}", host, port);

    // `.wrap()` layers apply in reverse registration order, so registering
    // bottom-up here gives the effective outermost-to-innermost chain
    // documented in `middleware::chain`: Compress -> Logger ->
    // RequestContextInit -> error_handler -> size_limit -> validation ->
    // rate_limit -> cors -> security -> route handler.
    let server = if let Some(rate_limit_config) = config.rate_limit.clone() {
        info!("Using advanced rate limiting with strategy: {:?}", rate_limit_config.strategy);
        let advanced_rate_limit = AdvancedRateLimit::new(rate_limit_config);
        HttpServer::new(move || {
            App::new()
                .app_data(actix_web::web::Data::new(metrics_collector.clone()))
                .app_data(actix_web::web::Data::new(metrics_store.clone()))
                .app_data(actix_web::web::Data::new(route_manager.clone()))
                .app_data(actix_web::web::Data::new(route_handler.clone()))
                .wrap(security_headers())
                .wrap(Cors::default())
                .wrap(advanced_rate_limit.clone())
                .wrap(InputValidator::default())
                .wrap(SizeLimiter::default())
                .wrap(ErrorHandler::new(environment))
                .wrap(RequestContextInit::default())
                .wrap(Logger::new(r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#))
                .wrap(actix_web::middleware::Compress::default())
                .configure(health::configure_health)
                .configure(metrics::configure_metrics)
                .configure(management::configure_management)
                .configure(config_reload::configure_config_reload)
                .configure(|cfg| auth_http::configure_auth_routes(cfg, route_handler.clone(), &config))
        })
        .bind((host.as_str(), port))?
        .run()
    } else {
        info!("Using basic rate limiting (100 req/sec, 200 burst)");
        HttpServer::new(move || {
            App::new()
                .app_data(actix_web::web::Data::new(metrics_collector.clone()))
                .app_data(actix_web::web::Data::new(metrics_store.clone()))
                .app_data(actix_web::web::Data::new(route_manager.clone()))
                .app_data(actix_web::web::Data::new(route_handler.clone()))
                .wrap(security_headers())
                .wrap(Cors::default())
                .wrap(Governor::new(&governor_conf))
                .wrap(InputValidator::default())
                .wrap(SizeLimiter::default())
                .wrap(ErrorHandler::new(environment))
                .wrap(RequestContextInit::default())
                .wrap(Logger::new(r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#))
                .wrap(actix_web::middleware::Compress::default())
                .configure(health::configure_health)
                .configure(metrics::configure_metrics)
                .configure(management::configure_management)
                .configure(config_reload::configure_config_reload)
                .configure(|cfg| auth_http::configure_auth_routes(cfg, route_handler.clone(), &config))
        })
        .bind((host.as_str(), port))?
        .run()
    };

    info!("Server started successfully");

    tokio::select! {
        result = server => {
            match result {
                Ok(_) => info!("Server stopped gracefully"),
                Err(e) => error!("Server error: {}", e),
            }
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping server...");
        }
    }

    Ok(())
}
