use actix_web::{test, web, App};
use kairos_rs::models::router::{Backend, Router};
use kairos_rs::models::settings::Settings;
use kairos_rs::routes::{auth_http, metrics};
use kairos_rs::services::http::RouteHandler;
use std::time::Duration;

fn route(host: &str, port: u16, external_path: &str) -> Router {
    Router {
        host: Some(host.to_string()),
        port: Some(port),
        backends: Some(vec![Backend {
            host: host.to_string(),
            port,
            weight: 1,
            health_check_path: None,
        }]),
        load_balancing_strategy: Default::default(),
        external_path: external_path.to_string(),
        internal_path: "/test".to_string(),
        methods: vec!["GET".to_string()],
        auth_required: false,
        retry: None,
        health_check: None,
        breaker: None,
        sticky: None,
        proxy: None,
    }
}

fn settings_with(routers: Vec<Router>) -> Settings {
    Settings {
        version: 1,
        jwt: None,
        rate_limit: None,
        environment: Default::default(),
        routers,
    }
}

#[actix_web::test]
async fn test_circuit_breaker_integration() {
    // Route pointing to a non-existent service; every request is an upstream
    // error until the breaker's default failure threshold (5) trips.
    let routes = vec![route("http://non-existent-service", 9999, "/api/test")];
    let settings = settings_with(routes.clone());
    let route_handler = RouteHandler::new(routes, 5);

    let metrics_collector = metrics::MetricsCollector::default();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(metrics_collector.clone()))
            .configure(metrics::configure_metrics)
            .configure(|cfg| auth_http::configure_auth_routes(cfg, route_handler, &settings)),
    )
    .await;

    println!("Starting circuit breaker integration test...");

    for i in 1..=7 {
        let req = test::TestRequest::get()
            .uri(&format!("/api/test?attempt={}", i))
            .to_request();

        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        println!("Request {}: {}", i, status);

        if i <= 5 {
            assert_eq!(status, 502, "Expected upstream error for request {}", i);
        } else {
            assert_eq!(status, 503, "Expected circuit breaker open for request {}", i);
        }

        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let metrics_req = test::TestRequest::get().uri("/metrics").to_request();
    let metrics_resp = test::call_service(&app, metrics_req).await;
    assert_eq!(metrics_resp.status(), 200);

    let metrics_body = test::read_body(metrics_resp).await;
    let metrics_text = String::from_utf8_lossy(&metrics_body);

    println!("Final metrics:\n{}", metrics_text);

    assert!(metrics_text.contains("kairos_requests_total 7"));
    assert!(metrics_text.contains("kairos_requests_error_total 7"));

    println!("Circuit breaker integration test completed successfully!");
}

#[actix_web::test]
async fn test_multiple_service_circuit_breakers() {
    let routes = vec![
        route("http://service-a", 8001, "/api/service-a"),
        route("http://service-b", 8002, "/api/service-b"),
    ];
    let settings = settings_with(routes.clone());
    let route_handler = RouteHandler::new(routes, 5);

    let metrics_collector = metrics::MetricsCollector::default();

    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(metrics_collector.clone()))
            .configure(metrics::configure_metrics)
            .configure(|cfg| auth_http::configure_auth_routes(cfg, route_handler, &settings)),
    )
    .await;

    println!("Testing multiple service circuit breakers...");

    for i in 1..=6 {
        let req = test::TestRequest::get()
            .uri(&format!("/api/service-a?attempt={}", i))
            .to_request();

        let resp = test::call_service(&app, req).await;
        println!("Service A request {}: {}", i, resp.status());
    }

    let req_b = test::TestRequest::get().uri("/api/service-b").to_request();
    let resp_b = test::call_service(&app, req_b).await;
    println!("Service B status: {}", resp_b.status());

    assert_eq!(resp_b.status(), 502, "Service B circuit should still be closed");

    let req_a = test::TestRequest::get().uri("/api/service-a").to_request();
    let resp_a = test::call_service(&app, req_a).await;
    println!("Service A after circuit open: {}", resp_a.status());
    assert_eq!(resp_a.status(), 503, "Service A circuit should be open");

    println!("Multiple service circuit breaker test completed!");
}
