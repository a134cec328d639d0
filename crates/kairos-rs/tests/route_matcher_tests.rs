use kairos_rs::models::router::{Backend, Router};
use kairos_rs::utils::route_matcher::{RouteMatchError, RouteMatcher};

fn backend(host: &str, port: u16) -> Option<Vec<Backend>> {
    Some(vec![Backend {
        host: host.to_string(),
        port,
        weight: 1,
        health_check_path: None,
    }])
}

fn route(host: &str, port: u16, external: &str, internal: &str, methods: &[&str]) -> Router {
    Router {
        host: Some(host.to_string()),
        port: Some(port),
        backends: backend(host, port),
        load_balancing_strategy: Default::default(),
        external_path: external.to_string(),
        internal_path: internal.to_string(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
        auth_required: false,
        retry: None,
        health_check: None,
        breaker: None,
        sticky: None,
        proxy: None,
    }
}

/// Helper function to create test routes
fn create_test_routes() -> Vec<Router> {
    vec![
        route(
            "http://localhost",
            3000,
            "/api/identity/register/v3",
            "/api/identity/register",
            &["POST", "GET"],
        ),
        route(
            "https://google.com",
            443,
            "/identity/register/v2",
            "/",
            &["POST", "GET"],
        ),
        route("https://http.cat", 443, "/cats/:id", "/:id", &["GET"]),
        route(
            "http://api.example.com",
            80,
            "/api/users/:user_id",
            "/users/:user_id",
            &["GET", "PUT", "DELETE"],
        ),
        route(
            "http://api.example.com",
            80,
            "/api/products/:product_id/details",
            "/products/:product_id/info",
            &["GET"],
        ),
        route(
            "http://api.example.com",
            80,
            "/api/orders/:order_id/items/:item_id",
            "/orders/:order_id/items/:item_id",
            &["GET", "PUT"],
        ),
        route(
            "http://static.example.com",
            80,
            "/api/static/path",
            "/static",
            &["GET"],
        ),
        route(
            "http://static.example.com",
            80,
            "/api/static/path/details",
            "/static/details",
            &["GET"],
        ),
    ]
}

/// Create a route matcher for testing
fn create_route_matcher() -> RouteMatcher {
    RouteMatcher::new(create_test_routes()).expect("Failed to create route matcher")
}

#[cfg(test)]
mod route_matcher_tests {
    use super::*;

    #[test]
    fn test_new_route_matcher_creation() {
        let routes = create_test_routes();
        let matcher = RouteMatcher::new(routes).unwrap();

        let result = matcher.find_match("/api/identity/register/v3");
        assert!(result.is_ok());
    }

    #[test]
    fn test_static_route_matching() {
        let matcher = create_route_matcher();

        let result = matcher.find_match("/api/identity/register/v3");
        assert!(result.is_ok());

        let (route, internal_path) = result.unwrap();
        assert_eq!(route.external_path, "/api/identity/register/v3");
        assert_eq!(internal_path, "/api/identity/register");
        assert_eq!(route.host, Some("http://localhost".to_string()));
    }

    #[test]
    fn test_single_parameter_replacement() {
        let matcher = create_route_matcher();

        let result = matcher.find_match("/cats/200");
        assert!(result.is_ok());

        let (route, internal_path) = result.unwrap();
        assert_eq!(route.external_path, "/cats/:id");
        assert_eq!(internal_path, "/200");
        assert_eq!(route.host, Some("https://http.cat".to_string()));

        let result = matcher.find_match("/api/users/123");
        assert!(result.is_ok());

        let (route, internal_path) = result.unwrap();
        assert_eq!(route.external_path, "/api/users/:user_id");
        assert_eq!(internal_path, "/users/123");
    }

    #[test]
    fn test_multiple_parameter_replacement() {
        let matcher = create_route_matcher();

        let result = matcher.find_match("/api/orders/123/items/456");
        assert!(result.is_ok());

        let (route, internal_path) = result.unwrap();
        assert_eq!(route.external_path, "/api/orders/:order_id/items/:item_id");
        assert_eq!(internal_path, "/orders/123/items/456");
    }

    #[test]
    fn test_product_details_route() {
        let matcher = create_route_matcher();

        let result = matcher.find_match("/api/products/abc123/details");
        assert!(result.is_ok());

        let (route, internal_path) = result.unwrap();
        assert_eq!(route.external_path, "/api/products/:product_id/details");
        assert_eq!(internal_path, "/products/abc123/info");
    }

    #[test]
    fn test_non_matching_routes() {
        let matcher = create_route_matcher();

        let result = matcher.find_match("/api/nonexistent");
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), RouteMatchError::NoMatch { .. }));

        let result = matcher.find_match("/api/users");
        assert!(result.is_err());

        let result = matcher.find_match("/api/users/123/extra");
        assert!(result.is_err());
    }

    #[test]
    fn test_static_routes_priority() {
        let matcher = create_route_matcher();

        let result = matcher.find_match("/api/static/path");
        assert!(result.is_ok());

        let (route, internal_path) = result.unwrap();
        assert_eq!(route.external_path, "/api/static/path");
        assert_eq!(internal_path, "/static");

        let result = matcher.find_match("/api/static/path/details");
        assert!(result.is_ok());

        let (route, internal_path) = result.unwrap();
        assert_eq!(route.external_path, "/api/static/path/details");
        assert_eq!(internal_path, "/static/details");
    }

    #[test]
    fn test_edge_cases() {
        let matcher = create_route_matcher();

        let result = matcher.find_match("");
        assert!(result.is_err());

        let result = matcher.find_match("/");
        assert!(result.is_err());

        let result = matcher.find_match("/cats/test-123_abc");
        assert!(result.is_ok());
        let (_, internal_path) = result.unwrap();
        assert_eq!(internal_path, "/test-123_abc");

        let result = matcher.find_match("/cats/test%20space");
        assert!(result.is_ok());
        let (_, internal_path) = result.unwrap();
        assert_eq!(internal_path, "/test%20space");
    }

    #[test]
    fn test_invalid_route_patterns() {
        let invalid_routes = vec![
            // Empty parameter name
            route("http://localhost", 3000, "/api/users/:", "/users/:id", &["GET"]),
            // Non-alphanumeric character in parameter name
            route(
                "http://localhost",
                3000,
                "/api/users/:user id",
                "/users/:user_id",
                &["GET"],
            ),
            // Wildcard not in final segment
            route(
                "http://localhost",
                3000,
                "/api/*/users",
                "/users",
                &["GET"],
            ),
        ];

        for invalid_route in invalid_routes {
            let result = RouteMatcher::new(vec![invalid_route]);
            assert!(result.is_err());
            assert!(matches!(result.unwrap_err(), RouteMatchError::InvalidPattern { .. }));
        }
    }

    #[test]
    fn test_error_types() {
        let matcher = create_route_matcher();

        let result = matcher.find_match("/nonexistent");
        assert!(result.is_err());
        match result.unwrap_err() {
            RouteMatchError::NoMatch { path } => {
                assert_eq!(path, "/nonexistent");
            }
            _ => panic!("Expected NoMatch error"),
        }
    }
}

#[cfg(test)]
mod performance_tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_static_route_performance() {
        let matcher = create_route_matcher();
        let iterations = 10_000;

        let start = Instant::now();
        for _ in 0..iterations {
            let _ = matcher.find_match("/api/static/path");
        }
        let duration = start.elapsed();

        println!("Static route matching: {} iterations in {:?}", iterations, duration);
        assert!(duration.as_millis() < 100);
    }

    #[test]
    fn test_dynamic_route_performance() {
        let matcher = create_route_matcher();
        let iterations = 10_000;

        let start = Instant::now();
        for i in 0..iterations {
            let _ = matcher.find_match(&format!("/cats/{}", i));
        }
        let duration = start.elapsed();

        println!("Dynamic route matching: {} iterations in {:?}", iterations, duration);
        assert!(duration.as_millis() < 500);
    }

    #[test]
    fn test_complex_pattern_performance() {
        let matcher = create_route_matcher();
        let iterations = 10_000;

        let start = Instant::now();
        for i in 0..iterations {
            let _ = matcher.find_match(&format!("/api/orders/{}/items/{}", i, i * 2));
        }
        let duration = start.elapsed();

        println!("Complex pattern matching: {} iterations in {:?}", iterations, duration);
        assert!(duration.as_millis() < 1000);
    }
}
