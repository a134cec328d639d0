use crate::models::router::Router;
use ahash::HashMap as AHashMap;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;

/// Error types that can occur during route matching operations.
///
/// These errors represent issues with route pattern compilation, validation,
/// or matching that prevent the gateway from properly routing requests.
#[derive(Error, Debug, PartialEq)]
pub enum RouteMatchError {
    /// The route pattern contains invalid syntax or unsupported constructs.
    ///
    /// This occurs when route patterns have malformed parameter syntax,
    /// invalid characters, or other structural issues.
    #[error("Invalid route pattern: {pattern}")]
    InvalidPattern {
        /// The invalid route pattern that caused the error
        pattern: String,
    },

    /// Failed to compile the route pattern into a valid regular expression.
    ///
    /// This happens when the generated regex is syntactically invalid,
    /// which typically indicates a bug in pattern conversion logic.
    #[error("Regex compilation failed: {0}")]
    RegexError(String),

    /// No configured route matches the requested path.
    ///
    /// This occurs during request processing when the incoming path
    /// doesn't match any static or dynamic route patterns. Maps to a 404.
    #[error("No matching route found for path: {path}")]
    NoMatch {
        /// The requested path that couldn't be matched
        path: String,
    },
}

/// A pre-compiled route pattern optimized for high-performance matching.
///
/// Supports two kinds of dynamic segments:
/// - `:name` — matches exactly one path segment, captured as `name`
/// - `*` — matches the remainder of the path (must be the final segment),
///   captured positionally as `tail`
///
/// # Examples
///
/// ```text
/// Pattern: "/api/users/:id/posts/:post_id"
/// Regex:   "^/api/users/([^/]+)/posts/([^/]+)$"
/// Params:  ["id", "post_id"]
///
/// Pattern: "/static/*"
/// Regex:   "^/static/(.*)$"
/// Params:  ["tail"]
/// ```
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    /// The original router configuration for this route
    pub router: Router,
    /// Compiled regular expression for path matching (Arc for thread-safe sharing)
    pub regex: Arc<Regex>,
    /// Ordered list of parameter names extracted from the pattern
    pub param_names: Vec<String>,
}

/// High-performance route matcher with optimized lookup strategies.
///
/// The `RouteMatcher` provides efficient route resolution by separating static
/// and dynamic routes into different data structures optimized for their use cases:
///
/// - **Static routes**: Stored in a hash map for O(1) lookup
/// - **Dynamic routes**: Compiled to regex patterns and sorted by specificity
///
/// Static routes are always tried before dynamic ones, and among dynamic
/// routes, patterns with more `:param`/`*` segments lose to patterns with
/// fewer — a literal path segment is preferred over a wildcard one wherever
/// both could match.
///
/// # Thread Safety
///
/// All fields are immutable after construction, making the matcher safe to
/// share across multiple worker threads without synchronization overhead.
#[derive(Debug)]
pub struct RouteMatcher {
    /// Hash map for O(1) static route lookups using ahash for better performance
    static_routes: AHashMap<String, Router>,
    /// Vector of compiled dynamic routes sorted by specificity (most specific first)
    dynamic_routes: Vec<CompiledRoute>,
}

impl RouteMatcher {
    /// Creates a new route matcher with pre-compiled patterns for optimal performance.
    ///
    /// Separates static routes (no `:param`/`*` segments) from dynamic ones,
    /// compiles the dynamic patterns to regex, and sorts them so the most
    /// specific pattern (fewest wildcard segments) is tried first.
    ///
    /// # Errors
    ///
    /// Returns `RouteMatchError::InvalidPattern` if a `*` wildcard appears
    /// anywhere but the final path segment, or a `:name` segment is empty.
    pub fn new(routes: Vec<Router>) -> Result<Self, RouteMatchError> {
        let mut static_routes = AHashMap::default();
        let mut dynamic_routes = Vec::with_capacity(routes.len());

        for route in routes {
            if Self::is_dynamic(&route.external_path) {
                let compiled = Self::compile_route(route)?;
                dynamic_routes.push(compiled);
            } else {
                static_routes.insert(route.external_path.clone(), route);
            }
        }

        // Fewer wildcard segments = more specific = tried first.
        dynamic_routes.sort_by_key(|r| r.param_names.len());

        Ok(Self {
            static_routes,
            dynamic_routes,
        })
    }

    fn is_dynamic(pattern: &str) -> bool {
        pattern.split('/').any(|seg| seg.starts_with(':') || seg == "*")
    }

    /// Finds a matching route for the given request path and returns the transformed internal path.
    ///
    /// Static routes are checked first via O(1) hash lookup; only on a miss
    /// are dynamic routes tried in specificity order. `OPTIONS` requests are
    /// matched the same as any other method here — CORS preflight bypass is
    /// handled one layer up, before routing.
    pub fn find_match(&self, request_path: &str) -> Result<(Router, String), RouteMatchError> {
        if let Some(route) = self.static_routes.get(request_path) {
            return Ok((route.clone(), route.internal_path.clone()));
        }

        for compiled_route in &self.dynamic_routes {
            if let Some(captures) = compiled_route.regex.captures(request_path) {
                let transformed_path = Self::transform_internal_path(
                    &compiled_route.router.internal_path,
                    &compiled_route.param_names,
                    &captures,
                );
                return Ok((compiled_route.router.clone(), transformed_path));
            }
        }

        Err(RouteMatchError::NoMatch {
            path: request_path.to_string(),
        })
    }

    fn compile_route(route: Router) -> Result<CompiledRoute, RouteMatchError> {
        let param_names = Self::extract_parameter_names(&route.external_path)?;
        let regex_pattern = Self::convert_pattern_to_regex(&route.external_path)?;
        let regex =
            Regex::new(&regex_pattern).map_err(|e| RouteMatchError::RegexError(e.to_string()))?;

        Ok(CompiledRoute {
            router: route,
            regex: Arc::new(regex),
            param_names,
        })
    }

    /// Converts a `:param`/`*` route pattern to an anchored regex pattern.
    fn convert_pattern_to_regex(pattern: &str) -> Result<String, RouteMatchError> {
        let segments: Vec<&str> = pattern.split('/').collect();
        let mut regex_pattern = String::with_capacity(pattern.len() * 2);
        regex_pattern.push('^');

        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                regex_pattern.push('/');
            }
            if *segment == "*" {
                if i != segments.len() - 1 {
                    return Err(RouteMatchError::InvalidPattern {
                        pattern: pattern.to_string(),
                    });
                }
                regex_pattern.push_str("(.*)");
            } else if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    return Err(RouteMatchError::InvalidPattern {
                        pattern: pattern.to_string(),
                    });
                }
                regex_pattern.push_str("([^/]+)");
            } else {
                for ch in segment.chars() {
                    match ch {
                        '.' | '?' | '+' | '^' | '$' | '[' | ']' | '(' | ')' | '|' | '\\' => {
                            regex_pattern.push('\\');
                            regex_pattern.push(ch);
                        }
                        _ => regex_pattern.push(ch),
                    }
                }
            }
        }

        regex_pattern.push('$');
        Ok(regex_pattern)
    }

    /// Extracts parameter names in order. A `*` wildcard is named `tail`.
    fn extract_parameter_names(pattern: &str) -> Result<Vec<String>, RouteMatchError> {
        let mut names = Vec::new();
        for segment in pattern.split('/') {
            if segment == "*" {
                names.push("tail".to_string());
            } else if let Some(name) = segment.strip_prefix(':') {
                if name.is_empty() {
                    return Err(RouteMatchError::InvalidPattern {
                        pattern: pattern.to_string(),
                    });
                }
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Substitutes captured parameter values into the internal path template,
    /// which uses the same `:name` placeholder syntax as external paths.
    fn transform_internal_path(
        internal_pattern: &str,
        param_names: &[String],
        captures: &regex::Captures,
    ) -> String {
        let mut result = internal_pattern.to_string();

        for (i, param_name) in param_names.iter().enumerate() {
            if let Some(capture) = captures.get(i + 1) {
                let placeholder = format!(":{}", param_name);
                result = result.replace(&placeholder, capture.as_str());
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::router::Backend;

    fn route(external: &str, internal: &str) -> Router {
        Router {
            host: Some("http://backend".to_string()),
            port: Some(8080),
            external_path: external.to_string(),
            internal_path: internal.to_string(),
            methods: vec!["GET".to_string()],
            auth_required: false,
            backends: Some(vec![Backend {
                host: "http://backend".to_string(),
                port: 8080,
                weight: 1,
                health_check_path: None,
            }]),
            load_balancing_strategy: Default::default(),
            retry: None,
            health_check: None,
            breaker: None,
            sticky: None,
            proxy: None,
        }
    }

    #[test]
    fn static_route_matches_exactly() {
        let matcher = RouteMatcher::new(vec![route("/health", "/status")]).unwrap();
        let (_, internal) = matcher.find_match("/health").unwrap();
        assert_eq!(internal, "/status");
    }

    #[test]
    fn colon_param_is_extracted_and_substituted() {
        let matcher =
            RouteMatcher::new(vec![route("/users/:id", "/v1/user/:id")]).unwrap();
        let (_, internal) = matcher.find_match("/users/123").unwrap();
        assert_eq!(internal, "/v1/user/123");
    }

    #[test]
    fn wildcard_matches_remainder_of_path() {
        let matcher = RouteMatcher::new(vec![route("/static/*", "/assets/*")]).unwrap();
        let (_, internal) = matcher.find_match("/static/css/app.css").unwrap();
        assert_eq!(internal, "/assets/css/app.css");
    }

    #[test]
    fn literal_route_wins_over_overlapping_wildcard() {
        let matcher = RouteMatcher::new(vec![
            route("/users/:id", "/v1/user/:id"),
            route("/users/me", "/v1/user/me"),
        ])
        .unwrap();
        let (_, internal) = matcher.find_match("/users/me").unwrap();
        assert_eq!(internal, "/v1/user/me");
    }

    #[test]
    fn wildcard_not_in_final_position_is_rejected() {
        let err = RouteMatcher::new(vec![route("/a/*/b", "/a/*/b")]).unwrap_err();
        assert!(matches!(err, RouteMatchError::InvalidPattern { .. }));
    }

    #[test]
    fn unmatched_path_is_no_match() {
        let matcher = RouteMatcher::new(vec![route("/health", "/status")]).unwrap();
        let err = matcher.find_match("/nope").unwrap_err();
        assert!(matches!(err, RouteMatchError::NoMatch { .. }));
    }
}
