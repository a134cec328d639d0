//! The dispatcher: matches a route, selects a target from its pool, and
//! forwards the request upstream with timeout, retry, and circuit-breaker
//! protection.
//!
//! One [`crate::pool::TargetPool`] (plus, where configured, one
//! [`LoadBalancer`], [`HealthMonitor`], and [`SessionAffinityStore`]) is
//! built per route at startup. Selection consults sticky-session state
//! first, then falls back to the route's load balancing strategy over the
//! pool's currently eligible targets. A route's `proxy` config, if set, is
//! compiled once into a [`RequestTransformer`]/[`ResponseTransformer`] pair
//! and applied around the upstream call.

use crate::middleware::chain::RequestContext;
use crate::middleware::transform::{
    HeaderTransformation, RequestTransformation, RequestTransformer, ResponseTransformation, ResponseTransformer,
    TransformAction,
};
use crate::models::error::GatewayError;
use crate::models::router::{Router, StickySessionConfig};
use crate::pool::{breaker_config_for, Target, TargetPool};
use crate::routes::metrics::MetricsCollector;
use crate::services::circuit_breaker::{CircuitBreakerError, CircuitState};
use crate::services::client_ip::{extract_client_ip, ClientIpConfig};
use crate::services::health::HealthMonitor;
use crate::services::load_balancer::{LoadBalancer, LoadBalancerFactory};
use crate::services::session_affinity::SessionAffinityStore;
use crate::utils::path::format_route;
use crate::utils::route_matcher::RouteMatcher;

use actix_web::{
    http::{Method as ActixMethod, StatusCode},
    web, Error as ActixError, HttpMessage, HttpRequest, HttpResponse,
};
use log::{debug, info, warn};
use reqwest::{
    header::HeaderMap as ReqwestHeaderMap, header::HeaderName, header::HeaderValue, Client,
    Method as ReqwestMethod,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};

/// Hop-by-hop headers per RFC 7230 §6.1, stripped from both the outbound
/// request and the inbound response. `Host` and `Proxy-Connection` are
/// handled separately since they aren't in the strict RFC list but are
/// equally unsafe to forward verbatim.
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "proxy-connection",
];

fn is_hop_by_hop(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    HOP_BY_HOP_HEADERS.iter().any(|h| *h == lower)
}

fn is_safe_method(method: &ActixMethod) -> bool {
    matches!(*method, ActixMethod::GET | ActixMethod::HEAD | ActixMethod::OPTIONS)
}

/// Per-route runtime state: the pool plus whatever optional features
/// (load balancing beyond a single target, health checking, sticky
/// sessions) the route's configuration turned on.
struct RouteRuntime {
    pool: Arc<TargetPool>,
    load_balancer: Option<Arc<dyn LoadBalancer>>,
    sticky: Option<StickySessionConfig>,
    session_store: Option<Arc<SessionAffinityStore>>,
    _health_monitor: Option<Arc<HealthMonitor>>,
    request_transformer: Option<Arc<RequestTransformer>>,
    response_transformer: Option<Arc<ResponseTransformer>>,
    preserve_host: bool,
}

/// Builds the `RequestTransformer`/`ResponseTransformer` pair for a route's
/// `proxy` config. Returns `None` for a side that has nothing to do, so the
/// dispatcher can skip the transform entirely on the common unconfigured
/// path.
fn build_transformers(
    proxy: Option<&crate::models::router::ProxyConfig>,
) -> (Option<Arc<RequestTransformer>>, Option<Arc<ResponseTransformer>>, bool) {
    let Some(proxy) = proxy else {
        return (None, None, false);
    };

    let request_transformer = if proxy.headers_add.is_empty() && proxy.headers_remove.is_empty() && proxy.path_rewrite.is_none() {
        None
    } else {
        let mut headers: Vec<HeaderTransformation> = proxy
            .headers_add
            .iter()
            .map(|(name, value)| HeaderTransformation {
                action: TransformAction::Add,
                name: name.clone(),
                value: Some(value.clone()),
                pattern: None,
                replacement: None,
            })
            .collect();
        headers.extend(proxy.headers_remove.iter().map(|name| HeaderTransformation {
            action: TransformAction::Remove,
            name: name.clone(),
            value: None,
            pattern: None,
            replacement: None,
        }));
        Some(Arc::new(RequestTransformer::new(RequestTransformation {
            headers,
            path: proxy.path_rewrite.clone(),
            query_params: vec![],
        })))
    };

    let response_transformer = if proxy.response_headers_add.is_empty() && proxy.response_headers_remove.is_empty() {
        None
    } else {
        let mut headers: Vec<HeaderTransformation> = proxy
            .response_headers_add
            .iter()
            .map(|(name, value)| HeaderTransformation {
                action: TransformAction::Add,
                name: name.clone(),
                value: Some(value.clone()),
                pattern: None,
                replacement: None,
            })
            .collect();
        headers.extend(proxy.response_headers_remove.iter().map(|name| HeaderTransformation {
            action: TransformAction::Remove,
            name: name.clone(),
            value: None,
            pattern: None,
            replacement: None,
        }));
        Some(Arc::new(ResponseTransformer::new(ResponseTransformation {
            headers,
            status_code_mappings: vec![],
        })))
    };

    (request_transformer, response_transformer, proxy.preserve_host)
}

/// The gateway's request dispatcher: route matching, target selection, and
/// upstream forwarding with circuit-breaker and retry protection.
#[derive(Clone)]
pub struct RouteHandler {
    client: Client,
    route_matcher: Arc<RouteMatcher>,
    timeout_seconds: u64,
    runtimes: Arc<HashMap<String, RouteRuntime>>,
    client_ip_config: Arc<ClientIpConfig>,
}

impl RouteHandler {
    /// Builds the dispatcher from the gateway's route configuration:
    /// compiles the route matcher, and materializes one target pool (plus
    /// load balancer, health monitor, and session store as configured) per
    /// route.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kairos_rs::models::router::{Router, Backend};
    /// use kairos_rs::services::http::RouteHandler;
    ///
    /// let routes = vec![Router {
    ///     host: None,
    ///     port: None,
    ///     backends: Some(vec![Backend {
    ///         host: "http://backend".to_string(),
    ///         port: 8080,
    ///         weight: 1,
    ///         health_check_path: None,
    ///     }]),
    ///     load_balancing_strategy: Default::default(),
    ///     external_path: "/api/users/:id".to_string(),
    ///     internal_path: "/v1/user/:id".to_string(),
    ///     methods: vec!["GET".to_string()],
    ///     auth_required: false,
    ///     retry: None,
    ///     health_check: None,
    ///     breaker: None,
    ///     sticky: None,
    ///     proxy: None,
    /// }];
    ///
    /// let handler = RouteHandler::new(routes, 30);
    /// ```
    pub fn new(routes: Vec<Router>, timeout_seconds: u64) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(32)
            .build()
            .expect("Failed to create HTTP client");

        let route_matcher =
            Arc::new(RouteMatcher::new(routes.clone()).expect("Failed to create route matcher"));

        let mut runtimes = HashMap::new();

        for route in &routes {
            let backends = route.get_backends();
            if backends.is_empty() {
                continue;
            }
            let breaker_config = breaker_config_for(route.breaker.as_ref());
            let targets: Vec<Arc<Target>> = backends
                .iter()
                .map(|b| Target::new(b.clone(), breaker_config.clone()))
                .collect();
            let pool = Arc::new(TargetPool::new(targets));

            let load_balancer = if backends.len() > 1 {
                let lb = LoadBalancerFactory::create(&route.load_balancing_strategy);
                info!(
                    "created {:?} load balancer for route {} with {} backends",
                    route.load_balancing_strategy,
                    route.external_path,
                    backends.len()
                );
                Some(lb)
            } else {
                None
            };

            let health_monitor = route.health_check.clone().map(|hc| {
                let monitor = HealthMonitor::new(hc, pool.clone(), client.clone());
                monitor.clone().spawn();
                monitor
            });

            let session_store = route
                .sticky
                .as_ref()
                .map(|sticky| Arc::new(SessionAffinityStore::new(Duration::from_secs(sticky.ttl_secs))));
            if let Some(ref store) = session_store {
                store.spawn_sweeper(Duration::from_secs(300));
            }

            let (request_transformer, response_transformer, preserve_host) =
                build_transformers(route.proxy.as_ref());

            runtimes.insert(
                route.external_path.clone(),
                RouteRuntime {
                    pool,
                    load_balancer,
                    sticky: route.sticky.clone(),
                    session_store,
                    _health_monitor: health_monitor,
                    request_transformer,
                    response_transformer,
                    preserve_host,
                },
            );
        }

        Self {
            client,
            route_matcher,
            timeout_seconds,
            runtimes: Arc::new(runtimes),
            client_ip_config: Arc::new(ClientIpConfig::default()),
        }
    }

    /// Entry point called by the route handlers registered in
    /// [`crate::routes::auth_http`]. Wraps [`Self::handle_request_internal`]
    /// with connection/latency metrics collection.
    pub async fn handle_request(&self, req: HttpRequest, body: web::Bytes) -> Result<HttpResponse, ActixError> {
        let start_time = Instant::now();
        let metrics = req.app_data::<web::Data<MetricsCollector>>().cloned();
        let request_id = req.extensions().get::<RequestContext>().map(|ctx| ctx.request_id.clone());

        if let Some(ref metrics) = metrics {
            metrics.increment_connections();
        }

        let mut result = self.handle_request_internal(req, body).await;

        // The request id is already threaded through for successful
        // responses (see `build_headers_optimized`/the response header set
        // in the retry loop); for an error, rebuild it here so the JSON
        // body's `requestId` matches `X-Request-Id` instead of the fresh
        // UUID `GatewayError::error_response` falls back to when it has no
        // request in scope.
        if let (Err(err), Some(ref request_id)) = (&result, &request_id) {
            if let Some(gateway_error) = err.as_error::<GatewayError>() {
                result = Ok(gateway_error.error_response_with_request_id(request_id));
            }
        }

        if let Some(ref metrics) = metrics {
            let duration = start_time.elapsed();
            match &result {
                Ok(resp) => {
                    let success = resp.status().is_success();
                    let status_code = resp.status().as_u16();
                    metrics.record_request(success, duration, status_code, None, None);
                }
                Err(_) => {
                    metrics.record_request(false, duration, 500, None, None);
                }
            }
            metrics.decrement_connections();
        }

        result
    }

    async fn handle_request_internal(&self, req: HttpRequest, body: web::Bytes) -> Result<HttpResponse, ActixError> {
        let path = req.path().to_string();
        let method = req.method().clone();
        let reqwest_method = self.parse_method(&method);

        let (route, transformed_internal_path) = self.route_matcher.find_match(&path).map_err(|e| match e {
            crate::utils::route_matcher::RouteMatchError::NoMatch { path } => GatewayError::RouteNotFound { path },
            _ => GatewayError::Config {
                message: e.to_string(),
                route: path.clone(),
            },
        })?;

        if method != ActixMethod::OPTIONS && !route.methods.iter().any(|m| m == method.as_str()) {
            return Err(GatewayError::MethodNotAllowed {
                method: method.to_string(),
                path: path.clone(),
            }
            .into());
        }

        let runtime = self.runtimes.get(&route.external_path).ok_or_else(|| GatewayError::Config {
            message: "no target pool configured for route".to_string(),
            route: path.clone(),
        })?;

        let transformed_internal_path = match &runtime.request_transformer {
            Some(transformer) => transformer.transform_path(&transformed_internal_path),
            None => transformed_internal_path,
        };

        let client_ip = extract_client_ip(&req, &self.client_ip_config).map(|ip| ip.to_string());
        let request_id = req
            .extensions()
            .get::<RequestContext>()
            .map(|ctx| ctx.request_id.clone())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let scheme = req.connection_info().scheme().to_string();

        let reqwest_headers = self.build_headers_optimized(
            req.headers(),
            client_ip.as_deref(),
            &scheme,
            &request_id,
            runtime.request_transformer.as_deref(),
            runtime.preserve_host,
        );

        let retry_config = route.retry.clone();
        let idempotent = is_safe_method(&method);
        let max_attempts = match &retry_config {
            Some(cfg) => cfg.max_retries + 1,
            None if idempotent => 1,
            None => 1,
        };

        let mut last_err: Option<GatewayError> = None;

        for attempt in 0..max_attempts {
            let target = self.select_target(&req, &route, runtime, client_ip.as_deref(), &path)?;
            let target_url = format_route(&target.backend.host, &target.backend.port, &transformed_internal_path);

            if attempt > 0 {
                warn!("retry attempt {} for {}", attempt, target_url);
            } else {
                debug!("forwarding request to: {}", target_url);
            }

            target.incr_active();
            let dispatch_start = Instant::now();
            let forwarded_req = self
                .client
                .request(reqwest_method.clone(), &target_url)
                .body(body.to_vec())
                .headers(reqwest_headers.clone());

            let timeout_seconds = self.timeout_seconds;
            let target_url_for_error = target_url.clone();
            let result = target
                .breaker
                .call(async {
                    match timeout(Duration::from_secs(timeout_seconds), forwarded_req.send()).await {
                        Ok(Ok(resp)) => Ok(resp),
                        Ok(Err(e)) => Err(GatewayError::Upstream {
                            message: e.to_string(),
                            url: target_url_for_error.clone(),
                            status: None,
                        }),
                        Err(_) => Err(GatewayError::Timeout {
                            timeout: Duration::from_secs(timeout_seconds),
                        }),
                    }
                })
                .await;

            target.decr_active();
            target.record_latency_ms(dispatch_start.elapsed().as_secs_f64() * 1000.0);

            match result {
                Ok(response) => {
                    let status_code = response.status().as_u16();

                    if let Some(retry_cfg) = &retry_config {
                        if retry_cfg.retry_on_status_codes.contains(&status_code) && attempt < max_attempts - 1 {
                            warn!("retryable status {} from {}, attempt {}/{}", status_code, target_url, attempt + 1, max_attempts);
                            let backoff_ms = retry_cfg.calculate_backoff(attempt);
                            sleep(Duration::from_millis(backoff_ms)).await;
                            continue;
                        }
                    }

                    if let Some(ref sticky) = runtime.sticky {
                        if let Some(ref store) = runtime.session_store {
                            self.ensure_sticky_binding(&req, sticky, store, &target.key);
                        }
                    }

                    let mut builder = HttpResponse::build(StatusCode::from_u16(status_code).unwrap());
                    for (key, value) in response.headers() {
                        if is_hop_by_hop(key.as_str()) {
                            continue;
                        }
                        if let Ok(header_value) = actix_web::http::header::HeaderValue::from_bytes(value.as_bytes()) {
                            builder.insert_header((key.as_str(), header_value));
                        }
                    }
                    if let Some(transformer) = &runtime.response_transformer {
                        transformer.transform_headers(builder.headers_mut());
                    }
                    if let Ok(value) = actix_web::http::header::HeaderValue::from_str(&request_id) {
                        builder.insert_header((actix_web::http::header::HeaderName::from_static("x-request-id"), value));
                    }

                    return match response.bytes().await {
                        Ok(bytes) => Ok(builder.body(bytes)),
                        Err(e) => Err(GatewayError::Upstream {
                            message: e.to_string(),
                            url: target_url,
                            status: None,
                        }
                        .into()),
                    };
                }
                Err(CircuitBreakerError::CircuitOpen) => {
                    warn!("circuit breaker open for {}", target.key);
                    last_err = Some(GatewayError::CircuitOpen { service: target.key.clone() });
                    if attempt < max_attempts - 1 {
                        continue;
                    }
                }
                Err(CircuitBreakerError::OperationFailed(gateway_error)) => {
                    let retryable = idempotent
                        || retry_config.as_ref().map(|c| c.retry_on_connection_error).unwrap_or(false);
                    if retryable && attempt < max_attempts - 1 {
                        warn!("connection error to {}, retrying (attempt {}/{})", target_url, attempt + 1, max_attempts);
                        let backoff_ms = retry_config
                            .as_ref()
                            .map(|c| c.calculate_backoff(attempt))
                            .unwrap_or(100);
                        sleep(Duration::from_millis(backoff_ms)).await;
                        last_err = Some(gateway_error);
                        continue;
                    }
                    return Err(gateway_error.into());
                }
            }
        }

        Err(last_err
            .unwrap_or(GatewayError::Upstream {
                message: format!("all {} attempt(s) exhausted", max_attempts),
                url: path,
                status: None,
            })
            .into())
    }

    /// Picks a target for this dispatch attempt: sticky session binding
    /// first (if the route has one and it still points at an eligible
    /// target), otherwise the route's load-balancing strategy (or the sole
    /// target, if there's only one) over the pool's eligible set.
    fn select_target(
        &self,
        req: &HttpRequest,
        route: &Router,
        runtime: &RouteRuntime,
        client_ip: Option<&str>,
        path: &str,
    ) -> Result<Arc<Target>, ActixError> {
        if let Some(ref sticky) = runtime.sticky {
            if let Some(ref store) = runtime.session_store {
                if let Some(session_id) = self.sticky_session_id(req, sticky) {
                    if let Some(target_key) = store.lookup(&session_id) {
                        if let Some(target) = runtime.pool.find(&target_key) {
                            if target.is_eligible() {
                                return Ok(target);
                            }
                        }
                    }
                }
            }
        }

        let eligible = runtime.pool.eligible();
        if eligible.is_empty() {
            return Err(GatewayError::NoHealthyUpstream { route: path.to_string() }.into());
        }

        let target = if eligible.len() == 1 {
            eligible[0].clone()
        } else if let Some(lb) = &runtime.load_balancer {
            lb.select(&eligible, client_ip).ok_or_else(|| GatewayError::NoHealthyUpstream { route: path.to_string() })?
        } else {
            eligible[0].clone()
        };

        let _ = route;
        Ok(target)
    }

    /// Reads the sticky-session id from the configured cookie, if the
    /// incoming request carries one. Returns `None` when absent, which
    /// `select_target` treats as "no existing binding" and falls back to
    /// normal load-balancer selection.
    fn sticky_session_id(&self, req: &HttpRequest, sticky: &StickySessionConfig) -> Option<String> {
        req.cookie(&sticky.cookie_name).map(|c| c.value().to_string())
    }

    fn ensure_sticky_binding(
        &self,
        req: &HttpRequest,
        sticky: &StickySessionConfig,
        store: &Arc<SessionAffinityStore>,
        target_key: &str,
    ) {
        let session_id = req
            .cookie(&sticky.cookie_name)
            .map(|c| c.value().to_string())
            .unwrap_or_else(SessionAffinityStore::generate_session_id);
        store.bind(session_id, target_key.to_string());
    }

    /// Converts and filters headers for upstream forwarding, stripping
    /// hop-by-hop headers and adding the standard proxy headers
    /// (`X-Forwarded-For`, `X-Forwarded-Proto`, `X-Request-Id`). Applies the
    /// route's `proxy.headersAdd`/`headersRemove` rules (via `transformer`)
    /// before hop-by-hop stripping, and re-adds the original `Host` header
    /// afterward when `preserve_host` is set.
    fn build_headers_optimized(
        &self,
        original_headers: &actix_web::http::header::HeaderMap,
        client_ip: Option<&str>,
        scheme: &str,
        request_id: &str,
        transformer: Option<&RequestTransformer>,
        preserve_host: bool,
    ) -> ReqwestHeaderMap {
        let mut source_headers = original_headers.clone();
        if let Some(transformer) = transformer {
            transformer.transform_headers(&mut source_headers);
        }

        let mut reqwest_headers = ReqwestHeaderMap::with_capacity(source_headers.len() + 3);

        for (key, value) in source_headers.iter() {
            if is_hop_by_hop(key.as_str()) {
                continue;
            }
            if let (Ok(header_name), Ok(header_value)) =
                (HeaderName::from_bytes(key.as_ref()), HeaderValue::from_bytes(value.as_bytes()))
            {
                reqwest_headers.insert(header_name, header_value);
            }
        }

        reqwest_headers
            .entry("user-agent")
            .or_insert_with(|| HeaderValue::from_static("kairos-rs/0.2.0"));

        if let Some(ip) = client_ip {
            let forwarded_for = match reqwest_headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{existing}, {ip}"),
                None => ip.to_string(),
            };
            if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
                reqwest_headers.insert("x-forwarded-for", value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(scheme) {
            reqwest_headers.insert("x-forwarded-proto", value);
        }
        if let Ok(value) = HeaderValue::from_str(request_id) {
            reqwest_headers.insert("x-request-id", value);
        }

        if preserve_host {
            if let Some(host_value) = original_headers.get(actix_web::http::header::HOST) {
                if let Ok(value) = HeaderValue::from_bytes(host_value.as_bytes()) {
                    reqwest_headers.insert("host", value);
                }
            }
        }

        reqwest_headers
    }

    fn parse_method(&self, method: &ActixMethod) -> ReqwestMethod {
        match method {
            &ActixMethod::GET => ReqwestMethod::GET,
            &ActixMethod::POST => ReqwestMethod::POST,
            &ActixMethod::PUT => ReqwestMethod::PUT,
            &ActixMethod::DELETE => ReqwestMethod::DELETE,
            &ActixMethod::HEAD => ReqwestMethod::HEAD,
            &ActixMethod::OPTIONS => ReqwestMethod::OPTIONS,
            &ActixMethod::CONNECT => ReqwestMethod::CONNECT,
            &ActixMethod::PATCH => ReqwestMethod::PATCH,
            &ActixMethod::TRACE => ReqwestMethod::TRACE,
            _ => ReqwestMethod::GET,
        }
    }

    /// Snapshot of every target's circuit state, failure count, and
    /// in-flight active requests, for `/metrics` and `/admin` exposure.
    pub fn get_circuit_breaker_states(&self) -> HashMap<String, (CircuitState, u64, u64)> {
        let mut states = HashMap::new();
        for runtime in self.runtimes.values() {
            for target in runtime.pool.snapshot().iter() {
                states.insert(
                    target.key.clone(),
                    (target.breaker.get_state(), target.breaker.get_failure_count(), target.active_count()),
                );
            }
        }
        states
    }

    /// Snapshot of every target's EWMA latency, for `/metrics` exposure.
    pub fn get_target_latencies(&self) -> HashMap<String, f64> {
        let mut latencies = HashMap::new();
        for runtime in self.runtimes.values() {
            for target in runtime.pool.snapshot().iter() {
                latencies.insert(target.key.clone(), target.ewma_latency_ms());
            }
        }
        latencies
    }
}
