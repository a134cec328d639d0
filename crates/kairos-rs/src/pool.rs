//! Target pool: the runtime state layer over a route's configured backends.
//!
//! A [`Backend`] is declarative configuration; a [`Target`] is the live
//! object the dispatcher and selector actually touch — active connection
//! count, latency EWMA, health, and an embedded circuit breaker.

use crate::models::router::{Backend, BreakerConfig};
use crate::services::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// A single backend server plus its live runtime state.
#[derive(Debug)]
pub struct Target {
    pub backend: Backend,
    /// `host:port`, stable identity used for metrics and breaker naming.
    pub key: String,
    pub active: AtomicU64,
    ewma_latency_ms: RwLock<f64>,
    pub healthy: AtomicBool,
    consecutive_successes: AtomicU32,
    consecutive_failures: AtomicU32,
    pub breaker: Arc<CircuitBreaker>,
}

const EWMA_ALPHA: f64 = 0.2;

impl Target {
    pub fn new(backend: Backend, breaker_config: CircuitBreakerConfig) -> Arc<Self> {
        let key = format!("{}:{}", backend.host, backend.port);
        Arc::new(Self {
            breaker: CircuitBreaker::new(key.clone(), breaker_config),
            key,
            backend,
            active: AtomicU64::new(0),
            ewma_latency_ms: RwLock::new(0.0),
            healthy: AtomicBool::new(true),
            consecutive_successes: AtomicU32::new(0),
            consecutive_failures: AtomicU32::new(0),
        })
    }

    pub fn weight(&self) -> u32 {
        self.backend.weight
    }

    pub fn active_count(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    pub fn incr_active(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decr_active(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_latency_ms(&self, sample: f64) {
        let mut guard = self.ewma_latency_ms.write().expect("ewma lock poisoned");
        *guard = if *guard == 0.0 {
            sample
        } else {
            EWMA_ALPHA * sample + (1.0 - EWMA_ALPHA) * *guard
        };
    }

    pub fn ewma_latency_ms(&self) -> f64 {
        *self.ewma_latency_ms.read().expect("ewma lock poisoned")
    }

    /// Eligible for selection: healthy, positive weight, breaker not open.
    pub fn is_eligible(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
            && self.backend.weight > 0
            && self.breaker.get_state() != CircuitState::Open
    }

    /// Records a successful health probe. Returns `true` if this probe
    /// transitioned the target from unhealthy to healthy.
    pub fn record_health_success(&self, healthy_threshold: u32) -> bool {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.healthy.load(Ordering::Relaxed) && successes >= healthy_threshold {
            self.healthy.store(true, Ordering::Relaxed);
            return true;
        }
        false
    }

    /// Records a failed health probe. Returns `true` if this probe
    /// transitioned the target from healthy to unhealthy.
    pub fn record_health_failure(&self, unhealthy_threshold: u32) -> bool {
        self.consecutive_successes.store(0, Ordering::Relaxed);
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if self.healthy.load(Ordering::Relaxed) && failures >= unhealthy_threshold {
            self.healthy.store(false, Ordering::Relaxed);
            return true;
        }
        false
    }
}

/// Copy-on-write collection of targets for a single route.
///
/// Reads take a snapshot `Arc<Vec<Arc<Target>>>` under a short-lived read
/// lock; reconfiguration replaces the whole vector atomically.
#[derive(Debug)]
pub struct TargetPool {
    targets: RwLock<Arc<Vec<Arc<Target>>>>,
}

impl TargetPool {
    pub fn new(targets: Vec<Arc<Target>>) -> Self {
        Self {
            targets: RwLock::new(Arc::new(targets)),
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<Arc<Target>>> {
        self.targets.read().expect("pool lock poisoned").clone()
    }

    pub fn replace(&self, targets: Vec<Arc<Target>>) {
        *self.targets.write().expect("pool lock poisoned") = Arc::new(targets);
    }

    pub fn eligible(&self) -> Vec<Arc<Target>> {
        self.snapshot()
            .iter()
            .filter(|t| t.is_eligible())
            .cloned()
            .collect()
    }

    pub fn find(&self, key: &str) -> Option<Arc<Target>> {
        self.snapshot().iter().find(|t| t.key == key).cloned()
    }
}

/// Builds the breaker config for a target from a route's optional override.
pub fn breaker_config_for(route_breaker: Option<&BreakerConfig>) -> CircuitBreakerConfig {
    match route_breaker {
        Some(cfg) => cfg.into(),
        None => CircuitBreakerConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(weight: u32) -> Backend {
        Backend {
            host: "http://backend".to_string(),
            port: 8080,
            weight,
            health_check_path: None,
        }
    }

    #[test]
    fn target_ineligible_when_unhealthy() {
        let target = Target::new(backend(1), CircuitBreakerConfig::default());
        assert!(target.is_eligible());
        target.healthy.store(false, Ordering::Relaxed);
        assert!(!target.is_eligible());
    }

    #[test]
    fn health_hysteresis_requires_consecutive_failures() {
        let target = Target::new(backend(1), CircuitBreakerConfig::default());
        assert!(!target.record_health_failure(2));
        assert!(target.is_eligible());
        assert!(target.record_health_failure(2));
        assert!(!target.is_eligible());
    }

    #[test]
    fn ewma_latency_converges_toward_samples() {
        let target = Target::new(backend(1), CircuitBreakerConfig::default());
        target.record_latency_ms(100.0);
        assert_eq!(target.ewma_latency_ms(), 100.0);
        target.record_latency_ms(200.0);
        assert!(target.ewma_latency_ms() > 100.0 && target.ewma_latency_ms() < 200.0);
    }

    #[test]
    fn pool_eligible_filters_unhealthy() {
        let healthy = Target::new(backend(1), CircuitBreakerConfig::default());
        let unhealthy = Target::new(backend(1), CircuitBreakerConfig::default());
        unhealthy.healthy.store(false, Ordering::Relaxed);
        let pool = TargetPool::new(vec![healthy.clone(), unhealthy]);
        let eligible = pool.eligible();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].key, healthy.key);
    }
}
