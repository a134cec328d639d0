//! Circuit breaker implementation for upstream service protection.
//!
//! This module provides a circuit breaker pattern implementation to protect
//! upstream services from cascading failures and provide fast failure responses
//! when services are unavailable.

use crate::clock::{Clock, SystemClock};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// State of a circuit breaker.
///
/// # States
///
/// * `Closed` - Normal operation, all requests pass through
/// * `Open` - Circuit tripped, requests fail fast without executing
/// * `HalfOpen` - Testing recovery, a bounded number of probes allowed through
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    /// Normal operation - requests pass through
    Closed = 0,
    /// Circuit is open - failing fast
    Open = 1,
    /// Testing if service is back
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

/// Configuration parameters for circuit breaker behavior.
///
/// * `failure_threshold` - Consecutive failures to open the circuit (default: 5)
/// * `reset_timeout` - Time to wait before transitioning from Open to HalfOpen (default: 30s)
/// * `half_open_max_probes` - Maximum concurrent probes admitted while
///   HalfOpen; the breaker closes on the first probe success and reopens on
///   any probe failure (default: 1)
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u64,
    pub reset_timeout: Duration,
    pub half_open_max_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            half_open_max_probes: 1,
        }
    }
}

impl From<&crate::models::router::BreakerConfig> for CircuitBreakerConfig {
    fn from(cfg: &crate::models::router::BreakerConfig) -> Self {
        Self {
            failure_threshold: cfg.failure_threshold,
            reset_timeout: Duration::from_millis(cfg.reset_timeout_ms),
            half_open_max_probes: cfg.half_open_max_probes,
        }
    }
}

/// Circuit breaker implementation for protecting upstream services.
///
/// # Thread Safety
///
/// All operations are thread-safe using atomic operations and async RwLock.
/// Multiple concurrent requests can safely interact with the same circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: AtomicU8,
    failure_count: AtomicU64,
    /// Count of in-flight probes while HalfOpen; gates admission against
    /// `half_open_max_probes`.
    in_flight_probes: AtomicU32,
    last_failure_time: RwLock<Option<std::time::Instant>>,
    clock: Arc<dyn Clock>,
    name: String,
}

impl CircuitBreaker {
    /// Creates a new circuit breaker instance using the system clock.
    pub fn new(name: String, config: CircuitBreakerConfig) -> Arc<Self> {
        Self::new_with_clock(name, config, Arc::new(SystemClock))
    }

    /// Creates a new circuit breaker with an injected clock, for deterministic tests.
    pub fn new_with_clock(name: String, config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            failure_count: AtomicU64::new(0),
            in_flight_probes: AtomicU32::new(0),
            last_failure_time: RwLock::new(None),
            clock,
            name,
        })
    }

    /// Executes an operation with circuit breaker protection.
    ///
    /// Wraps the provided async operation with circuit breaker logic. If the
    /// circuit is open, or HalfOpen and already at its probe limit, fails
    /// fast without executing the operation.
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        let admitted = self.try_admit().await;
        if !admitted {
            debug!("circuit breaker {} is open, failing fast", self.name);
            return Err(CircuitBreakerError::CircuitOpen);
        }

        let was_half_open = CircuitState::from(self.state.load(Ordering::Relaxed)) == CircuitState::HalfOpen;

        match operation.await {
            Ok(result) => {
                self.on_success(was_half_open).await;
                Ok(result)
            }
            Err(error) => {
                self.on_failure(was_half_open).await;
                Err(CircuitBreakerError::OperationFailed(error))
            }
        }
    }

    /// Decides whether a request may proceed, transitioning Open -> HalfOpen
    /// once `reset_timeout` has elapsed and reserving a probe slot if so.
    async fn try_admit(&self) -> bool {
        loop {
            let current_state = CircuitState::from(self.state.load(Ordering::Relaxed));
            match current_state {
                CircuitState::Closed => return true,
                CircuitState::Open => {
                    let should_probe = match *self.last_failure_time.read().await {
                        Some(last_failure) => self.clock.now().duration_since(last_failure) >= self.config.reset_timeout,
                        None => false,
                    };
                    if !should_probe {
                        return false;
                    }
                    self.transition_to_half_open().await;
                    // loop again, now HalfOpen, to acquire a probe slot
                }
                CircuitState::HalfOpen => {
                    let reserved = self.in_flight_probes.fetch_add(1, Ordering::Relaxed) + 1;
                    if reserved <= self.config.half_open_max_probes {
                        return true;
                    }
                    self.in_flight_probes.fetch_sub(1, Ordering::Relaxed);
                    return false;
                }
            }
        }
    }

    async fn on_success(&self, was_half_open: bool) {
        if was_half_open {
            self.in_flight_probes.fetch_sub(1, Ordering::Relaxed);
            self.transition_to_closed().await;
        } else {
            self.failure_count.store(0, Ordering::Relaxed);
        }
    }

    async fn on_failure(&self, was_half_open: bool) {
        if was_half_open {
            self.in_flight_probes.fetch_sub(1, Ordering::Relaxed);
            self.transition_to_open().await;
            return;
        }

        let current_state = CircuitState::from(self.state.load(Ordering::Relaxed));
        match current_state {
            CircuitState::Closed => {
                let failure_count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
                if failure_count >= self.config.failure_threshold {
                    self.transition_to_open().await;
                }
            }
            CircuitState::Open => {
                *self.last_failure_time.write().await = Some(self.clock.now());
            }
            CircuitState::HalfOpen => unreachable!("handled above via was_half_open"),
        }
    }

    async fn transition_to_open(&self) {
        self.state.store(CircuitState::Open as u8, Ordering::Relaxed);
        *self.last_failure_time.write().await = Some(self.clock.now());
        self.in_flight_probes.store(0, Ordering::Relaxed);
        warn!("circuit breaker {} opened due to failures", self.name);
    }

    async fn transition_to_half_open(&self) {
        self.state.store(CircuitState::HalfOpen as u8, Ordering::Relaxed);
        self.in_flight_probes.store(0, Ordering::Relaxed);
        info!("circuit breaker {} transitioned to half-open", self.name);
    }

    async fn transition_to_closed(&self) {
        self.state.store(CircuitState::Closed as u8, Ordering::Relaxed);
        self.failure_count.store(0, Ordering::Relaxed);
        self.in_flight_probes.store(0, Ordering::Relaxed);
        info!("circuit breaker {} closed - service recovered", self.name);
    }

    /// Gets the current state of the circuit breaker.
    pub fn get_state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Relaxed))
    }

    /// Gets the current failure count in the Closed state.
    pub fn get_failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// Gets the number of in-flight HalfOpen probes.
    pub fn get_in_flight_probes(&self) -> u32 {
        self.in_flight_probes.load(Ordering::Relaxed)
    }
}

/// Errors that can occur when using a circuit breaker.
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    #[error("Circuit breaker is open")]
    CircuitOpen,
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}
