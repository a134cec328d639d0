//! Active health checking for pool targets.
//!
//! Probes run on a fixed interval per route, one in flight per target at a
//! time. `in_flight` (keyed by target id) is how that's enforced: a round
//! that finds an entry already there skips the target rather than stacking
//! a second probe on top of it. The stored generation lets a probe tell,
//! after its own await completes, whether it's still the one that owns the
//! slot — the same stale-read guard `config::hot_reload::ConfigWatcher`
//! uses to ignore late file-watch reads.

use crate::models::router::HealthCheckConfig;
use crate::pool::TargetPool;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Periodically probes every target in a pool and flips health state with
/// hysteresis, per [`HealthCheckConfig`].
#[derive(Debug)]
pub struct HealthMonitor {
    config: HealthCheckConfig,
    pool: Arc<TargetPool>,
    client: reqwest::Client,
    generation: AtomicU64,
    /// Generation of the probe currently in flight for a given target id.
    /// Absence means no probe is outstanding for that target.
    in_flight: DashMap<String, u64>,
}

impl HealthMonitor {
    pub fn new(config: HealthCheckConfig, pool: Arc<TargetPool>, client: reqwest::Client) -> Arc<Self> {
        Arc::new(Self {
            config,
            pool,
            client,
            generation: AtomicU64::new(0),
            in_flight: DashMap::new(),
        })
    }

    /// Spawns the background polling loop. Returns the task handle so the
    /// caller can abort it on shutdown or reconfiguration.
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(self.config.interval_ms));
            loop {
                interval.tick().await;
                self.clone().run_probe_round().await;
            }
        })
    }

    async fn run_probe_round(self: Arc<Self>) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let targets = self.pool.snapshot();
        for target in targets.iter() {
            let Some(path) = target.backend.health_check_path.clone() else {
                continue;
            };

            match self.in_flight.entry(target.key.clone()) {
                Entry::Occupied(_) => {
                    debug!("skipping health probe for {}: previous probe still in flight", target.key);
                    continue;
                }
                Entry::Vacant(slot) => {
                    slot.insert(generation);
                }
            }

            let url = format!("{}:{}{}", target.backend.host, target.backend.port, path);
            let client = self.client.clone();
            let timeout = Duration::from_millis(self.config.timeout_ms);
            let target = target.clone();
            let healthy_threshold = self.config.healthy_threshold;
            let unhealthy_threshold = self.config.unhealthy_threshold;
            let monitor = self.clone();

            tokio::spawn(async move {
                let result = tokio::time::timeout(timeout, client.get(&url).send()).await;

                // Only a round that still owns the slot applies its result;
                // a newer round would have overwritten the generation.
                let still_current = monitor
                    .in_flight
                    .get(&target.key)
                    .map(|g| *g == generation)
                    .unwrap_or(false);
                monitor.in_flight.remove_if(&target.key, |_, g| *g == generation);
                if !still_current {
                    debug!("discarding stale health probe for {}", target.key);
                    return;
                }

                let succeeded = matches!(result, Ok(Ok(resp)) if resp.status().is_success());
                if succeeded {
                    if target.record_health_success(healthy_threshold) {
                        info!("target {} marked healthy", target.key);
                    }
                } else if target.record_health_failure(unhealthy_threshold) {
                    warn!("target {} marked unhealthy", target.key);
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::router::Backend;
    use crate::pool::Target;
    use crate::services::circuit_breaker::CircuitBreakerConfig;

    fn health_config() -> HealthCheckConfig {
        HealthCheckConfig {
            path: "/health".to_string(),
            interval_ms: 50,
            timeout_ms: 50,
            healthy_threshold: 1,
            unhealthy_threshold: 1,
        }
    }

    #[tokio::test]
    async fn probe_round_against_unreachable_target_marks_unhealthy() {
        let backend = Backend {
            host: "http://127.0.0.1".to_string(),
            port: 1, // nothing listens here
            weight: 1,
            health_check_path: Some("/health".to_string()),
        };
        let target = Target::new(backend, CircuitBreakerConfig::default());
        let pool = Arc::new(TargetPool::new(vec![target.clone()]));
        let monitor = HealthMonitor::new(health_config(), pool.clone(), reqwest::Client::new());

        monitor.run_probe_round().await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!target.is_eligible());
    }

    #[tokio::test]
    async fn disabled_health_check_path_never_probed() {
        let backend = Backend {
            host: "http://127.0.0.1".to_string(),
            port: 1,
            weight: 1,
            health_check_path: None,
        };
        let target = Target::new(backend, CircuitBreakerConfig::default());
        let pool = Arc::new(TargetPool::new(vec![target.clone()]));
        let monitor = HealthMonitor::new(health_config(), pool.clone(), reqwest::Client::new());

        monitor.run_probe_round().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(target.is_eligible());
    }
}
