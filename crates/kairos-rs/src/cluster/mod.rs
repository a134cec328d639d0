//! Cluster supervisor: spawns `workers` child processes sharing the
//! listening address, restarting crashed workers under a bounded policy.
//!
//! This is a contract-level implementation of `spec.md` §4.8's "optional
//! outer layer" — the real multi-process fan-out (OS-level port reuse) is
//! the host platform's concern, so the supervisor here manages children via
//! `tokio::process::Command`, re-execing the current binary with
//! `CLUSTER_WORKER=1` and `CLUSTER_WORKER_ID=<n>` set. The restart-budget and
//! backoff arithmetic is pure and `Clock`-driven, so it is unit-tested
//! without spawning anything.

use log::{info, warn};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::clock::Clock;

/// `CLUSTER_WORKER` is set to this value on every spawned worker.
pub const CLUSTER_WORKER_ENV: &str = "CLUSTER_WORKER";
/// `CLUSTER_WORKER_ID` identifies the worker slot, 0-indexed.
pub const CLUSTER_WORKER_ID_ENV: &str = "CLUSTER_WORKER_ID";

/// Returns `true` when the current process was spawned as a cluster worker.
pub fn is_worker_process() -> bool {
    std::env::var(CLUSTER_WORKER_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub workers: usize,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// Restarts allowed per worker within `respawn_threshold_window`.
    pub respawn_threshold: u32,
    pub respawn_threshold_window: Duration,
    /// Lifetime cap on restarts for a single worker slot.
    pub max_restarts: u32,
    /// Delay between spawning a replacement and terminating the old worker
    /// during a rolling restart.
    pub settle_delay: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            respawn_threshold: 5,
            respawn_threshold_window: Duration::from_secs(60),
            max_restarts: 100,
            settle_delay: Duration::from_millis(500),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// Exponential backoff with jitter, capped at `max`. Jitter is up to half of
/// `base`, so repeated restarts at the cap don't all land on the same tick.
pub fn backoff_delay(attempt: u32, base: Duration, max: Duration, jitter_fraction: f64) -> Duration {
    let shift = attempt.min(20);
    let multiplier = 1u64.checked_shl(shift).unwrap_or(u64::MAX);
    let exp = base.checked_mul(multiplier as u32).unwrap_or(max);
    let capped = exp.min(max);
    let jitter = base.mul_f64(0.5 * jitter_fraction.clamp(0.0, 1.0));
    capped + jitter
}

/// Tracks how many times a single worker slot has restarted, enforcing both
/// a sliding-window rate and a lifetime cap.
pub struct RestartBudget {
    clock: std::sync::Arc<dyn Clock>,
    window: Duration,
    threshold: u32,
    max_restarts: u32,
    lifetime_restarts: u32,
    restart_times: VecDeque<Instant>,
}

impl RestartBudget {
    pub fn new(clock: std::sync::Arc<dyn Clock>, window: Duration, threshold: u32, max_restarts: u32) -> Self {
        Self {
            clock,
            window,
            threshold,
            max_restarts,
            lifetime_restarts: 0,
            restart_times: VecDeque::new(),
        }
    }

    /// Attempts to record a restart. Returns `false` (and records nothing)
    /// when the sliding-window threshold or lifetime cap would be exceeded.
    pub fn try_record_restart(&mut self) -> bool {
        if self.lifetime_restarts >= self.max_restarts {
            return false;
        }
        let now = self.clock.now();
        while let Some(&front) = self.restart_times.front() {
            if now.duration_since(front) > self.window {
                self.restart_times.pop_front();
            } else {
                break;
            }
        }
        if self.restart_times.len() as u32 >= self.threshold {
            return false;
        }
        self.restart_times.push_back(now);
        self.lifetime_restarts += 1;
        true
    }

    pub fn lifetime_restarts(&self) -> u32 {
        self.lifetime_restarts
    }
}

struct Worker {
    id: usize,
    child: Child,
    budget: RestartBudget,
}

/// Spawns and supervises a fixed-ish pool of gateway worker processes.
///
/// `command_template` builds the `Command` to exec for a given worker id;
/// callers typically pass `std::env::current_exe()` plus whatever CLI args
/// the binary needs repeated across workers.
pub struct ClusterSupervisor<F>
where
    F: Fn(usize) -> Command + Send + Sync,
{
    config: ClusterConfig,
    clock: std::sync::Arc<dyn Clock>,
    command_template: F,
    workers: Mutex<Vec<Worker>>,
}

impl<F> ClusterSupervisor<F>
where
    F: Fn(usize) -> Command + Send + Sync,
{
    pub fn new(config: ClusterConfig, clock: std::sync::Arc<dyn Clock>, command_template: F) -> Self {
        Self {
            config,
            clock,
            command_template,
            workers: Mutex::new(Vec::new()),
        }
    }

    fn spawn_worker(&self, id: usize) -> std::io::Result<Worker> {
        let mut command = (self.command_template)(id);
        command.env(CLUSTER_WORKER_ENV, "1").env(CLUSTER_WORKER_ID_ENV, id.to_string());
        let child = command.spawn()?;
        info!("cluster: spawned worker {} (pid {:?})", id, child.id());
        Ok(Worker {
            id,
            child,
            budget: RestartBudget::new(
                self.clock.clone(),
                self.config.respawn_threshold_window,
                self.config.respawn_threshold,
                self.config.max_restarts,
            ),
        })
    }

    /// Starts the configured number of workers.
    pub async fn start(&self) -> std::io::Result<()> {
        let mut workers = self.workers.lock().await;
        for id in 0..self.config.workers {
            workers.push(self.spawn_worker(id)?);
        }
        Ok(())
    }

    /// Scales the live worker count to `n`, spawning or gracefully stopping
    /// as needed. `n` is floored at 1.
    pub async fn scale_to(&self, n: usize) -> std::io::Result<()> {
        let n = n.max(1);
        let mut workers = self.workers.lock().await;
        while workers.len() < n {
            let id = workers.len();
            workers.push(self.spawn_worker(id)?);
        }
        while workers.len() > n {
            if let Some(mut worker) = workers.pop() {
                let _ = worker.child.start_kill();
                let _ = worker.child.wait().await;
                info!("cluster: scaled down, stopped worker {}", worker.id);
            }
        }
        Ok(())
    }

    /// Rolling restart: for each worker slot in turn, spawn a replacement,
    /// wait `settle_delay`, then terminate the old one. Total live worker
    /// count never drops below the configured `workers` during the roll.
    pub async fn rolling_restart(&self) -> std::io::Result<()> {
        let count = {
            let workers = self.workers.lock().await;
            workers.len()
        };
        for slot in 0..count {
            let replacement = self.spawn_worker(slot)?;
            tokio::time::sleep(self.config.settle_delay).await;
            let mut workers = self.workers.lock().await;
            let old = std::mem::replace(&mut workers[slot], replacement);
            drop(workers);
            let mut old = old;
            let _ = old.child.start_kill();
            let _ = old.child.wait().await;
            info!("cluster: rolling restart replaced worker {}", slot);
        }
        Ok(())
    }

    /// Handles a worker exit: respawns it if the restart budget allows,
    /// applying exponential backoff with jitter before respawning.
    pub async fn handle_exit(&self, slot: usize, jitter_fraction: f64) -> std::io::Result<bool> {
        let mut workers = self.workers.lock().await;
        let Some(worker) = workers.get_mut(slot) else {
            return Ok(false);
        };
        if !worker.budget.try_record_restart() {
            warn!("cluster: worker {} exceeded restart budget, not respawning", slot);
            return Ok(false);
        }
        let attempt = worker.budget.lifetime_restarts();
        let delay = backoff_delay(attempt, self.config.base_backoff, self.config.max_backoff, jitter_fraction);
        drop(workers);
        tokio::time::sleep(delay).await;

        let replacement = self.spawn_worker(slot)?;
        let mut workers = self.workers.lock().await;
        workers[slot] = replacement;
        Ok(true)
    }

    /// Sends a terminate signal to every worker, waits up to
    /// `shutdown_timeout`, then force-kills any survivor.
    pub async fn shutdown(&self) {
        let mut workers = self.workers.lock().await;
        for worker in workers.iter_mut() {
            let _ = worker.child.start_kill();
        }
        for worker in workers.iter_mut() {
            let wait = tokio::time::timeout(self.config.shutdown_timeout, worker.child.wait()).await;
            if wait.is_err() {
                warn!("cluster: worker {} did not exit within shutdown timeout, force-killing", worker.id);
                let _ = worker.child.start_kill();
                let _ = worker.child.wait().await;
            }
        }
        info!("cluster: all workers shut down");
    }

    pub async fn live_worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::TestClock;
    use std::sync::Arc;

    #[test]
    fn backoff_grows_and_is_capped() {
        let base = Duration::from_millis(500);
        let max = Duration::from_secs(30);
        let d0 = backoff_delay(0, base, max, 0.0);
        let d3 = backoff_delay(3, base, max, 0.0);
        let d_huge = backoff_delay(50, base, max, 0.0);
        assert_eq!(d0, base);
        assert!(d3 > d0);
        assert_eq!(d_huge, max);
    }

    #[test]
    fn jitter_adds_up_to_half_of_base() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        let no_jitter = backoff_delay(0, base, max, 0.0);
        let full_jitter = backoff_delay(0, base, max, 1.0);
        assert_eq!(full_jitter - no_jitter, base / 2);
    }

    #[test]
    fn restart_budget_enforces_sliding_window() {
        let clock = Arc::new(TestClock::new());
        let mut budget = RestartBudget::new(clock.clone(), Duration::from_secs(60), 2, 100);
        assert!(budget.try_record_restart());
        assert!(budget.try_record_restart());
        assert!(!budget.try_record_restart());

        clock.advance(Duration::from_secs(61));
        assert!(budget.try_record_restart());
    }

    #[test]
    fn restart_budget_enforces_lifetime_cap() {
        let clock = Arc::new(TestClock::new());
        let mut budget = RestartBudget::new(clock.clone(), Duration::from_secs(1), 1000, 2);
        clock.advance(Duration::from_secs(2));
        assert!(budget.try_record_restart());
        clock.advance(Duration::from_secs(2));
        assert!(budget.try_record_restart());
        clock.advance(Duration::from_secs(2));
        assert!(!budget.try_record_restart());
    }

    #[test]
    fn worker_process_detection_reads_env() {
        std::env::remove_var(CLUSTER_WORKER_ENV);
        assert!(!is_worker_process());
        std::env::set_var(CLUSTER_WORKER_ENV, "1");
        assert!(is_worker_process());
        std::env::remove_var(CLUSTER_WORKER_ENV);
    }
}
