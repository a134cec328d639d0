//! Target selection strategies.
//!
//! Each [`LoadBalancer`] implementation picks one target out of an already
//! *eligible* slice (healthy, positive weight, breaker not open — see
//! [`crate::pool::TargetPool::eligible`]). Selection never mutates breaker
//! or health state; only [`crate::services::http::RouteHandler`] feeds back
//! outcomes.

use crate::models::router::LoadBalancingStrategy;
use crate::pool::Target;
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

/// Strategy contract for picking one target from an eligible slice.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    fn select(&self, targets: &[Arc<Target>], client_ip: Option<&str>) -> Option<Arc<Target>>;
}

#[derive(Debug, Default)]
pub struct RoundRobinBalancer {
    counter: AtomicUsize,
}

impl LoadBalancer for RoundRobinBalancer {
    fn select(&self, targets: &[Arc<Target>], _client_ip: Option<&str>) -> Option<Arc<Target>> {
        if targets.is_empty() {
            return None;
        }
        let idx = self.counter.fetch_add(1, Ordering::Relaxed) % targets.len();
        Some(targets[idx].clone())
    }
}

#[derive(Debug, Default)]
pub struct RandomBalancer;

impl LoadBalancer for RandomBalancer {
    fn select(&self, targets: &[Arc<Target>], _client_ip: Option<&str>) -> Option<Arc<Target>> {
        if targets.is_empty() {
            return None;
        }
        let idx = rand::thread_rng().gen_range(0..targets.len());
        Some(targets[idx].clone())
    }
}

/// Picks `a` over `b` when `a` is strictly better, breaking ties on lower
/// `ewmaLatency` and, failing that, lower `key` so selection among equally
/// loaded targets is deterministic rather than an artifact of slice order.
fn better(a: &Arc<Target>, a_score: f64, b: &Arc<Target>, b_score: f64) -> bool {
    match a_score.partial_cmp(&b_score).unwrap_or(std::cmp::Ordering::Equal) {
        std::cmp::Ordering::Less => true,
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => match a.ewma_latency_ms().partial_cmp(&b.ewma_latency_ms()) {
            Some(std::cmp::Ordering::Less) => true,
            Some(std::cmp::Ordering::Greater) => false,
            _ => a.key < b.key,
        },
    }
}

#[derive(Debug, Default)]
pub struct LeastConnectionsBalancer;

impl LoadBalancer for LeastConnectionsBalancer {
    fn select(&self, targets: &[Arc<Target>], _client_ip: Option<&str>) -> Option<Arc<Target>> {
        let mut targets_iter = targets.iter();
        let mut best = targets_iter.next()?;
        for t in targets_iter {
            if better(t, t.active_count() as f64, best, best.active_count() as f64) {
                best = t;
            }
        }
        Some(best.clone())
    }
}

#[derive(Debug, Default)]
pub struct WeightedLeastConnectionsBalancer;

impl LoadBalancer for WeightedLeastConnectionsBalancer {
    fn select(&self, targets: &[Arc<Target>], _client_ip: Option<&str>) -> Option<Arc<Target>> {
        let mut eligible = targets.iter().filter(|t| t.weight() > 0);
        let mut best = eligible.next()?;
        let mut best_score = best.active_count() as f64 / best.weight() as f64;
        for t in eligible {
            let score = t.active_count() as f64 / t.weight() as f64;
            if better(t, score, best, best_score) {
                best = t;
                best_score = score;
            }
        }
        Some(best.clone())
    }
}

/// Smooth weighted round-robin (the nginx upstream algorithm): each target
/// carries a running "current weight" that increases by its configured
/// weight every pick; the target with the highest current weight wins and
/// then gets decremented by the total weight of the pool. This spreads
/// picks evenly over time instead of bursting through one target's full
/// quota before moving to the next, which the teacher's naive
/// duplicate-by-weight-into-a-list approach did.
#[derive(Debug, Default)]
pub struct WeightedBalancer {
    current_weights: RwLock<HashMap<String, i64>>,
}

impl LoadBalancer for WeightedBalancer {
    fn select(&self, targets: &[Arc<Target>], _client_ip: Option<&str>) -> Option<Arc<Target>> {
        if targets.is_empty() {
            return None;
        }
        let total_weight: i64 = targets.iter().map(|t| t.weight() as i64).sum();
        if total_weight == 0 {
            return None;
        }

        let mut weights = self.current_weights.write().expect("weight lock poisoned");
        let mut best_idx = 0;
        let mut best_value = i64::MIN;
        for (i, t) in targets.iter().enumerate() {
            let cw = weights.entry(t.key.clone()).or_insert(0);
            *cw += t.weight() as i64;
            if *cw > best_value {
                best_value = *cw;
                best_idx = i;
            }
        }
        let winner_key = targets[best_idx].key.clone();
        if let Some(cw) = weights.get_mut(&winner_key) {
            *cw -= total_weight;
        }
        Some(targets[best_idx].clone())
    }
}

/// Power-of-two-choices: sample two distinct targets at random and pick the
/// one with fewer active connections. Avoids scanning the whole pool per
/// request the way plain least-connections does.
#[derive(Debug, Default)]
pub struct P2cBalancer;

impl LoadBalancer for P2cBalancer {
    fn select(&self, targets: &[Arc<Target>], _client_ip: Option<&str>) -> Option<Arc<Target>> {
        match targets.len() {
            0 => None,
            1 => Some(targets[0].clone()),
            _ => {
                let mut rng = rand::thread_rng();
                let i = rng.gen_range(0..targets.len());
                let mut j = rng.gen_range(0..targets.len() - 1);
                if j >= i {
                    j += 1;
                }
                let (a, b) = (&targets[i], &targets[j]);
                // Compare (active, ewmaLatency) lexicographically: fewer
                // in-flight requests wins outright; a tie there falls back
                // to whichever target has observed lower latency.
                let pick_a = match a.active_count().cmp(&b.active_count()) {
                    std::cmp::Ordering::Less => true,
                    std::cmp::Ordering::Greater => false,
                    std::cmp::Ordering::Equal => a.ewma_latency_ms() <= b.ewma_latency_ms(),
                };
                if pick_a {
                    Some(a.clone())
                } else {
                    Some(b.clone())
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct IpHashBalancer;

impl LoadBalancer for IpHashBalancer {
    fn select(&self, targets: &[Arc<Target>], client_ip: Option<&str>) -> Option<Arc<Target>> {
        if targets.is_empty() {
            return None;
        }
        let Some(ip) = client_ip else {
            return Some(targets[0].clone());
        };
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        ip.hash(&mut hasher);
        let idx = (hasher.finish() as usize) % targets.len();
        Some(targets[idx].clone())
    }
}

/// Routes to the target with the lowest observed EWMA latency. Targets with
/// no samples yet (`ewma == 0.0`) are treated as the best choice so new or
/// just-recovered targets get probed quickly.
#[derive(Debug, Default)]
pub struct LatencyBalancer;

impl LoadBalancer for LatencyBalancer {
    fn select(&self, targets: &[Arc<Target>], _client_ip: Option<&str>) -> Option<Arc<Target>> {
        targets
            .iter()
            .min_by(|a, b| {
                let la = a.ewma_latency_ms();
                let lb = b.ewma_latency_ms();
                let key = |l: f64| if l == 0.0 { f64::MIN } else { l };
                key(la).partial_cmp(&key(lb)).unwrap_or(std::cmp::Ordering::Equal)
            })
            .cloned()
    }
}

pub struct LoadBalancerFactory;

impl LoadBalancerFactory {
    pub fn create(strategy: &LoadBalancingStrategy) -> Arc<dyn LoadBalancer> {
        match strategy {
            LoadBalancingStrategy::RoundRobin => Arc::new(RoundRobinBalancer::default()),
            LoadBalancingStrategy::LeastConnections => Arc::new(LeastConnectionsBalancer),
            LoadBalancingStrategy::Random => Arc::new(RandomBalancer),
            LoadBalancingStrategy::Weighted => Arc::new(WeightedBalancer::default()),
            LoadBalancingStrategy::IpHash => Arc::new(IpHashBalancer),
            LoadBalancingStrategy::WeightedLeastConnections => Arc::new(WeightedLeastConnectionsBalancer),
            LoadBalancingStrategy::P2c => Arc::new(P2cBalancer),
            LoadBalancingStrategy::Latency => Arc::new(LatencyBalancer),
        }
    }
}
