//! Session affinity (sticky session) store.
//!
//! Mirrors the in-memory map + periodic sweep idiom used by
//! `middleware::rate_limit::RateLimitStore`, but keyed by session id instead
//! of rate-limit bucket key, and backed by `dashmap` for lock-free
//! concurrent reads across worker threads.

use dashmap::DashMap;
use rand::RngCore;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};

/// A session's pinned target, with an expiry.
#[derive(Debug, Clone)]
pub struct SessionBinding {
    pub target_key: String,
    expires_at: Instant,
}

impl SessionBinding {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Concurrent session-id -> target-key map with TTL-based eviction.
#[derive(Debug, Clone)]
pub struct SessionAffinityStore {
    bindings: Arc<DashMap<String, SessionBinding>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionAffinityStore {
    /// Creates a new store using the system clock.
    pub fn new(ttl: Duration) -> Self {
        Self::new_with_clock(ttl, Arc::new(SystemClock))
    }

    /// Creates a new store with an injected clock, for deterministic tests.
    pub fn new_with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            bindings: Arc::new(DashMap::new()),
            ttl,
            clock,
        }
    }

    /// Generates a new session id: 128 bits of CSPRNG output, lower-hex
    /// encoded (32 hex characters).
    pub fn generate_session_id() -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Looks up the target bound to a session id. A miss — whether the id
    /// is unknown, expired, or the caller has already dropped the target —
    /// is not an error; the caller falls back to the normal selector.
    pub fn lookup(&self, session_id: &str) -> Option<String> {
        let binding = self.bindings.get(session_id)?;
        if binding.is_expired(self.clock.now()) {
            drop(binding);
            self.bindings.remove(session_id);
            return None;
        }
        Some(binding.target_key.clone())
    }

    /// Creates or refreshes a binding for `session_id` to `target_key`.
    pub fn bind(&self, session_id: String, target_key: String) {
        self.bindings.insert(
            session_id,
            SessionBinding {
                target_key,
                expires_at: self.clock.now() + self.ttl,
            },
        );
    }

    /// Removes all expired bindings. Intended to run on a periodic sweep.
    pub fn sweep_expired(&self) {
        let now = self.clock.now();
        self.bindings.retain(|_, binding| !binding.is_expired(now));
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Spawns the periodic sweep task, mirroring
    /// `middleware::rate_limit::RateLimitStore`'s cleanup cadence.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.sweep_expired();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_long_enough() {
        let a = SessionAffinityStore::generate_session_id();
        let b = SessionAffinityStore::generate_session_id();
        assert_ne!(a, b);
        assert!(a.len() >= 32);
    }

    #[test]
    fn bind_then_lookup_round_trips() {
        let store = SessionAffinityStore::new(Duration::from_secs(60));
        store.bind("sess-1".to_string(), "backend-a:8080".to_string());
        assert_eq!(store.lookup("sess-1").as_deref(), Some("backend-a:8080"));
    }

    #[test]
    fn lookup_of_unknown_session_is_a_miss_not_an_error() {
        let store = SessionAffinityStore::new(Duration::from_secs(60));
        assert!(store.lookup("nonexistent").is_none());
    }

    #[test]
    fn expired_binding_is_evicted_on_lookup() {
        let store = SessionAffinityStore::new(Duration::from_millis(1));
        store.bind("sess-1".to_string(), "backend-a:8080".to_string());
        std::thread::sleep(Duration::from_millis(10));
        assert!(store.lookup("sess-1").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let store = SessionAffinityStore::new(Duration::from_millis(1));
        store.bind("expiring".to_string(), "backend-a:8080".to_string());
        std::thread::sleep(Duration::from_millis(10));
        store.bind("fresh".to_string(), "backend-b:8080".to_string());
        store.sweep_expired();
        assert!(store.lookup("fresh").is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expiry_is_driven_by_the_injected_clock_not_wall_time() {
        let clock = Arc::new(crate::clock::TestClock::new());
        let store = SessionAffinityStore::new_with_clock(Duration::from_secs(60), clock.clone());
        store.bind("sess-1".to_string(), "backend-a:8080".to_string());

        assert_eq!(store.lookup("sess-1").as_deref(), Some("backend-a:8080"));

        clock.advance(Duration::from_secs(61));
        assert!(store.lookup("sess-1").is_none());
    }
}
