//! Connection admission control (spec §4.6 "Accept loop", "Rate limiting";
//! §5 "Connection-accept semaphore limits concurrent connections; a
//! token-bucket limiter governs rate"). Grounded in the teacher's
//! `Connection`-count bookkeeping, generalized with a real token bucket
//! since the teacher itself doesn't rate-limit accepts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Caps the number of live connections. Excess accepts are rejected
/// immediately (spec: "excess connections are immediately closed").
#[derive(Debug)]
pub struct ConnectionAdmission {
    semaphore: Arc<Semaphore>,
}

/// A permit that releases its connection slot on drop.
pub type ConnectionPermit = tokio::sync::OwnedSemaphorePermit;

impl ConnectionAdmission {
    pub fn new(max_concurrent_connections: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent_connections.max(1))),
        }
    }

    pub fn try_admit(&self) -> Option<ConnectionPermit> {
        self.semaphore.clone().try_acquire_owned().ok()
    }
}

/// A simple token bucket governing the connection-acceptance rate (burst
/// `B`, refill `R` tokens/sec). Lazily refills on each `try_acquire` call
/// rather than running a background ticker, matching the teacher's
/// preference for driving state from the call site instead of spawning
/// auxiliary tasks for bookkeeping.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    refill_rate: f64,
    state: Mutex<TokenBucketState>,
    rejected: AtomicU64,
}

#[derive(Debug)]
struct TokenBucketState {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(burst: u32, rate_per_sec: f64) -> Self {
        Self {
            capacity: f64::from(burst),
            refill_rate: rate_per_sec,
            state: Mutex::new(TokenBucketState {
                tokens: f64::from(burst),
                last_refill: Instant::now(),
            }),
            rejected: AtomicU64::new(0),
        }
    }

    /// Takes one token if available. Returns `false` on exhaustion, in
    /// which case the caller closes the connection without a handshake and
    /// this bucket's rejection counter is incremented.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().expect("token bucket mutex poisoned");
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_rate).min(self.capacity);
        state.last_refill = now;
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_configured_ceiling() {
        let admission = ConnectionAdmission::new(2);
        let a = admission.try_admit().unwrap();
        let b = admission.try_admit().unwrap();
        assert!(admission.try_admit().is_none());
        drop(a);
        assert!(admission.try_admit().is_some());
        drop(b);
    }

    #[test]
    fn token_bucket_rejects_once_burst_is_spent() {
        let bucket = TokenBucket::new(2, 0.0);
        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());
        assert_eq!(bucket.rejected_count(), 1);
    }
}
