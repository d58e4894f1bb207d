//! Time-evicted rate limiter.
//!
//! Keys are hashed with FNV-1a/64. The check-then-reserve sequence is a
//! *single* critical section: a
//! split read map and write map would let two callers both observe "not
//! rate limited" before either recorded its reservation. Here both the
//! check and the reservation happen under one `parking_lot::Mutex` lock,
//! so there is no window between them.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// FNV-1a, 64-bit variant.
pub fn fnv1a64(data: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in data {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

struct Reservation {
    at: Instant,
    period: Duration,
}

/// A rate limiter keyed by an arbitrary byte string (typically
/// `alerter_kind:destination`), each key independently evicted `period`
/// after its last successful reservation.
pub struct RateLimiter {
    reservations: Mutex<HashMap<u64, Reservation>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { reservations: Mutex::new(HashMap::new()) }
    }

    /// Attempt to reserve `key` for `period`. Returns `true` (and records
    /// the reservation) if the key is not currently within a prior
    /// reservation's window, `false` otherwise. The check and the write
    /// happen under the same lock acquisition.
    pub fn try_acquire(&self, key: &[u8], period: Duration) -> bool {
        let hashed = fnv1a64(key);
        let now = Instant::now();
        let mut reservations = self.reservations.lock();

        if let Some(existing) = reservations.get(&hashed) {
            if now.duration_since(existing.at) < existing.period {
                return false;
            }
        }

        reservations.insert(hashed, Reservation { at: now, period });
        true
    }

    /// Evict reservations whose window has already elapsed. Intended to be
    /// driven by an hourly `tokio::time::interval` task so the map does not
    /// grow unboundedly with one-shot keys.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut reservations = self.reservations.lock();
        let before = reservations.len();
        reservations.retain(|_, r| now.duration_since(r.at) < r.period);
        before - reservations.len()
    }

    pub fn len(&self) -> usize {
        self.reservations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
