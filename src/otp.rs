//! Short-lived one-time codes for phone verification.

use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Verified,
    Mismatch,
    Expired,
    NotFound,
    /// Too many wrong guesses; the pending code has been dropped.
    Exhausted,
}

/// Wrong guesses allowed per issued code.
pub const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    expires_at: Instant,
    failed_attempts: u32,
}

/// Codes keyed by phone number. Expired entries are dropped lazily on lookup
/// and eagerly by the sweeper.
pub struct OtpCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, OtpEntry>>,
}

impl OtpCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, OtpEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Issues a fresh 4-digit code, replacing any pending one for the phone.
    pub fn issue(&self, phone: &str) -> String {
        let code = rand::rng().random_range(1000..10000).to_string();
        self.insert_at(phone, &code, Instant::now());
        code
    }

    fn insert_at(&self, phone: &str, code: &str, now: Instant) {
        self.entries().insert(
            phone.to_string(),
            OtpEntry {
                code: code.to_string(),
                expires_at: now + self.ttl,
                failed_attempts: 0,
            },
        );
    }

    /// Drops a pending code, e.g. when it could not be delivered.
    pub fn discard(&self, phone: &str) {
        self.entries().remove(phone);
    }

    pub fn verify(&self, phone: &str, code: &str) -> OtpCheck {
        self.verify_at(phone, code, Instant::now())
    }

    fn verify_at(&self, phone: &str, code: &str, now: Instant) -> OtpCheck {
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(phone) else {
            return OtpCheck::NotFound;
        };
        if now > entry.expires_at {
            entries.remove(phone);
            return OtpCheck::Expired;
        }
        if entry.code == code {
            entries.remove(phone);
            return OtpCheck::Verified;
        }

        entry.failed_attempts += 1;
        if entry.failed_attempts >= MAX_ATTEMPTS {
            entries.remove(phone);
            debug!("OTP for {} dropped after {} wrong guesses", phone, MAX_ATTEMPTS);
            return OtpCheck::Exhausted;
        }
        OtpCheck::Mismatch
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, e| e.expires_at >= now);
        before - entries.len()
    }

    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let evicted = self.sweep();
                if evicted > 0 {
                    debug!("Evicted {} expired OTP codes", evicted);
                }
            }
        })
    }
}
