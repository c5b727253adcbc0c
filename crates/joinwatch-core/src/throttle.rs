//! Per-region cooldown and exponential backoff ledger.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use joinwatch_config::bounded_secs;
use joinwatch_config::throttle::ThrottleConfig;
use joinwatch_types::RegionId;
use parking_lot::Mutex;
use serde::Serialize;

/// Responses closer together than this count towards spam detection
const SPAM_WINDOW: Duration = Duration::from_secs(30);
/// Burst length after which fast responses are counted as spam
const SPAM_BURST: u32 = 5;

#[derive(Debug, Clone)]
pub struct ThrottleRecord {
    pub last_response_at: Instant,
    pub response_count: u32,
    pub backoff: Duration,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ThrottleStats {
    pub total_responses: u64,
    pub throttled_count: u64,
    pub spam_prevented: u64,
    pub active_records: usize,
}

#[derive(Default)]
struct Ledger {
    records: HashMap<RegionId, ThrottleRecord>,
    total_responses: u64,
    throttled_count: u64,
    spam_prevented: u64,
}

pub struct ResponseThrottler {
    base: Duration,
    max: Duration,
    multiplier: f64,
    ledger: Mutex<Ledger>,
}

impl ResponseThrottler {
    pub fn new(base: Duration, max: Duration, multiplier: f64) -> Self {
        Self {
            base,
            max: max.max(base),
            multiplier: multiplier.max(1.0),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(
            bounded_secs(config.base_seconds),
            bounded_secs(config.max_seconds),
            config.multiplier,
        )
    }

    pub fn can_respond(&self, id: &RegionId) -> bool {
        self.can_respond_at(id, Instant::now())
    }

    /// True when there is no record or the current backoff has elapsed
    pub fn can_respond_at(&self, id: &RegionId, now: Instant) -> bool {
        let mut ledger = self.ledger.lock();

        let Some(record) = ledger.records.get(id) else {
            return true;
        };

        let elapsed = now.saturating_duration_since(record.last_response_at);
        if elapsed >= record.backoff {
            return true;
        }

        tracing::debug!(
            "[THROTTLE] {id} cooling down, {:.1}s left",
            (record.backoff - elapsed).as_secs_f64()
        );
        ledger.throttled_count += 1;
        false
    }

    pub fn record_response(&self, id: &RegionId) -> Duration {
        self.record_response_at(id, Instant::now())
    }

    /// Records a response and returns the backoff until the next one
    pub fn record_response_at(&self, id: &RegionId, now: Instant) -> Duration {
        let mut ledger = self.ledger.lock();
        ledger.total_responses += 1;

        let Some(record) = ledger.records.get_mut(id) else {
            ledger.records.insert(
                id.clone(),
                ThrottleRecord {
                    last_response_at: now,
                    response_count: 1,
                    backoff: self.base,
                },
            );
            tracing::info!(
                "[THROTTLE] first response for {id}, backoff {:?}",
                self.base
            );
            return self.base;
        };

        let elapsed = now.saturating_duration_since(record.last_response_at);
        let mut spam = false;

        if elapsed > self.max.saturating_mul(2) {
            record.response_count = 1;
            record.backoff = self.base;
            tracing::info!("[THROTTLE] backoff reset for {id}");
        } else {
            record.response_count += 1;
            let grown = record.backoff.as_secs_f64() * self.multiplier;
            record.backoff =
                Duration::try_from_secs_f64(grown).map_or(self.max, |next| next.min(self.max));

            if record.response_count > SPAM_BURST && elapsed < SPAM_WINDOW {
                tracing::warn!(
                    "[THROTTLE] spam suspected on {id}, backoff {:?}",
                    record.backoff
                );
                spam = true;
            }
        }
        record.last_response_at = now;
        let backoff = record.backoff;

        if spam {
            ledger.spam_prevented += 1;
        }

        backoff
    }

    pub fn cooldown_remaining(&self, id: &RegionId) -> Duration {
        self.cooldown_remaining_at(id, Instant::now())
    }

    pub fn cooldown_remaining_at(&self, id: &RegionId, now: Instant) -> Duration {
        let ledger = self.ledger.lock();
        match ledger.records.get(id) {
            Some(record) => record
                .backoff
                .saturating_sub(now.saturating_duration_since(record.last_response_at)),
            None => Duration::ZERO,
        }
    }

    /// Current backoff of a region, `None` when it never responded
    pub fn backoff(&self, id: &RegionId) -> Option<Duration> {
        self.ledger.lock().records.get(id).map(|record| record.backoff)
    }

    pub fn reset(&self, id: &RegionId) {
        if self.ledger.lock().records.remove(id).is_some() {
            tracing::info!("[THROTTLE] record for {id} reset");
        }
    }

    pub fn cleanup_older_than(&self, max_age: Duration) -> usize {
        self.cleanup_older_than_at(max_age, Instant::now())
    }

    /// Drops records whose last response is older than `max_age`
    pub fn cleanup_older_than_at(&self, max_age: Duration, now: Instant) -> usize {
        let mut ledger = self.ledger.lock();
        let before = ledger.records.len();
        ledger
            .records
            .retain(|_, record| now.saturating_duration_since(record.last_response_at) <= max_age);

        let removed = before - ledger.records.len();
        if removed > 0 {
            tracing::info!("[THROTTLE] cleaned up {removed} stale records");
        }
        removed
    }

    pub fn stats(&self) -> ThrottleStats {
        let ledger = self.ledger.lock();
        ThrottleStats {
            total_responses: ledger.total_responses,
            throttled_count: ledger.throttled_count,
            spam_prevented: ledger.spam_prevented,
            active_records: ledger.records.len(),
        }
    }
}
