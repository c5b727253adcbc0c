use joinwatch_core::{CacheStats, ChangeStats, MatcherStats, RegistryStats, ThrottleStats};
use joinwatch_ocr::StrategyStats;
use serde::Serialize;

use crate::state::AppState;

/// Point-in-time view of every component, logged as telemetry and printed by `--once`
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub registry: RegistryStats,
    pub recognition_cache: CacheStats,
    pub preprocess_cache: CacheStats,
    pub throttle: ThrottleStats,
    pub changes: ChangeStats,
    pub matcher: MatcherStats,
    pub strategies: Vec<StrategyStats>,
    pub engines: usize,
    pub engines_available: usize,
}

impl StatusSnapshot {
    pub fn collect(state: &AppState) -> Self {
        Self {
            registry: state.registry.lock().stats(),
            recognition_cache: state.recognitions.stats(),
            preprocess_cache: state.preprocessed.stats(),
            throttle: state.throttler.stats(),
            changes: state.changes.stats(),
            matcher: state.matcher.stats(),
            strategies: state.selector.stats(),
            engines: state.pool.size(),
            engines_available: state.pool.available(),
        }
    }

    pub fn log(&self) {
        let r = &self.registry;
        let c = &self.recognition_cache;
        tracing::info!(
            "[STATUS] regions {}/{} idle, {} cooling, {} triggers | cache {} entries, hit rate {:.1}% | throttled {} spam {} | {} unchanged skips | engines {}/{} free",
            r.idle,
            r.total,
            r.cooldown,
            r.total_triggers,
            c.size,
            c.hit_rate * 100.0,
            self.throttle.throttled_count,
            self.throttle.spam_prevented,
            self.changes.unchanged,
            self.engines_available,
            self.engines,
        );
    }
}
