use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;
use crate::status::StatusSnapshot;

/// Periodic cache expiry, throttle record cleanup and status logging
pub async fn maintenance_loop(state: Arc<AppState>, cancel: CancellationToken) -> anyhow::Result<()> {
    let sweep_every = Duration::from_secs(state.config.cache.sweep_interval_seconds.max(1));
    let telemetry_every = Duration::from_secs(state.config.telemetry_interval_seconds.max(1));
    let max_record_age = Duration::from_secs(state.config.throttle.cleanup_max_age_hours * 3600);

    let mut sweep = tokio::time::interval(sweep_every);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut telemetry = tokio::time::interval(telemetry_every);
    telemetry.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Both intervals fire immediately, skip that first round
    sweep.tick().await;
    telemetry.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sweep.tick() => sweep_once(&state, max_record_age),
            _ = telemetry.tick() => StatusSnapshot::collect(&state).log(),
        }
    }

    tracing::debug!("[MAINTENANCE] stopping");
    Ok(())
}

pub fn sweep_once(state: &AppState, max_record_age: Duration) {
    let now = Instant::now();
    let recognitions = state.recognitions.clear_expired(now);
    let preprocessed = state.preprocessed.clear_expired(now);
    let records = state.throttler.cleanup_older_than(max_record_age);

    if recognitions + preprocessed + records > 0 {
        tracing::debug!(
            "[MAINTENANCE] expired {recognitions} recognition(s), {preprocessed} preprocessed crop(s), {records} throttle record(s)"
        );
    }
}
