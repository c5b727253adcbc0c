//! Scan cycles: pick a batch of eligible regions, capture each surface once,
//! then run every region of the batch through the pipeline concurrently.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use joinwatch_core::registry::Region;
use joinwatch_types::{SurfaceInfo, WatchEvent};
use kanal::AsyncSender;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

mod frames;
mod pipeline;
mod report;

pub use frames::SurfaceFrames;
use pipeline::{ScanContext, process_region};
pub use report::{CycleReport, RegionOutcome};

pub struct CaptureScheduler {
    ctx: ScanContext,
    frames: Arc<SurfaceFrames>,
    cycle: AtomicU64,
}

impl CaptureScheduler {
    pub fn new(state: Arc<AppState>, handoff: AsyncSender<WatchEvent>) -> Self {
        let frames = SurfaceFrames::new(
            state.capture.clone(),
            state.config.capture_freshness(),
            state.config.scan.capture_workers,
        );

        Self {
            ctx: ScanContext { state, handoff },
            frames: Arc::new(frames),
            cycle: AtomicU64::new(0),
        }
    }

    pub fn frames(&self) -> &SurfaceFrames {
        &self.frames
    }

    /// Runs one full scan cycle and returns what happened to every selected region
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle = self.cycle.fetch_add(1, Ordering::Relaxed) + 1;
        let state = &self.ctx.state;

        let (batch, surfaces) = {
            let mut registry = state.registry.lock();
            let released = registry.tick(Instant::now());
            if released > 0 {
                tracing::debug!("[SCHEDULER] {released} region(s) left cooldown");
            }
            (
                registry.next_batch(
                    state.config.scan.cells_per_cycle,
                    state.config.scan.priority_slots,
                ),
                registry.surfaces().to_vec(),
            )
        };

        let mut report = CycleReport {
            cycle,
            selected: batch.len(),
            ..Default::default()
        };

        let mut groups: BTreeMap<usize, Vec<Region>> = BTreeMap::new();
        for region in batch {
            groups.entry(region.surface).or_default().push(region);
        }

        let mut tasks = JoinSet::new();
        for (index, regions) in groups {
            let Some(surface) = surfaces.iter().find(|s| s.index == index).copied() else {
                tracing::warn!("[SCHEDULER] surface {index} vanished, skipping its regions");
                for _ in &regions {
                    report.record(RegionOutcome::Failed { ocr_called: false });
                }
                continue;
            };

            tasks.spawn(scan_surface(
                self.ctx.clone(),
                self.frames.clone(),
                surface,
                regions,
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcomes) => outcomes.into_iter().for_each(|o| report.record(o)),
                Err(e) => tracing::error!("[SCHEDULER] surface task panicked: {e}"),
            }
        }

        tracing::debug!(
            "[SCHEDULER] cycle {cycle}: {} selected, {} scanned, {} unchanged, {} cache hits, {} triggered",
            report.selected,
            report.scanned,
            report.unchanged,
            report.cache_hits,
            report.triggered
        );
        report
    }

    /// Fixed-interval loop until cancelled. A cycle that overruns the interval
    /// delays the next one instead of stacking.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> anyhow::Result<()> {
        let mut interval = tokio::time::interval(self.ctx.state.config.cycle_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            "[SCHEDULER] scanning every {:?}",
            self.ctx.state.config.cycle_interval()
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("[SCHEDULER] stopping");
                    break;
                }
                _ = interval.tick() => {
                    self.run_cycle().await;
                }
            }
        }

        Ok(())
    }
}

async fn scan_surface(
    ctx: ScanContext,
    frames: Arc<SurfaceFrames>,
    surface: SurfaceInfo,
    regions: Vec<Region>,
) -> Vec<RegionOutcome> {
    let frame = match frames.frame(surface.index).await {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("[SCHEDULER] {e:#}");
            return vec![RegionOutcome::Failed { ocr_called: false }; regions.len()];
        }
    };

    let mut tasks = JoinSet::new();
    for region in regions {
        tasks.spawn(process_region(ctx.clone(), region, surface, frame.clone()));
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => {
                tracing::error!("[SCHEDULER] region task panicked: {e}");
                outcomes.push(RegionOutcome::Failed { ocr_called: false });
            }
        }
    }
    outcomes
}
