use std::sync::Arc;

use image::RgbaImage;
use joinwatch_config::bounded_secs;
use joinwatch_config::throttle::CooldownPolicy;
use joinwatch_core::{CacheKey, Snapshot};
use joinwatch_core::registry::Region;
use joinwatch_io::{CaptureError, crop};
use joinwatch_ocr::{OcrOutcome, PoolError, Preprocessor, recognize_with_timeout};
use joinwatch_types::{OcrCandidate, Point, Rect, SurfaceInfo, WatchEvent};
use kanal::AsyncSender;

use super::report::{Decision, RegionOutcome};
use crate::state::AppState;

/// Detections below this confidence do not count as a strategy success
const STRATEGY_SUCCESS_CONFIDENCE: f32 = 0.5;

/// Shared handles for one region pipeline run
#[derive(Clone)]
pub struct ScanContext {
    pub state: Arc<AppState>,
    pub handoff: AsyncSender<WatchEvent>,
}

/// Crop -> change check -> cache -> preprocess -> OCR -> match -> throttle -> trigger
pub async fn process_region(
    ctx: ScanContext,
    region: Region,
    surface: SurfaceInfo,
    frame: Arc<RgbaImage>,
) -> RegionOutcome {
    let state = &ctx.state;
    let id = &region.id;

    let local = region.scan_area.relative_to(surface.bounds.origin());
    let crop = match crop(&frame, local) {
        Ok(crop) => crop,
        Err(CaptureError::OutOfBounds { .. }) => {
            tracing::debug!("[SCAN] {id} scan area {:?} outside surface, skipped", region.scan_area);
            return RegionOutcome::OutOfBounds;
        }
        Err(e) => {
            tracing::warn!("[SCAN] {id} crop failed: {e}");
            return RegionOutcome::Failed { ocr_called: false };
        }
    };

    let snapshot = Snapshot::from_rgba(crop.as_raw(), crop.width(), crop.height());
    if !state.changes.has_changed(id, &snapshot) {
        tracing::debug!("[SCAN] {id} unchanged since its last trigger");
        return RegionOutcome::Unchanged;
    }

    let fp = snapshot.fingerprint();
    let key = CacheKey::new(fp)
        .with_region(id.clone())
        .with_geometry(region.scan_area);

    let (candidates, cache_hit) = match state.recognitions.get(&key) {
        Some(candidates) => {
            tracing::debug!("[SCAN] {id} recognition cache hit");
            (candidates, true)
        }
        None => match recognize(&ctx, &region, crop, fp).await {
            Ok(candidates) => {
                state.recognitions.put(key, candidates.clone());
                (candidates, false)
            }
            Err(outcome) => return outcome,
        },
    };

    let decision = decide(&ctx, &region, &candidates, snapshot);
    RegionOutcome::Scanned {
        cache_hit,
        decision,
    }
}

/// Preprocess, lease an engine and recognize. Returns screen-space candidates
/// or the outcome that ends this region's cycle.
async fn recognize(
    ctx: &ScanContext,
    region: &Region,
    crop: RgbaImage,
    fp: u64,
) -> Result<Vec<OcrCandidate>, RegionOutcome> {
    let state = &ctx.state;
    let id = &region.id;
    let strategy = state.selector.choose().clone();

    let pkey = CacheKey::new(fp).with_variant(strategy.name.clone());
    let processed = match state.preprocessed.get(&pkey) {
        Some(processed) => processed,
        None => {
            let strategy = strategy.clone();
            let processed = tokio::task::spawn_blocking(move || strategy.process(&crop))
                .await
                .map_err(|e| {
                    tracing::error!("[SCAN] {id} preprocessing panicked: {e}");
                    RegionOutcome::Failed { ocr_called: false }
                })?;
            let processed = Arc::new(processed);
            state.preprocessed.put(pkey, processed.clone());
            processed
        }
    };

    let lease_timeout = state.config.lease_timeout();
    let lease = match state.pool.lease(lease_timeout).await {
        Ok(lease) => lease,
        Err(PoolError::Saturated(_)) => {
            tracing::warn!("[SCAN] {id} deferred, all OCR engines busy");
            return Err(RegionOutcome::Deferred);
        }
        Err(e) => {
            tracing::warn!("[SCAN] {id} could not lease an engine: {e}");
            return Err(RegionOutcome::Failed { ocr_called: false });
        }
    };

    let timeout = state.config.ocr_timeout();
    let candidates = match recognize_with_timeout(lease, processed.clone(), timeout).await {
        OcrOutcome::Detected(candidates) => candidates,
        OcrOutcome::Empty => vec![],
        OcrOutcome::Failed(reason) => {
            tracing::warn!("[SCAN] {id} recognition failed: {reason}");
            state.selector.report(&strategy.name, false);
            return Err(RegionOutcome::Failed { ocr_called: true });
        }
        OcrOutcome::TimedOut => {
            state.selector.report(&strategy.name, false);
            return Err(RegionOutcome::TimedOut);
        }
    };

    let success = candidates
        .iter()
        .any(|c| c.confidence > STRATEGY_SUCCESS_CONFIDENCE);
    state.selector.report(&strategy.name, success);

    let (crop_w, crop_h) = (region.scan_area.width, region.scan_area.height);
    Ok(candidates
        .into_iter()
        .map(|mut candidate| {
            candidate.anchor = candidate.anchor.map(|anchor| {
                to_screen(anchor, region.scan_area, (crop_w, crop_h), processed.dimensions())
            });
            candidate
        })
        .collect())
}

fn decide(
    ctx: &ScanContext,
    region: &Region,
    candidates: &[OcrCandidate],
    snapshot: Snapshot,
) -> Decision {
    let state = &ctx.state;
    let id = &region.id;

    let chosen = if state.config.scan.multi_candidate {
        state.matcher.select_candidate(candidates)
    } else {
        candidates
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .map(|candidate| (candidate, state.matcher.evaluate(&candidate.text)))
    };

    let Some((candidate, outcome)) = chosen else {
        return Decision::NoMatch;
    };
    if !outcome.is_match {
        return Decision::NoMatch;
    }

    let anchor = candidate.anchor.unwrap_or_else(|| region.scan_area.center());
    let phrase = outcome.phrase.unwrap_or_default();

    if !state.throttler.can_respond(id) {
        return Decision::Throttled;
    }

    if let Err(e) = state
        .registry
        .lock()
        .mark_triggered(id, &candidate.text, anchor)
    {
        tracing::warn!("[SCAN] {id} trigger refused: {e}");
        return Decision::Rejected;
    }

    let event = WatchEvent::Triggered {
        region_id: id.clone(),
        anchor,
        text: candidate.text.clone(),
        phrase: phrase.clone(),
    };
    // A dropped trigger leaves the crop unremembered, so the region fires
    // again once its cooldown ends
    match ctx.handoff.try_send(event) {
        Ok(true) => state.changes.remember(id, snapshot),
        Ok(false) => tracing::warn!("[SCAN] action queue full, dropped trigger for {id}"),
        Err(e) => tracing::warn!("[SCAN] action queue closed, dropped trigger for {id}: {e}"),
    }

    let backoff = state.throttler.record_response(id);
    let cooldown = match state.config.throttle.cooldown_policy {
        CooldownPolicy::Backoff => backoff,
        CooldownPolicy::Fixed => bounded_secs(state.config.throttle.cooldown_seconds),
    };

    if let Err(e) = state.registry.lock().start_cooldown(id, cooldown) {
        tracing::warn!("[SCAN] {id} cooldown not started: {e}");
    }

    tracing::info!(
        "[SCAN] {id} triggered by '{}' ({phrase}) at ({}, {}), cooldown {:?}",
        candidate.text,
        anchor.x,
        anchor.y,
        cooldown
    );
    Decision::Triggered
}

/// Undo preprocessing scale, then add the scan area origin
fn to_screen(anchor: Point, scan_area: Rect, crop: (u32, u32), processed: (u32, u32)) -> Point {
    let sx = processed.0 as f64 / crop.0.max(1) as f64;
    let sy = processed.1 as f64 / crop.1.max(1) as f64;

    Point::new(
        scan_area.x + (anchor.x as f64 / sx).round() as i32,
        scan_area.y + (anchor.y as f64 / sy).round() as i32,
    )
}
