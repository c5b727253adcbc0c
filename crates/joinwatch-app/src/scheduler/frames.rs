use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use image::RgbaImage;
use joinwatch_io::CaptureSource;
use tokio::sync::Semaphore;

struct Frame {
    image: Arc<RgbaImage>,
    captured_at: Instant,
}

type Slot = Arc<tokio::sync::Mutex<Option<Frame>>>;

/// Full-surface captures shared by every region on the surface.
///
/// A capture younger than the freshness window is reused. Check and capture
/// happen under the surface's async mutex so concurrent callers never grab the
/// same surface twice.
pub struct SurfaceFrames {
    capture: Arc<dyn CaptureSource>,
    freshness: Duration,
    permits: Arc<Semaphore>,
    slots: parking_lot::Mutex<HashMap<usize, Slot>>,
    captures: AtomicU64,
}

impl SurfaceFrames {
    pub fn new(capture: Arc<dyn CaptureSource>, freshness: Duration, workers: usize) -> Self {
        Self {
            capture,
            freshness,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            slots: parking_lot::Mutex::new(HashMap::new()),
            captures: AtomicU64::new(0),
        }
    }

    pub async fn frame(&self, index: usize) -> anyhow::Result<Arc<RgbaImage>> {
        let slot = self.slots.lock().entry(index).or_default().clone();
        let mut current = slot.lock().await;

        if let Some(frame) = current.as_ref()
            && frame.captured_at.elapsed() < self.freshness
        {
            return Ok(frame.image.clone());
        }

        let _permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .context("Capture pool closed")?;

        let capture = self.capture.clone();
        let image = tokio::task::spawn_blocking(move || capture.capture_surface(index))
            .await
            .context("Capture worker panicked")?
            .with_context(|| format!("Failed to capture surface {index}"))?;

        self.captures.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("[CAPTURE] surface {index} refreshed");

        let image = Arc::new(image);
        *current = Some(Frame {
            image: image.clone(),
            captured_at: Instant::now(),
        });
        Ok(image)
    }

    /// Number of real captures taken so far
    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::Relaxed)
    }
}
