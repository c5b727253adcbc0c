//! In-memory stand-ins for the capture, OCR and automation adapters

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use image::{Rgba, RgbaImage};
use joinwatch_config::Config;
use joinwatch_config::ocr::Strategy;
use joinwatch_io::{Automation, CaptureError, CaptureSource};
use joinwatch_ocr::{AdapterError, OcrEngine};
use joinwatch_types::{OcrCandidate, Point, Rect, RegionId, SurfaceInfo, WatchEvent};
use kanal::{AsyncReceiver, AsyncSender};
use parking_lot::Mutex;

use crate::scheduler::CaptureScheduler;
use crate::state::AppState;

pub const JOIN_TEXT: &str = "들어왔습니다";

/// Gradient so every crop has distinct bytes
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

pub fn solid(width: u32, height: u32, value: u8) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
}

pub struct FakeCapture {
    surfaces: Vec<SurfaceInfo>,
    /// Returned in order, the last one repeats
    images: Vec<RgbaImage>,
    pub captures: Arc<AtomicUsize>,
}

impl FakeCapture {
    /// One surface at the origin returning `image` on every capture
    pub fn single(bounds: Rect, image: RgbaImage) -> Self {
        Self::sequence(bounds, vec![image])
    }

    /// One surface whose captures step through `images`
    pub fn sequence(bounds: Rect, images: Vec<RgbaImage>) -> Self {
        Self {
            surfaces: vec![SurfaceInfo::new(0, bounds)],
            images,
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reports a surface but every capture fails
    pub fn broken(bounds: Rect) -> Self {
        Self::sequence(bounds, vec![])
    }
}

impl CaptureSource for FakeCapture {
    fn surfaces(&self) -> Result<Vec<SurfaceInfo>, CaptureError> {
        Ok(self.surfaces.clone())
    }

    fn capture_surface(&self, index: usize) -> Result<RgbaImage, CaptureError> {
        let n = self.captures.fetch_add(1, Ordering::SeqCst);
        if self.images.is_empty() {
            return Err(CaptureError::Backend("display went away".to_string()));
        }
        if index != 0 {
            return Err(CaptureError::NoSurface(index));
        }
        Ok(self.images[n.min(self.images.len() - 1)].clone())
    }
}

/// Returns the same candidates for every image, optionally after a delay
pub struct FakeEngine {
    candidates: Vec<OcrCandidate>,
    delay: Duration,
    pub calls: Arc<AtomicUsize>,
}

impl FakeEngine {
    pub fn new(candidates: Vec<OcrCandidate>) -> Self {
        Self {
            candidates,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn reading(text: &str) -> Self {
        Self::new(vec![
            OcrCandidate::new(text, 0.95).with_anchor(Point::new(10, 10)),
        ])
    }
}

impl OcrEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    fn recognize(&self, _image: &RgbaImage) -> Result<Vec<OcrCandidate>, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(self.candidates.clone())
    }
}

#[derive(Default)]
pub struct RecordingAutomation {
    pub actions: Mutex<Vec<(RegionId, Point, String)>>,
}

#[async_trait::async_trait]
impl Automation for RecordingAutomation {
    fn name(&self) -> &str {
        "recording"
    }

    async fn perform_action(
        &self,
        region: &RegionId,
        anchor: Point,
        text: &str,
    ) -> anyhow::Result<()> {
        self.actions
            .lock()
            .push((region.clone(), anchor, text.to_string()));
        Ok(())
    }
}

/// Small grid, raw strategy only, captures never reused unless a test says so
pub fn test_config(rows: u32, cols: u32) -> Config {
    let mut config = Config::default();
    config.grid.rows = rows;
    config.grid.cols = cols;
    config.grid.scan_area_height = 50;
    config.scan.capture_freshness_ms = 0;
    config.scan.cells_per_cycle = (rows * cols) as usize;
    config.ocr.timeout_ms = 1000;
    config.ocr.lease_timeout_ms = 100;
    config.ocr.preprocess.adaptive = false;
    config.ocr.preprocess.strategies = vec![Strategy::named("raw")];
    config
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub scheduler: CaptureScheduler,
    pub tx: AsyncSender<WatchEvent>,
    pub rx: AsyncReceiver<WatchEvent>,
}

impl Harness {
    /// Drains the queue and returns the regions of every trigger in it
    pub fn drain_triggers(&self) -> Vec<RegionId> {
        let mut regions = Vec::new();
        while let Ok(Some(event)) = self.rx.try_recv() {
            if let WatchEvent::Triggered { region_id, .. } = event {
                regions.push(region_id);
            }
        }
        regions
    }
}

pub async fn harness(config: Config, capture: FakeCapture, engines: Vec<FakeEngine>) -> Harness {
    harness_with_capacity(config, capture, engines, 16).await
}

pub async fn harness_with_capacity(
    config: Config,
    capture: FakeCapture,
    engines: Vec<FakeEngine>,
    capacity: usize,
) -> Harness {
    let engines = engines
        .into_iter()
        .map(|engine| Arc::new(engine) as Arc<dyn OcrEngine>)
        .collect();

    let state = Arc::new(AppState::new(config, Arc::new(capture), engines).unwrap());
    state.rebuild_layout().await.unwrap();

    let (tx, rx) = kanal::bounded_async(capacity);
    let scheduler = CaptureScheduler::new(state.clone(), tx.clone());

    Harness {
        state,
        scheduler,
        tx,
        rx,
    }
}
