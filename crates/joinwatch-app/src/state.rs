use std::sync::Arc;

use image::RgbaImage;
use joinwatch_config::{Config, bounded_secs};
use joinwatch_core::{
    ChangeDetector, PatternMatcher, RegionRegistry, ResponseThrottler, ResultCache,
};
use joinwatch_io::CaptureSource;
use joinwatch_ocr::{AdaptiveSelector, EnginePool, OcrEngine};
use joinwatch_types::OcrCandidate;
use parking_lot::Mutex;

/// Everything the scheduler and the maintenance tasks share
pub struct AppState {
    pub config: Config,
    pub registry: Mutex<RegionRegistry>,
    /// Screen-space recognitions keyed by crop fingerprint, region and scan geometry
    pub recognitions: ResultCache<Vec<OcrCandidate>>,
    /// Preprocessed crops keyed by crop fingerprint and strategy name
    pub preprocessed: ResultCache<Arc<RgbaImage>>,
    /// Crops regions last fired on
    pub changes: ChangeDetector,
    pub throttler: ResponseThrottler,
    pub matcher: PatternMatcher,
    pub selector: AdaptiveSelector,
    pub pool: EnginePool,
    pub capture: Arc<dyn CaptureSource>,
}

impl AppState {
    pub fn new(
        config: Config,
        capture: Arc<dyn CaptureSource>,
        engines: Vec<Arc<dyn OcrEngine>>,
    ) -> anyhow::Result<Self> {
        let cache = &config.cache;

        Ok(Self {
            registry: Mutex::new(RegionRegistry::new()),
            recognitions: ResultCache::new(
                "recognition",
                cache.max_entries,
                cache.ttl_seconds.map(bounded_secs),
            ),
            preprocessed: ResultCache::new(
                "preprocess",
                cache.preprocess_max_entries,
                cache.preprocess_ttl_seconds.map(bounded_secs),
            ),
            changes: ChangeDetector::from_config(&config.scan),
            throttler: ResponseThrottler::from_config(&config.throttle),
            matcher: PatternMatcher::new(&config.matcher)?,
            selector: AdaptiveSelector::new(&config.ocr.preprocess),
            pool: EnginePool::new(engines)?,
            capture,
            config,
        })
    }

    /// Queries the capture layer for surfaces and rebuilds every region
    pub async fn rebuild_layout(&self) -> anyhow::Result<usize> {
        let capture = self.capture.clone();
        let surfaces = match tokio::task::spawn_blocking(move || capture.surfaces()).await? {
            Ok(surfaces) => surfaces,
            Err(e) => {
                tracing::warn!("Failed to list surfaces: {e}");
                vec![]
            }
        };

        let regions = self.registry.lock().build(&self.config.grid, &surfaces);
        self.changes.clear();
        Ok(regions)
    }
}
