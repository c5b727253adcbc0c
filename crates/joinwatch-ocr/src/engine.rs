use std::sync::Arc;
use std::time::Duration;

use image::RgbaImage;
use joinwatch_types::OcrCandidate;

use crate::error::AdapterError;
use crate::pool::EngineLease;

/// Text recognizer. Calls are blocking and run on a blocking worker.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Candidates may be empty; anchors are in `image` pixel space
    fn recognize(&self, image: &RgbaImage) -> Result<Vec<OcrCandidate>, AdapterError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum OcrOutcome {
    Detected(Vec<OcrCandidate>),
    Empty,
    Failed(String),
    TimedOut,
}

impl OcrOutcome {
    fn from_result(result: Result<Vec<OcrCandidate>, AdapterError>) -> Self {
        match result {
            Ok(candidates) => {
                let candidates: Vec<OcrCandidate> = candidates
                    .into_iter()
                    .filter(|c| !c.text.trim().is_empty())
                    .collect();
                if candidates.is_empty() {
                    OcrOutcome::Empty
                } else {
                    OcrOutcome::Detected(candidates)
                }
            }
            Err(e) => OcrOutcome::Failed(e.to_string()),
        }
    }
}

/// Runs one recognition on a blocking worker.
///
/// On timeout the call keeps running in the background and the lease goes
/// back to the pool once it finishes.
pub async fn recognize_with_timeout(
    lease: EngineLease,
    image: Arc<RgbaImage>,
    timeout: Duration,
) -> OcrOutcome {
    let engine_name = lease.name().to_string();

    let handle = tokio::task::spawn_blocking(move || {
        let result = lease.recognize(&image);
        drop(lease);
        result
    });

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => OcrOutcome::from_result(result),
        Ok(Err(e)) => {
            tracing::error!("[OCR] {engine_name} worker failed: {e}");
            OcrOutcome::Failed(e.to_string())
        }
        Err(_) => {
            tracing::warn!("[OCR] {engine_name} timed out after {:?}", timeout);
            OcrOutcome::TimedOut
        }
    }
}
