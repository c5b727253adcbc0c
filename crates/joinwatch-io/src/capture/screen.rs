use image::RgbaImage;
use joinwatch_types::{Rect, SurfaceInfo};
use xcap::Monitor;

use super::{CaptureError, CaptureSource};

/// Live monitors through `xcap`
#[derive(Default)]
pub struct ScreenCapture;

impl ScreenCapture {
    pub fn new() -> Self {
        Self
    }

    fn monitors() -> Result<Vec<Monitor>, CaptureError> {
        Monitor::all().map_err(|e| CaptureError::Backend(format!("Failed to get monitors: {e}")))
    }
}

impl CaptureSource for ScreenCapture {
    fn surfaces(&self) -> Result<Vec<SurfaceInfo>, CaptureError> {
        Ok(Self::monitors()?
            .iter()
            .enumerate()
            .map(|(index, m)| SurfaceInfo::new(index, Rect::new(m.x(), m.y(), m.width(), m.height())))
            .collect())
    }

    fn capture_surface(&self, index: usize) -> Result<RgbaImage, CaptureError> {
        let monitors = Self::monitors()?;
        let monitor = monitors.get(index).ok_or(CaptureError::NoSurface(index))?;

        let image = monitor
            .capture_image()
            .map_err(|e| CaptureError::Backend(format!("Failed to capture screen: {e}")))?;

        let (width, height) = (image.width(), image.height());
        RgbaImage::from_raw(width, height, image.into_raw())
            .ok_or_else(|| CaptureError::Backend("Captured buffer has the wrong size".to_string()))
    }
}
