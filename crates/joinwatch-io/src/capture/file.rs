use std::path::PathBuf;

use image::RgbaImage;
use joinwatch_types::{Rect, SurfaceInfo};

use super::{CaptureError, CaptureSource};

/// One image file per surface, re-read on every capture.
///
/// Surfaces are laid out left to right like side-by-side monitors.
pub struct FileCapture {
    paths: Vec<PathBuf>,
}

impl FileCapture {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl CaptureSource for FileCapture {
    fn surfaces(&self) -> Result<Vec<SurfaceInfo>, CaptureError> {
        let mut x = 0i32;
        let mut surfaces = Vec::with_capacity(self.paths.len());

        for (index, path) in self.paths.iter().enumerate() {
            let (width, height) = image::image_dimensions(path)?;
            surfaces.push(SurfaceInfo::new(index, Rect::new(x, 0, width, height)));
            x += width as i32;
        }

        Ok(surfaces)
    }

    fn capture_surface(&self, index: usize) -> Result<RgbaImage, CaptureError> {
        let path = self.paths.get(index).ok_or(CaptureError::NoSurface(index))?;
        tracing::trace!("[CAPTURE] reading {}", path.display());
        Ok(image::open(path)?.to_rgba8())
    }
}
