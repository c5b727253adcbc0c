use image::RgbaImage;
use image::imageops;
use joinwatch_types::{Rect, SurfaceInfo};

mod file;
#[cfg(feature = "screen")]
mod screen;

pub use file::FileCapture;
#[cfg(feature = "screen")]
pub use screen::ScreenCapture;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("{rect:?} is outside the {width}x{height} surface")]
    OutOfBounds { rect: Rect, width: u32, height: u32 },

    #[error("No surface with index {0}")]
    NoSurface(usize),

    #[error("Capture backend error: {0}")]
    Backend(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Raw surface grabs. Blocking; callers run them on a blocking worker.
pub trait CaptureSource: Send + Sync {
    /// Capturable surfaces with their screen geometry
    fn surfaces(&self) -> Result<Vec<SurfaceInfo>, CaptureError>;

    fn capture_surface(&self, index: usize) -> Result<RgbaImage, CaptureError>;
}

/// Cuts `rect` (surface-relative) out of a surface image
pub fn crop(image: &RgbaImage, rect: Rect) -> Result<RgbaImage, CaptureError> {
    let surface = Rect::new(0, 0, image.width(), image.height());
    if rect.is_empty() || !rect.is_within(&surface) {
        return Err(CaptureError::OutOfBounds {
            rect,
            width: image.width(),
            height: image.height(),
        });
    }

    Ok(imageops::crop_imm(image, rect.x as u32, rect.y as u32, rect.width, rect.height).to_image())
}
