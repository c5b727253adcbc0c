pub mod automation;
pub mod capture;

pub use automation::{Automation, CommandAutomation, LogAutomation, WebhookAutomation};
pub use capture::{CaptureError, CaptureSource, FileCapture, crop};

#[cfg(feature = "screen")]
pub use capture::ScreenCapture;
