use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureSource {
    /// Live monitors
    #[default]
    Screen,
    /// One image file per surface, re-read on every capture
    Files,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct CaptureConfig {
    pub source: CaptureSource,
    /// Image paths for the `files` source, index = surface index
    pub files: Vec<String>,
}
