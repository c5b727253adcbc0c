use serde::{Deserialize, Serialize};

fn default_workers() -> usize {
    2
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_lease_timeout_ms() -> u64 {
    100
}

fn default_adaptive() -> bool {
    true
}

fn default_strategies() -> Vec<Strategy> {
    vec![
        Strategy::named("raw"),
        Strategy {
            scale: 2.0,
            grayscale: true,
            ..Strategy::named("upscale_gray")
        },
        Strategy {
            scale: 2.0,
            grayscale: true,
            contrast: 40.0,
            threshold: Some(140),
            ..Strategy::named("binarized")
        },
        Strategy {
            scale: 2.0,
            grayscale: true,
            invert: true,
            ..Strategy::named("inverted")
        },
    ]
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OcrConfig {
    /// Number of engine handles in the pool, i.e. max concurrent recognitions
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Per-call recognition timeout; a timed out call counts as "no detection"
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// How long a region waits for a free engine before being deferred
    #[serde(default = "default_lease_timeout_ms")]
    pub lease_timeout_ms: u64,
    /// External recognizer program, fed a PNG on stdin
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub preprocess: PreprocessConfig,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_ms: default_timeout_ms(),
            lease_timeout_ms: default_lease_timeout_ms(),
            command: None,
            args: vec![],
            preprocess: PreprocessConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Pick strategies by observed success instead of always using the first
    #[serde(default = "default_adaptive")]
    pub adaptive: bool,
    #[serde(default = "default_strategies")]
    pub strategies: Vec<Strategy>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            adaptive: default_adaptive(),
            strategies: default_strategies(),
        }
    }
}

fn default_scale() -> f32 {
    1.0
}

/// One image preprocessing recipe applied before recognition
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub grayscale: bool,
    /// Contrast adjustment in percent, 0 keeps the image as is
    #[serde(default)]
    pub contrast: f32,
    /// Binarization cutoff on luma
    #[serde(default)]
    pub threshold: Option<u8>,
    #[serde(default)]
    pub invert: bool,
}

impl Strategy {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scale: default_scale(),
            grayscale: false,
            contrast: 0.0,
            threshold: None,
            invert: false,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0
            && !self.grayscale
            && self.contrast == 0.0
            && self.threshold.is_none()
            && !self.invert
    }
}
