use serde::{Deserialize, Serialize};

fn default_max_entries() -> Option<usize> {
    Some(1000)
}

fn default_ttl_seconds() -> Option<f64> {
    Some(45.0)
}

fn default_preprocess_max_entries() -> Option<usize> {
    Some(200)
}

fn default_preprocess_ttl_seconds() -> Option<f64> {
    Some(300.0)
}

fn default_sweep_interval_seconds() -> u64 {
    10
}

/// `None` for a bound means unbounded
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// Recognition cache capacity
    #[serde(default = "default_max_entries")]
    pub max_entries: Option<usize>,
    /// Recognition cache time-to-live
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: Option<f64>,
    #[serde(default = "default_preprocess_max_entries")]
    pub preprocess_max_entries: Option<usize>,
    #[serde(default = "default_preprocess_ttl_seconds")]
    pub preprocess_ttl_seconds: Option<f64>,
    /// Period of the background expiry sweep
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_seconds: default_ttl_seconds(),
            preprocess_max_entries: default_preprocess_max_entries(),
            preprocess_ttl_seconds: default_preprocess_ttl_seconds(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}
