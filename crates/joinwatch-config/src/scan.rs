use serde::{Deserialize, Serialize};

fn default_cycle_interval_ms() -> u64 {
    300
}

fn default_capture_freshness_ms() -> u64 {
    50
}

fn default_capture_workers() -> usize {
    4
}

fn default_cells_per_cycle() -> usize {
    15
}

fn default_multi_candidate() -> bool {
    true
}

fn default_change_threshold() -> f64 {
    0.05
}

fn default_pixel_threshold() -> u8 {
    30
}

fn default_priority_slots() -> usize {
    5
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Delay between scan cycles
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// A surface capture younger than this is reused for every region on it
    #[serde(default = "default_capture_freshness_ms")]
    pub capture_freshness_ms: u64,
    #[serde(default = "default_capture_workers")]
    pub capture_workers: usize,
    /// Upper bound of regions processed per cycle
    #[serde(default = "default_cells_per_cycle")]
    pub cells_per_cycle: usize,
    /// Batch slots handed to the most active regions before the round-robin fill
    #[serde(default = "default_priority_slots")]
    pub priority_slots: usize,
    /// Reconcile all OCR candidates of a crop instead of taking the most confident one
    #[serde(default = "default_multi_candidate")]
    pub multi_candidate: bool,
    /// Share of thumbnail pixels that must differ before a region that fired
    /// is matched again
    #[serde(default = "default_change_threshold")]
    pub change_threshold: f64,
    /// Luma difference below which a pixel counts as unchanged
    #[serde(default = "default_pixel_threshold")]
    pub pixel_threshold: u8,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            capture_freshness_ms: default_capture_freshness_ms(),
            capture_workers: default_capture_workers(),
            cells_per_cycle: default_cells_per_cycle(),
            priority_slots: default_priority_slots(),
            multi_candidate: default_multi_candidate(),
            change_threshold: default_change_threshold(),
            pixel_threshold: default_pixel_threshold(),
        }
    }
}
