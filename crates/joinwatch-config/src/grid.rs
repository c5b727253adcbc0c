use serde::{Deserialize, Serialize};

fn default_rows() -> u32 {
    3
}

fn default_cols() -> u32 {
    5
}

fn default_monitor_count() -> usize {
    1
}

fn default_scan_area_height() -> u32 {
    80
}

/// Layout of the region grid laid over every monitor
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct GridConfig {
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_cols")]
    pub cols: u32,
    #[serde(default = "default_monitor_count")]
    pub monitor_count: usize,
    /// Height of the strip at the bottom of each cell that is sent to OCR
    #[serde(default = "default_scan_area_height")]
    pub scan_area_height: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            cols: default_cols(),
            monitor_count: default_monitor_count(),
            scan_area_height: default_scan_area_height(),
        }
    }
}

impl GridConfig {
    pub fn cells_per_monitor(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}
