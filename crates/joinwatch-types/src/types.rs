use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Stable region identifier, e.g. `monitor_0_cell_2_1`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(String);

impl RegionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn for_cell(monitor: usize, row: u32, col: u32) -> Self {
        Self(format!("monitor_{monitor}_cell_{row}_{col}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RegionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionStatus {
    Idle,
    Triggered,
    Cooldown,
    Disabled,
}

impl RegionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionStatus::Idle => "idle",
            RegionStatus::Triggered => "triggered",
            RegionStatus::Cooldown => "cooldown",
            RegionStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for RegionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One text line reported by an OCR engine.
///
/// `anchor` is in the pixel space of the image handed to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrCandidate {
    pub text: String,
    pub confidence: f32,
    #[serde(default)]
    pub anchor: Option<Point>,
}

impl OcrCandidate {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor: Point) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

/// A capturable surface (one monitor)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceInfo {
    pub index: usize,
    pub bounds: Rect,
}

impl SurfaceInfo {
    pub fn new(index: usize, bounds: Rect) -> Self {
        Self { index, bounds }
    }
}

/// Events flowing from the scheduler to the app event loop. The queue is
/// bounded, so only events that need an action travel on it.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A region matched a trigger phrase and passed the throttler
    Triggered {
        region_id: RegionId,
        anchor: Point,
        text: String,
        phrase: String,
    },
    /// Layout changed and regions were rebuilt
    LayoutRebuilt { regions: usize },
}
