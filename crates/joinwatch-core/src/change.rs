//! Pixel-difference change detection between a region's crop at its last
//! trigger and the crop seen now.
//!
//! A region that fired keeps a grayscale thumbnail of the crop it fired on.
//! Until the crop differs from it by more than the change threshold, the
//! region is not matched again, so a join notice that stays on screen fires
//! the action once.

use std::collections::HashMap;

use joinwatch_config::scan::ScanConfig;
use joinwatch_types::RegionId;
use parking_lot::Mutex;
use serde::Serialize;

use crate::cache::fingerprint;

/// Longest thumbnail side, larger crops are box-averaged down
const THUMB_MAX: u32 = 64;

/// Grayscale thumbnail of a crop plus its exact content hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    fingerprint: u64,
    width: u32,
    height: u32,
    luma: Vec<u8>,
}

impl Snapshot {
    /// `pixels` are tightly packed RGBA rows of `width x height`
    pub fn from_rgba(pixels: &[u8], width: u32, height: u32) -> Self {
        let block = width.max(height).div_ceil(THUMB_MAX).max(1);
        let tw = width.div_ceil(block);
        let th = height.div_ceil(block);

        let mut sums = vec![0u64; (tw * th) as usize];
        let mut counts = vec![0u64; (tw * th) as usize];
        for (i, px) in pixels.chunks_exact(4).enumerate() {
            let x = i as u32 % width.max(1);
            let y = i as u32 / width.max(1);
            if y >= height {
                break;
            }
            let cell = ((y / block) * tw + x / block) as usize;
            let luma = (299 * px[0] as u64 + 587 * px[1] as u64 + 114 * px[2] as u64) / 1000;
            sums[cell] += luma;
            counts[cell] += 1;
        }

        let luma = sums
            .iter()
            .zip(&counts)
            .map(|(sum, count)| (sum / (*count).max(1)) as u8)
            .collect();

        Self {
            fingerprint: fingerprint(pixels, width, height),
            width,
            height,
            luma,
        }
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Share of thumbnail pixels whose luma moved by more than `pixel_threshold`.
    /// A different crop size counts as fully changed.
    pub fn changed_ratio(&self, other: &Snapshot, pixel_threshold: u8) -> f64 {
        if self.width != other.width || self.height != other.height {
            return 1.0;
        }
        if self.fingerprint == other.fingerprint || self.luma.is_empty() {
            return 0.0;
        }

        let changed = self
            .luma
            .iter()
            .zip(&other.luma)
            .filter(|(a, b)| a.abs_diff(**b) > pixel_threshold)
            .count();
        changed as f64 / self.luma.len() as f64
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ChangeStats {
    pub tracked: usize,
    pub checks: u64,
    pub unchanged: u64,
}

#[derive(Default)]
struct Inner {
    snapshots: HashMap<RegionId, Snapshot>,
    checks: u64,
    unchanged: u64,
}

pub struct ChangeDetector {
    change_threshold: f64,
    pixel_threshold: u8,
    inner: Mutex<Inner>,
}

impl ChangeDetector {
    pub fn new(change_threshold: f64, pixel_threshold: u8) -> Self {
        Self {
            change_threshold,
            pixel_threshold,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.change_threshold, config.pixel_threshold)
    }

    /// Stores the crop a region triggered on
    pub fn remember(&self, id: &RegionId, snapshot: Snapshot) {
        self.inner.lock().snapshots.insert(id.clone(), snapshot);
    }

    /// True when the region has nothing remembered or `current` moved past the
    /// change threshold. A changed crop drops the remembered one.
    pub fn has_changed(&self, id: &RegionId, current: &Snapshot) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let Some(previous) = inner.snapshots.get(id) else {
            return true;
        };

        inner.checks += 1;
        let ratio = previous.changed_ratio(current, self.pixel_threshold);
        if ratio > self.change_threshold {
            tracing::debug!("[CHANGE] {id} changed ({:.1}%)", ratio * 100.0);
            inner.snapshots.remove(id);
            true
        } else {
            inner.unchanged += 1;
            false
        }
    }

    pub fn clear(&self) {
        self.inner.lock().snapshots.clear();
    }

    pub fn stats(&self) -> ChangeStats {
        let inner = self.inner.lock();
        ChangeStats {
            tracked: inner.snapshots.len(),
            checks: inner.checks,
            unchanged: inner.unchanged,
        }
    }
}
