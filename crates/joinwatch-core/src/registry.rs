//! Owns every tracked region and its `Idle -> Triggered -> Cooldown -> Idle`
//! state machine. `Disabled` is left only through `set_enabled(id, true)`.
//!
//! Regions that fired recently or often carry an activity score; batch
//! selection hands its first slots to the most active eligible regions and
//! fills the rest round-robin, so quiet regions are never starved.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use joinwatch_config::grid::GridConfig;
use joinwatch_types::{Point, Rect, RegionId, RegionStatus, SurfaceInfo};
use serde::Serialize;

use crate::error::CoreError;

/// Assumed when the capture layer reports no surface at all
const FALLBACK_SURFACE: Rect = Rect::new(0, 0, 1920, 1080);

/// Triggers older than this no longer raise a region's activity
const ACTIVITY_WINDOW: Duration = Duration::from_secs(300);
/// Triggers inside the window that saturate the frequency term
const ACTIVITY_BURST: usize = 10;
/// Lifetime triggers that saturate the volume term
const ACTIVITY_VOLUME: f64 = 100.0;

const RECENCY_WEIGHT: f64 = 0.5;
const FREQUENCY_WEIGHT: f64 = 0.3;
const VOLUME_WEIGHT: f64 = 0.2;

/// Trigger history behind a region's activity score
#[derive(Debug, Clone, Default)]
struct Activity {
    recent: VecDeque<Instant>,
    total: u64,
}

impl Activity {
    fn record(&mut self, now: Instant) {
        self.total += 1;
        self.recent.push_back(now);
        while self.recent.len() > ACTIVITY_BURST {
            self.recent.pop_front();
        }
    }

    /// Weighted recency, frequency and volume, in `[0, 1]`
    fn score(&self, now: Instant) -> f64 {
        let Some(&last) = self.recent.back() else {
            return 0.0;
        };

        let window = ACTIVITY_WINDOW.as_secs_f64();
        let since = now.saturating_duration_since(last).as_secs_f64();
        let recency = (1.0 - since / window).max(0.0);

        let in_window = self
            .recent
            .iter()
            .filter(|&&at| now.saturating_duration_since(at) <= ACTIVITY_WINDOW)
            .count();
        let frequency = in_window as f64 / ACTIVITY_BURST as f64;
        let volume = (self.total as f64 / ACTIVITY_VOLUME).min(1.0);

        RECENCY_WEIGHT * recency + FREQUENCY_WEIGHT * frequency + VOLUME_WEIGHT * volume
    }
}

#[derive(Debug, Clone)]
pub struct Region {
    pub id: RegionId,
    /// Full tracked cell, screen coordinates
    pub bounds: Rect,
    /// Bottom strip of `bounds` handed to OCR
    pub scan_area: Rect,
    pub surface: usize,
    pub status: RegionStatus,
    pub enabled: bool,
    /// Present only while `Triggered`
    pub detected_text: Option<String>,
    pub detected_position: Option<Point>,
    pub last_triggered_at: Option<Instant>,
    pub cooldown_until: Option<Instant>,
    pub trigger_count: u64,
}

impl Region {
    fn new(id: RegionId, bounds: Rect, scan_area_height: u32, surface: usize) -> Self {
        let height = scan_area_height.min(bounds.height);
        let scan_area = Rect::new(
            bounds.x,
            bounds.y + (bounds.height - height) as i32,
            bounds.width,
            height,
        );

        Self {
            id,
            bounds,
            scan_area,
            surface,
            status: RegionStatus::Idle,
            enabled: true,
            detected_text: None,
            detected_position: None,
            last_triggered_at: None,
            cooldown_until: None,
            trigger_count: 0,
        }
    }

    pub fn is_eligible(&self) -> bool {
        self.enabled && self.status == RegionStatus::Idle
    }

    fn clear_detection(&mut self) {
        self.detected_text = None;
        self.detected_position = None;
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub enabled: usize,
    pub idle: usize,
    pub triggered: usize,
    pub cooldown: usize,
    pub disabled: usize,
    pub total_triggers: u64,
}

#[derive(Debug, Default)]
pub struct RegionRegistry {
    regions: Vec<Region>,
    index: HashMap<RegionId, usize>,
    surfaces: Vec<SurfaceInfo>,
    /// Parallel to `regions`
    activity: Vec<Activity>,
    cursor: usize,
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every region with a fresh `rows x cols` grid per surface.
    /// Returns the number of regions built.
    pub fn build(&mut self, grid: &GridConfig, surfaces: &[SurfaceInfo]) -> usize {
        let mut usable: Vec<SurfaceInfo> = surfaces
            .iter()
            .filter(|s| !s.bounds.is_empty())
            .take(grid.monitor_count)
            .copied()
            .collect();

        if usable.is_empty() {
            tracing::warn!(
                "[REGISTRY] no usable surface reported, assuming {}x{} at origin",
                FALLBACK_SURFACE.width,
                FALLBACK_SURFACE.height
            );
            usable.push(SurfaceInfo::new(0, FALLBACK_SURFACE));
        } else if usable.len() < grid.monitor_count {
            tracing::warn!(
                "[REGISTRY] {} monitors configured but only {} available",
                grid.monitor_count,
                usable.len()
            );
        }

        let mut regions = Vec::with_capacity(usable.len() * grid.cells_per_monitor());
        for (monitor, surface) in usable.iter().enumerate() {
            let b = surface.bounds;
            for row in 0..grid.rows {
                let y0 = b.height as u64 * row as u64 / grid.rows as u64;
                let y1 = b.height as u64 * (row as u64 + 1) / grid.rows as u64;

                for col in 0..grid.cols {
                    let x0 = b.width as u64 * col as u64 / grid.cols as u64;
                    let x1 = b.width as u64 * (col as u64 + 1) / grid.cols as u64;

                    let bounds = Rect::new(
                        b.x + x0 as i32,
                        b.y + y0 as i32,
                        (x1 - x0) as u32,
                        (y1 - y0) as u32,
                    );
                    regions.push(Region::new(
                        RegionId::for_cell(monitor, row, col),
                        bounds,
                        grid.scan_area_height,
                        surface.index,
                    ));
                }
            }
        }

        self.index = regions
            .iter()
            .enumerate()
            .map(|(i, region)| (region.id.clone(), i))
            .collect();
        self.activity = vec![Activity::default(); regions.len()];
        self.regions = regions;
        self.surfaces = usable;
        self.cursor = 0;

        tracing::info!(
            "[REGISTRY] built {} regions over {} surface(s)",
            self.regions.len(),
            self.surfaces.len()
        );
        self.regions.len()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn surfaces(&self) -> &[SurfaceInfo] {
        &self.surfaces
    }

    pub fn surface(&self, index: usize) -> Option<SurfaceInfo> {
        self.surfaces.iter().find(|s| s.index == index).copied()
    }

    pub fn get(&self, id: &RegionId) -> Option<&Region> {
        self.index.get(id).map(|&i| &self.regions[i])
    }

    /// Region whose bounds contain the point
    pub fn region_at(&self, point: Point) -> Option<&Region> {
        self.regions.iter().find(|r| r.bounds.contains(point))
    }

    pub fn regions_on_surface(&self, index: usize) -> impl Iterator<Item = &Region> {
        self.regions.iter().filter(move |r| r.surface == index)
    }

    /// Idle and enabled regions, in creation order
    pub fn eligible_for_capture(&self) -> Vec<Region> {
        self.regions
            .iter()
            .filter(|r| r.is_eligible())
            .cloned()
            .collect()
    }

    pub fn next_batch(&mut self, max: usize, priority_slots: usize) -> Vec<Region> {
        self.next_batch_at(max, priority_slots, Instant::now())
    }

    /// At most `max` eligible regions. Up to `priority_slots`, never more than
    /// half the batch, go to the most active ones. The rest continue
    /// round-robin where the previous batch stopped.
    pub fn next_batch_at(
        &mut self,
        max: usize,
        priority_slots: usize,
        now: Instant,
    ) -> Vec<Region> {
        let total = self.regions.len();
        if total == 0 || max == 0 {
            return Vec::new();
        }

        let mut active: Vec<(usize, f64)> = (0..total)
            .filter(|&i| self.regions[i].is_eligible())
            .map(|i| (i, self.activity[i].score(now)))
            .filter(|(_, score)| *score > 0.0)
            .collect();
        active.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut picked = vec![false; total];
        let mut batch = Vec::new();
        for (i, _) in active.into_iter().take(priority_slots.min(max / 2)) {
            picked[i] = true;
            batch.push(self.regions[i].clone());
        }

        let mut last = None;
        for offset in 0..total {
            if batch.len() == max {
                break;
            }
            let i = (self.cursor + offset) % total;
            if !picked[i] && self.regions[i].is_eligible() {
                picked[i] = true;
                batch.push(self.regions[i].clone());
                last = Some(i);
            }
        }

        if let Some(i) = last {
            self.cursor = (i + 1) % total;
        }
        batch
    }

    /// Activity score in `[0, 1]`, zero for regions that never fired
    pub fn activity_score(&self, id: &RegionId) -> f64 {
        self.activity_score_at(id, Instant::now())
    }

    pub fn activity_score_at(&self, id: &RegionId, now: Instant) -> f64 {
        self.index
            .get(id)
            .map_or(0.0, |&i| self.activity[i].score(now))
    }

    pub fn mark_triggered(
        &mut self,
        id: &RegionId,
        text: &str,
        position: Point,
    ) -> Result<(), CoreError> {
        self.mark_triggered_at(id, text, position, Instant::now())
    }

    /// Only an `Idle` region can trigger; anything else is rejected untouched
    pub fn mark_triggered_at(
        &mut self,
        id: &RegionId,
        text: &str,
        position: Point,
        now: Instant,
    ) -> Result<(), CoreError> {
        let region = self.region_mut(id)?;

        if region.status != RegionStatus::Idle || !region.enabled {
            return Err(rejected(region, "trigger"));
        }

        region.status = RegionStatus::Triggered;
        region.detected_text = Some(text.to_string());
        region.detected_position = Some(position);
        region.last_triggered_at = Some(now);
        region.trigger_count += 1;

        if let Some(&i) = self.index.get(id) {
            self.activity[i].record(now);
        }

        tracing::info!("[REGISTRY] {id} triggered at ({}, {})", position.x, position.y);
        Ok(())
    }

    pub fn start_cooldown(&mut self, id: &RegionId, duration: Duration) -> Result<(), CoreError> {
        self.start_cooldown_at(id, duration, Instant::now())
    }

    pub fn start_cooldown_at(
        &mut self,
        id: &RegionId,
        duration: Duration,
        now: Instant,
    ) -> Result<(), CoreError> {
        let region = self.region_mut(id)?;

        if region.status == RegionStatus::Disabled {
            return Err(rejected(region, "cool down"));
        }

        region.status = RegionStatus::Cooldown;
        region.cooldown_until = Some(now + duration);
        region.clear_detection();

        tracing::debug!("[REGISTRY] {id} cooling down for {:?}", duration);
        Ok(())
    }

    /// Moves every expired `Cooldown` region back to `Idle`
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut released = 0;
        for region in &mut self.regions {
            if region.status == RegionStatus::Cooldown
                && region.cooldown_until.is_none_or(|until| until <= now)
            {
                region.status = RegionStatus::Idle;
                region.cooldown_until = None;
                released += 1;
            }
        }
        released
    }

    /// Every non-disabled region back to `Idle`, detection cleared
    pub fn reset_all(&mut self) {
        for region in &mut self.regions {
            if region.status != RegionStatus::Disabled {
                region.status = RegionStatus::Idle;
                region.cooldown_until = None;
                region.clear_detection();
            }
        }
        tracing::info!("[REGISTRY] all regions reset");
    }

    pub fn set_enabled(&mut self, id: &RegionId, enabled: bool) -> Result<(), CoreError> {
        let region = self.region_mut(id)?;
        region.enabled = enabled;

        if !enabled {
            region.status = RegionStatus::Disabled;
            region.cooldown_until = None;
            region.clear_detection();
        } else if region.status == RegionStatus::Disabled {
            region.status = RegionStatus::Idle;
        }

        tracing::debug!("[REGISTRY] {id} enabled = {enabled}");
        Ok(())
    }

    pub fn stats(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total: self.regions.len(),
            ..RegistryStats::default()
        };

        for region in &self.regions {
            if region.enabled {
                stats.enabled += 1;
            }
            match region.status {
                RegionStatus::Idle => stats.idle += 1,
                RegionStatus::Triggered => stats.triggered += 1,
                RegionStatus::Cooldown => stats.cooldown += 1,
                RegionStatus::Disabled => stats.disabled += 1,
            }
            stats.total_triggers += region.trigger_count;
        }

        stats
    }

    fn region_mut(&mut self, id: &RegionId) -> Result<&mut Region, CoreError> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.regions[i]),
            None => Err(CoreError::UnknownRegion(id.clone())),
        }
    }
}

fn rejected(region: &Region, action: &'static str) -> CoreError {
    tracing::warn!(
        "[REGISTRY] rejected: {} cannot {action} while {}",
        region.id,
        region.status
    );
    CoreError::InvalidTransition {
        id: region.id.clone(),
        from: region.status,
        action,
    }
}
