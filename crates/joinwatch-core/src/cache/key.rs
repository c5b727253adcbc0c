use std::hash::{Hash, Hasher};

use ahash::AHasher;
use joinwatch_types::{Rect, RegionId};

/// Content hash of raw pixel bytes plus dimensions
pub fn fingerprint(pixels: &[u8], width: u32, height: u32) -> u64 {
    let mut hasher = AHasher::default();
    width.hash(&mut hasher);
    height.hash(&mut hasher);
    hasher.write(pixels);
    hasher.finish()
}

/// Cache key: a content fingerprint optionally scoped to a region, a geometry
/// and a variant (e.g. preprocessing strategy name)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    fingerprint: u64,
    region: Option<RegionId>,
    geometry: Option<Rect>,
    variant: Option<String>,
}

impl CacheKey {
    pub fn new(fingerprint: u64) -> Self {
        Self {
            fingerprint,
            region: None,
            geometry: None,
            variant: None,
        }
    }

    pub fn with_region(mut self, region: RegionId) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_geometry(mut self, geometry: Rect) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}
