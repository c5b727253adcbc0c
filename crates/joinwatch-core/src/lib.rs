pub mod cache;
pub mod change;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod throttle;

pub use cache::{CacheKey, CacheStats, ResultCache, fingerprint};
pub use change::{ChangeDetector, ChangeStats, Snapshot};
pub use error::CoreError;
pub use matcher::{MatchOutcome, MatcherStats, PatternMatcher, TextNormalizer, Verdict};
pub use registry::{Region, RegionRegistry, RegistryStats};
pub use throttle::{ResponseThrottler, ThrottleStats};
