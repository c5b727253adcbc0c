//! Recognition-noise correction and trigger phrase matching.

mod blacklist;
mod correction;
mod pattern;
pub mod similarity;

pub use blacklist::{Blacklist, BlacklistReason};
pub use correction::TextNormalizer;
pub use pattern::{MatchOutcome, MatcherStats, PatternMatcher, Verdict};
