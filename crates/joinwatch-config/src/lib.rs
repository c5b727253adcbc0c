use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use self::automation::{AutomationConfig, AutomationSink};
use self::cache::CacheConfig;
use self::capture::{CaptureConfig, CaptureSource};
use self::grid::GridConfig;
use self::matcher::MatcherConfig;
use self::ocr::OcrConfig;
use self::scan::ScanConfig;
use self::throttle::ThrottleConfig;

pub mod automation;
pub mod cache;
pub mod capture;
pub mod error;
pub mod grid;
pub mod matcher;
pub mod ocr;
pub mod scan;
pub mod throttle;

pub use error::ConfigError;

/// Upper bound for every seconds-valued knob (one week)
pub const MAX_SECONDS: f64 = 7.0 * 24.0 * 3600.0;

/// Seconds as a `Duration`, capped at `MAX_SECONDS`. Negative values map to zero.
pub fn bounded_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.min(MAX_SECONDS)).unwrap_or(Duration::ZERO)
}

fn default_telemetry_interval_seconds() -> u64 {
    30
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub scan: ScanConfig,
    pub ocr: OcrConfig,
    pub matcher: MatcherConfig,
    pub cache: CacheConfig,
    pub throttle: ThrottleConfig,
    pub capture: CaptureConfig,
    pub automation: AutomationConfig,

    /// How often registry/cache/throttle stats are logged
    #[serde(default = "default_telemetry_interval_seconds")]
    pub telemetry_interval_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            scan: ScanConfig::default(),
            ocr: OcrConfig::default(),
            matcher: MatcherConfig::default(),
            cache: CacheConfig::default(),
            throttle: ThrottleConfig::default(),
            capture: CaptureConfig::default(),
            automation: AutomationConfig::default(),
            telemetry_interval_seconds: default_telemetry_interval_seconds(),
        }
    }
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Applies overrides from any key lookup, unparseable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup("JOINWATCH_CYCLE_MS").and_then(|v| v.parse().ok()) {
            self.scan.cycle_interval_ms = ms;
        }

        if let Some(workers) = lookup("JOINWATCH_OCR_WORKERS").and_then(|v| v.parse().ok()) {
            self.ocr.workers = workers;
        }

        if let Some(ms) = lookup("JOINWATCH_OCR_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.ocr.timeout_ms = ms;
        }

        if let Some(secs) = lookup("JOINWATCH_COOLDOWN_SECONDS").and_then(|v| v.parse().ok()) {
            self.throttle.cooldown_seconds = secs;
        }

        if let Some(url) = lookup("JOINWATCH_WEBHOOK_URL") {
            self.automation.url = Some(url);
        }
    }

    /// Checks every knob once at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = &self.grid;
        if grid.rows == 0 || grid.cols == 0 {
            return Err(ConfigError::invalid("grid", "rows and cols must be at least 1"));
        }
        if grid.monitor_count == 0 {
            return Err(ConfigError::invalid("grid.monitor_count", "must be at least 1"));
        }
        if grid.scan_area_height == 0 {
            return Err(ConfigError::invalid("grid.scan_area_height", "must be at least 1"));
        }

        let scan = &self.scan;
        if scan.cycle_interval_ms == 0 {
            return Err(ConfigError::invalid("scan.cycle_interval_ms", "must be positive"));
        }
        if scan.capture_workers == 0 {
            return Err(ConfigError::invalid("scan.capture_workers", "must be at least 1"));
        }
        if scan.cells_per_cycle == 0 {
            return Err(ConfigError::invalid("scan.cells_per_cycle", "must be at least 1"));
        }
        if !(scan.change_threshold >= 0.0 && scan.change_threshold < 1.0) {
            return Err(ConfigError::invalid(
                "scan.change_threshold",
                format!("{} is outside [0, 1)", scan.change_threshold),
            ));
        }

        let ocr = &self.ocr;
        if ocr.workers == 0 {
            return Err(ConfigError::invalid("ocr.workers", "must be at least 1"));
        }
        if ocr.timeout_ms == 0 {
            return Err(ConfigError::invalid("ocr.timeout_ms", "must be positive"));
        }
        if ocr.preprocess.strategies.is_empty() {
            return Err(ConfigError::missing(
                "ocr.preprocess.strategies",
                "at least one strategy is required",
            ));
        }
        if let Some(strategy) = ocr
            .preprocess
            .strategies
            .iter()
            .find(|s| !(s.scale > 0.0 && s.scale <= 8.0))
        {
            return Err(ConfigError::invalid(
                "ocr.preprocess.strategies",
                format!("strategy '{}' has scale {} outside (0, 8]", strategy.name, strategy.scale),
            ));
        }

        let matcher = &self.matcher;
        if matcher.trigger_phrases.is_empty() {
            return Err(ConfigError::missing(
                "matcher.trigger_phrases",
                "at least one phrase is required",
            ));
        }
        if matcher.trigger_phrases.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::invalid("matcher.trigger_phrases", "empty phrase"));
        }
        for (field, value) in [
            ("matcher.fuzzy_threshold", matcher.fuzzy_threshold),
            ("matcher.decision_threshold", matcher.decision_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::invalid(field, format!("{value} is outside (0, 1]")));
            }
        }

        let cache = &self.cache;
        for (field, value) in [
            ("cache.max_entries", cache.max_entries),
            ("cache.preprocess_max_entries", cache.preprocess_max_entries),
        ] {
            if value == Some(0) {
                return Err(ConfigError::invalid(field, "use null for an unbounded cache"));
            }
        }
        for (field, value) in [
            ("cache.ttl_seconds", cache.ttl_seconds),
            ("cache.preprocess_ttl_seconds", cache.preprocess_ttl_seconds),
        ] {
            let Some(ttl) = value else { continue };
            if !(ttl > 0.0) {
                return Err(ConfigError::invalid(field, "use null for no expiry"));
            }
            if ttl > MAX_SECONDS {
                return Err(ConfigError::invalid(field, format!("{ttl} exceeds {MAX_SECONDS}")));
            }
        }

        let throttle = &self.throttle;
        if !(throttle.base_seconds > 0.0) {
            return Err(ConfigError::invalid("throttle.base_seconds", "must be positive"));
        }
        if !(throttle.max_seconds >= throttle.base_seconds) {
            return Err(ConfigError::invalid(
                "throttle.max_seconds",
                "must not be smaller than base_seconds",
            ));
        }
        if !(throttle.multiplier >= 1.0 && throttle.multiplier.is_finite()) {
            return Err(ConfigError::invalid("throttle.multiplier", "must be at least 1.0"));
        }
        if !(throttle.cooldown_seconds >= 0.0) {
            return Err(ConfigError::invalid("throttle.cooldown_seconds", "must not be negative"));
        }
        for (field, value) in [
            ("throttle.base_seconds", throttle.base_seconds),
            ("throttle.max_seconds", throttle.max_seconds),
            ("throttle.cooldown_seconds", throttle.cooldown_seconds),
        ] {
            if value > MAX_SECONDS {
                return Err(ConfigError::invalid(field, format!("{value} exceeds {MAX_SECONDS}")));
            }
        }

        if self.capture.source == CaptureSource::Files && self.capture.files.is_empty() {
            return Err(ConfigError::missing(
                "capture.files",
                "the files source needs at least one image path",
            ));
        }

        match self.automation.sink {
            AutomationSink::Command if self.automation.command.is_none() => {
                return Err(ConfigError::missing("automation.command", "required by the command sink"));
            }
            AutomationSink::Webhook if self.automation.url.is_none() => {
                return Err(ConfigError::missing("automation.url", "required by the webhook sink"));
            }
            _ => {}
        }
        if self.automation.channel_capacity == 0 {
            return Err(ConfigError::invalid("automation.channel_capacity", "must be at least 1"));
        }

        Ok(())
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.scan.cycle_interval_ms)
    }

    pub fn capture_freshness(&self) -> Duration {
        Duration::from_millis(self.scan.capture_freshness_ms)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_millis(self.ocr.timeout_ms)
    }

    pub fn lease_timeout(&self) -> Duration {
        Duration::from_millis(self.ocr.lease_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::throttle::CooldownPolicy;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "grid": { "rows": 4 },
            "throttle": { "cooldown_policy": "fixed" },
            "cache": { "ttl_seconds": null }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.grid.rows, 4);
        assert_eq!(config.grid.cols, 5);
        assert_eq!(config.throttle.cooldown_policy, CooldownPolicy::Fixed);
        assert_eq!(config.throttle.base_seconds, 5.0);
        assert_eq!(config.cache.ttl_seconds, None);
        assert_eq!(config.cache.max_entries, Some(1000));
        assert_eq!(config.matcher.trigger_phrases[0], "들어왔습니다");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_apply_and_ignore_garbage() {
        let vars: HashMap<&str, &str> = [
            ("JOINWATCH_CYCLE_MS", "120"),
            ("JOINWATCH_OCR_WORKERS", "not-a-number"),
            ("JOINWATCH_WEBHOOK_URL", "http://localhost:9000/hook"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.scan.cycle_interval_ms, 120);
        assert_eq!(config.ocr.workers, 2);
        assert_eq!(
            config.automation.url.as_deref(),
            Some("http://localhost:9000/hook")
        );
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut config = Config::default();
        config.cache.max_entries = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "cache.max_entries",
                ..
            })
        ));
    }

    #[test]
    fn test_change_threshold_range() {
        let mut config = Config::default();
        config.scan.change_threshold = 1.0;
        assert!(config.validate().is_err());

        config.scan.change_threshold = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_throttle_bounds() {
        let mut config = Config::default();
        config.throttle.max_seconds = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_durations_beyond_a_week() {
        let mut config = Config::default();
        config.cache.ttl_seconds = Some(1e30);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "cache.ttl_seconds",
                ..
            })
        ));

        let mut config = Config::default();
        config.throttle.max_seconds = 1e300;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "throttle.max_seconds",
                ..
            })
        ));

        let mut config = Config::default();
        config.throttle.cooldown_seconds = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.cache.preprocess_ttl_seconds = Some(MAX_SECONDS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bounded_secs_never_panics() {
        assert_eq!(bounded_secs(1.5), Duration::from_millis(1500));
        assert_eq!(bounded_secs(1e30), Duration::from_secs_f64(MAX_SECONDS));
        assert_eq!(bounded_secs(-3.0), Duration::ZERO);
        assert_eq!(bounded_secs(f64::INFINITY), Duration::from_secs_f64(MAX_SECONDS));
    }

    #[test]
    fn test_sinks_require_their_target() {
        let mut config = Config::default();
        config.automation.sink = AutomationSink::Webhook;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing {
                field: "automation.url",
                ..
            })
        ));

        config.automation.url = Some("http://localhost/hook".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_files_source_needs_paths() {
        let mut config = Config::default();
        config.capture.source = CaptureSource::Files;
        assert!(config.validate().is_err());

        config.capture.files = vec!["frame.png".to_string()];
        assert!(config.validate().is_ok());
    }
}
