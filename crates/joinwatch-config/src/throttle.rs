use serde::{Deserialize, Serialize};

fn default_base_seconds() -> f64 {
    5.0
}

fn default_max_seconds() -> f64 {
    60.0
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_cooldown_seconds() -> f64 {
    5.0
}

fn default_cleanup_max_age_hours() -> u64 {
    24
}

/// How long a region stays in cooldown after it fired
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CooldownPolicy {
    /// Use the throttler's current backoff
    #[default]
    Backoff,
    /// Always use `cooldown_seconds`
    Fixed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ThrottleConfig {
    #[serde(default = "default_base_seconds")]
    pub base_seconds: f64,
    #[serde(default = "default_max_seconds")]
    pub max_seconds: f64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    pub cooldown_policy: CooldownPolicy,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: f64,
    /// Throttle records untouched for longer than this are dropped
    #[serde(default = "default_cleanup_max_age_hours")]
    pub cleanup_max_age_hours: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            base_seconds: default_base_seconds(),
            max_seconds: default_max_seconds(),
            multiplier: default_multiplier(),
            cooldown_policy: CooldownPolicy::default(),
            cooldown_seconds: default_cooldown_seconds(),
            cleanup_max_age_hours: default_cleanup_max_age_hours(),
        }
    }
}
