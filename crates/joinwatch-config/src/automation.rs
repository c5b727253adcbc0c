use serde::{Deserialize, Serialize};

fn default_timeout_ms() -> u64 {
    5000
}

fn default_channel_capacity() -> usize {
    64
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AutomationSink {
    /// Only log detections
    #[default]
    Log,
    /// Spawn a program per detection
    Command,
    /// POST each detection as JSON
    Webhook,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AutomationConfig {
    pub sink: AutomationSink,
    pub command: Option<String>,
    /// Arguments with `{region}`, `{x}`, `{y}` and `{text}` placeholders
    pub args: Vec<String>,
    pub url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bounded handoff queue between the scheduler and the action sink
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            sink: AutomationSink::default(),
            command: None,
            args: vec![],
            url: None,
            timeout_ms: default_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}
