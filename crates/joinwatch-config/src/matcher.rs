use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

fn default_trigger_phrases() -> Vec<String> {
    vec![
        "들어왔습니다".to_string(),
        "입장했습니다".to_string(),
        "참여했습니다".to_string(),
    ]
}

fn default_patterns() -> Vec<String> {
    vec![
        r".*님이\s*(채팅방에\s*)?(들어왔습니다|입장했습니다|참여했습니다)".to_string(),
        r".*(들어왔습니다|입장했습니다|참여했습니다)".to_string(),
        r".*님.*들어왔.*".to_string(),
    ]
}

fn default_fuzzy_threshold() -> f64 {
    0.7
}

fn default_decision_threshold() -> f64 {
    0.8
}

fn default_min_length() -> usize {
    3
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MatcherConfig {
    /// Canonical phrases whose appearance triggers an action
    #[serde(default = "default_trigger_phrases")]
    pub trigger_phrases: Vec<String>,
    /// Keywords for containment scoring, trigger phrases when empty
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Regex templates of acceptable phrasings
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
    /// Extra garbled -> correct substitutions on top of the built-in table
    #[serde(default)]
    pub corrections: BTreeMap<String, String>,
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    #[serde(default = "default_decision_threshold")]
    pub decision_threshold: f64,
    /// Shorter recognitions are rejected before any correction
    #[serde(default = "default_min_length")]
    pub min_length: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            trigger_phrases: default_trigger_phrases(),
            keywords: vec![],
            patterns: default_patterns(),
            corrections: BTreeMap::new(),
            fuzzy_threshold: default_fuzzy_threshold(),
            decision_threshold: default_decision_threshold(),
            min_length: default_min_length(),
        }
    }
}

impl MatcherConfig {
    pub fn effective_keywords(&self) -> &[String] {
        if self.keywords.is_empty() {
            &self.trigger_phrases
        } else {
            &self.keywords
        }
    }
}
