use std::collections::HashSet;

use joinwatch_config::matcher::MatcherConfig;
use unicode_normalization::UnicodeNormalization;

use super::similarity::ratio;
use crate::error::CoreError;

/// Backstop against a rule table whose rewrites keep growing the text
const MAX_PASSES: usize = 64;

/// Garbled recognitions observed in the wild and their intended phrase
const DEFAULT_CORRECTIONS: &[(&str, &str)] = &[
    ("들머왔습니다", "들어왔습니다"),
    ("둘어왔습니다", "들어왔습니다"),
    ("들어왔시니다", "들어왔습니다"),
    ("들어왔느니다", "들어왔습니다"),
    ("들어왔습니타", "들어왔습니다"),
    ("들어왔스니다", "들어왔습니다"),
    ("들어왔슴니다", "들어왔습니다"),
    ("들어왔읍니다", "들어왔습니다"),
    ("들어왔ㅅ니다", "들어왔습니다"),
    ("들어왔ㅁ니다", "들어왔습니다"),
    ("들어왔7니다", "들어왔습니다"),
    ("들어왔5니다", "들어왔습니다"),
    ("틀어왔습니다", "들어왔습니다"),
    ("들머왔읍니다", "들어왔습니다"),
    ("들어와습니다", "들어왔습니다"),
    ("들어왔슴다", "들어왔습니다"),
    ("들어왔니다", "들어왔습니다"),
    ("든어왔습니다", "들어왔습니다"),
    ("들어왔습니디", "들어왔습니다"),
    ("들어완습니다", "들어왔습니다"),
    ("툴어왔습니다", "들어왔습니다"),
    ("입정했습니다", "입장했습니다"),
    ("입장햤습니다", "입장했습니다"),
    ("입장했스니다", "입장했습니다"),
    ("입장했슴니다", "입장했습니다"),
    ("입장했읍니다", "입장했습니다"),
    ("입잠했습니다", "입장했습니다"),
    ("입창했습니다", "입장했습니다"),
    ("참어했습니다", "참여했습니다"),
    ("참여햤습니다", "참여했습니다"),
    ("참여했스니다", "참여했습니다"),
    ("참여했슴니다", "참여했습니다"),
    ("참여했읍니다", "참여했습니다"),
    ("잠여했습니다", "참여했습니다"),
    ("참야했습니다", "참여했습니다"),
];

/// Repairs known recognition noise so that target phrases can be found verbatim.
///
/// A pass is NFC, punctuation stripping, whitespace collapse, exact
/// corrections (longest key first) and fuzzy phrase snapping. `normalize`
/// repeats passes until one changes nothing. Should the passes instead revisit
/// an earlier text, the smallest text of that cycle is returned; every member
/// of the cycle leads back to it, so the result is still idempotent.
///
/// Rules are checked on insertion: a replacement may not contain any key, and
/// a key may not occur inside a replacement or a trigger phrase.
pub struct TextNormalizer {
    corrections: Vec<(String, String)>,
    phrases: Vec<String>,
    fuzzy_threshold: f64,
}

impl TextNormalizer {
    pub fn new(phrases: Vec<String>, fuzzy_threshold: f64) -> Self {
        let mut normalizer = Self {
            corrections: Vec::new(),
            phrases,
            fuzzy_threshold,
        };

        for (from, to) in DEFAULT_CORRECTIONS {
            if let Err(e) = normalizer.add_correction(from, to) {
                tracing::debug!("[MATCHER] built-in correction skipped: {e}");
            }
        }

        normalizer
    }

    pub fn from_config(config: &MatcherConfig) -> Result<Self, CoreError> {
        let mut normalizer = Self::new(config.trigger_phrases.clone(), config.fuzzy_threshold);
        for (from, to) in &config.corrections {
            normalizer.add_correction(from, to)?;
        }
        Ok(normalizer)
    }

    /// Adds or replaces a garbled -> correct substitution
    pub fn add_correction(&mut self, from: &str, to: &str) -> Result<(), CoreError> {
        let from = clean(from);
        let to = clean(to);
        let reject = |reason| CoreError::Correction {
            from: from.clone(),
            reason,
        };

        if from.is_empty() {
            return Err(reject("empty key"));
        }
        if from == to {
            return Ok(());
        }
        if self.phrases.iter().any(|p| p.contains(from.as_str())) {
            return Err(reject("key occurs inside a trigger phrase"));
        }
        if to.contains(from.as_str())
            || self
                .corrections
                .iter()
                .any(|(key, _)| *key != from && to.contains(key.as_str()))
        {
            return Err(reject("replacement contains a correction key"));
        }
        if self
            .corrections
            .iter()
            .any(|(key, value)| *key != from && value.contains(from.as_str()))
        {
            return Err(reject("key occurs inside another replacement"));
        }

        match self.corrections.iter_mut().find(|(key, _)| *key == from) {
            Some(entry) => entry.1 = to,
            None => self.corrections.push((from, to)),
        }

        // Longest key first so that a short key never splits a longer match
        self.corrections
            .sort_by(|(a, _), (b, _)| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        Ok(())
    }

    pub fn correction_count(&self) -> usize {
        self.corrections.len()
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn normalize(&self, text: &str) -> String {
        let mut current = clean(text);
        let mut seen = HashSet::new();

        for _ in 0..MAX_PASSES {
            let next = self.pass(&current);
            if next == current {
                return next;
            }
            seen.insert(current);
            if seen.contains(&next) {
                return self.cycle_representative(next);
            }
            current = next;
        }

        tracing::warn!("[MATCHER] normalization did not settle for '{text}'");
        current
    }

    /// Smallest text on the cycle that `start` belongs to
    fn cycle_representative(&self, start: String) -> String {
        let mut smallest = start.clone();
        let mut current = self.pass(&start);
        while current != start {
            if current < smallest {
                smallest = current.clone();
            }
            current = self.pass(&current);
        }
        smallest
    }

    fn pass(&self, text: &str) -> String {
        let corrected = self.apply_corrections(text);
        let snapped = self.snap_to_phrases(&corrected);
        clean(&snapped)
    }

    fn apply_corrections(&self, text: &str) -> String {
        let mut text = text.to_string();
        for (from, to) in &self.corrections {
            if text.contains(from.as_str()) {
                text = text.replace(from.as_str(), to);
            }
        }
        text
    }

    /// Replaces a token, or the whole text, by the phrase it most resembles
    fn snap_to_phrases(&self, text: &str) -> String {
        if self.phrases.iter().any(|p| text.contains(p.as_str())) {
            return text.to_string();
        }

        let compact: String = text.split_whitespace().collect();
        if let Some(phrase) = self.closest_phrase(&compact) {
            return phrase.to_string();
        }

        text.split_whitespace()
            .map(|token| self.closest_phrase(token).unwrap_or(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn closest_phrase(&self, candidate: &str) -> Option<&str> {
        self.phrases
            .iter()
            .map(|phrase| (phrase, ratio(candidate, phrase)))
            .filter(|(_, score)| *score > self.fuzzy_threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(phrase, _)| phrase.as_str())
    }
}

/// NFC, keep only alphanumerics and whitespace, collapse whitespace
fn clean(text: &str) -> String {
    let filtered: String = text
        .nfc()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}
