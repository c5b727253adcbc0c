use joinwatch_config::matcher::MatcherConfig;
use joinwatch_types::OcrCandidate;
use regex::Regex;
use serde::Serialize;

use super::blacklist::{Blacklist, BlacklistReason};
use super::correction::TextNormalizer;
use super::similarity::ratio;
use crate::error::CoreError;

const CONFIDENCE_WEIGHT: f64 = 0.6;
const SCORE_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum Verdict {
    /// A canonical phrase occurs verbatim in the corrected text
    Exact,
    /// Combined score cleared the decision threshold
    Scored,
    NoMatch,
    Blacklisted(BlacklistReason),
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub is_match: bool,
    pub phrase: Option<String>,
    pub normalized: String,
    pub pattern_score: f64,
    pub keyword_score: f64,
    pub verdict: Verdict,
}

impl MatchOutcome {
    /// `max(pattern, keyword)`
    pub fn score(&self) -> f64 {
        self.pattern_score.max(self.keyword_score)
    }

    fn blacklisted(reason: BlacklistReason) -> Self {
        Self {
            is_match: false,
            phrase: None,
            normalized: String::new(),
            pattern_score: 0.0,
            keyword_score: 0.0,
            verdict: Verdict::Blacklisted(reason),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MatcherStats {
    pub trigger_phrases: usize,
    pub keywords: usize,
    pub patterns: usize,
    pub corrections: usize,
}

/// Decides whether a recognized line announces one of the trigger phrases
pub struct PatternMatcher {
    normalizer: TextNormalizer,
    blacklist: Blacklist,
    patterns: Vec<Regex>,
    keywords: Vec<String>,
    decision_threshold: f64,
}

impl PatternMatcher {
    pub fn new(config: &MatcherConfig) -> Result<Self, CoreError> {
        let patterns = config
            .patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            normalizer: TextNormalizer::from_config(config)?,
            blacklist: Blacklist::new(&config.trigger_phrases, config.min_length)?,
            patterns,
            keywords: config.effective_keywords().to_vec(),
            decision_threshold: config.decision_threshold,
        })
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// `(is_match, matched_phrase)`
    pub fn matches(&self, text: &str) -> (bool, Option<String>) {
        let outcome = self.evaluate(text);
        (outcome.is_match, outcome.phrase)
    }

    pub fn evaluate(&self, text: &str) -> MatchOutcome {
        if let Some(reason) = self.blacklist.check(text) {
            tracing::debug!("[MATCHER] '{text}' rejected: {reason}");
            return MatchOutcome::blacklisted(reason);
        }

        let normalized = self.normalizer.normalize(text);
        let pattern_score = self.pattern_score(&normalized);
        let keyword_score = self.keyword_score(&normalized);

        let verbatim = self
            .normalizer
            .phrases()
            .iter()
            .find(|phrase| normalized.contains(phrase.as_str()))
            .cloned();

        let (verdict, phrase) = match verbatim {
            Some(phrase) => (Verdict::Exact, Some(phrase)),
            None if pattern_score.max(keyword_score) > self.decision_threshold => {
                (Verdict::Scored, self.closest_phrase(&normalized))
            }
            None => (Verdict::NoMatch, None),
        };

        let is_match = phrase.is_some();
        if is_match {
            tracing::debug!("[MATCHER] '{text}' -> '{normalized}' matched {phrase:?} ({verdict:?})");
        }

        MatchOutcome {
            is_match,
            phrase,
            normalized,
            pattern_score,
            keyword_score,
            verdict,
        }
    }

    /// Picks one candidate out of several lines recognized in the same crop:
    /// blacklisted lines are dropped, the rest ranked by
    /// `confidence * 0.6 + score * 0.4`, ties going to the higher score.
    pub fn select_candidate<'a>(
        &self,
        candidates: &'a [OcrCandidate],
    ) -> Option<(&'a OcrCandidate, MatchOutcome)> {
        candidates
            .iter()
            .map(|candidate| (candidate, self.evaluate(&candidate.text)))
            .filter(|(_, outcome)| !matches!(outcome.verdict, Verdict::Blacklisted(_)))
            .max_by(|(ca, a), (cb, b)| {
                let blend_a = ca.confidence as f64 * CONFIDENCE_WEIGHT + a.score() * SCORE_WEIGHT;
                let blend_b = cb.confidence as f64 * CONFIDENCE_WEIGHT + b.score() * SCORE_WEIGHT;
                blend_a
                    .total_cmp(&blend_b)
                    .then(a.score().total_cmp(&b.score()))
            })
    }

    pub fn stats(&self) -> MatcherStats {
        MatcherStats {
            trigger_phrases: self.normalizer.phrases().len(),
            keywords: self.keywords.len(),
            patterns: self.patterns.len(),
            corrections: self.normalizer.correction_count(),
        }
    }

    /// Share of the text covered by the best matching template
    fn pattern_score(&self, text: &str) -> f64 {
        let total = text.chars().count();
        if total == 0 {
            return 0.0;
        }

        self.patterns
            .iter()
            .filter_map(|pattern| pattern.find(text))
            .map(|m| m.as_str().chars().count() as f64 / total as f64)
            .fold(0.0, f64::max)
    }

    /// 1.0 on containment, otherwise the best token similarity
    fn keyword_score(&self, text: &str) -> f64 {
        self.keywords
            .iter()
            .map(|keyword| {
                if text.contains(keyword.as_str()) {
                    1.0
                } else {
                    text.split_whitespace()
                        .map(|token| ratio(token, keyword))
                        .fold(0.0, f64::max)
                }
            })
            .fold(0.0, f64::max)
    }

    fn closest_phrase(&self, text: &str) -> Option<String> {
        self.normalizer
            .phrases()
            .iter()
            .map(|phrase| {
                let best = text
                    .split_whitespace()
                    .map(|token| ratio(token, phrase))
                    .fold(ratio(text, phrase), f64::max);
                (phrase, best)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(phrase, _)| phrase.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PatternMatcher {
        PatternMatcher::new(&MatcherConfig::default()).unwrap()
    }

    #[test]
    fn test_exact_phrase_matches() {
        let (is_match, phrase) = matcher().matches("들어왔습니다");
        assert!(is_match);
        assert_eq!(phrase.as_deref(), Some("들어왔습니다"));
    }

    #[test]
    fn test_garbled_phrase_is_corrected_then_matched() {
        let outcome = matcher().evaluate("들머왔습니다");
        assert!(outcome.is_match);
        assert_eq!(outcome.normalized, "들어왔습니다");
        assert_eq!(outcome.verdict, Verdict::Exact);
    }

    #[test]
    fn test_time_is_blacklisted_without_scoring() {
        let outcome = matcher().evaluate("12:45");
        assert!(!outcome.is_match);
        assert_eq!(outcome.verdict, Verdict::Blacklisted(BlacklistReason::Time));
        assert_eq!(outcome.score(), 0.0);
        assert!(outcome.normalized.is_empty());
    }

    #[test]
    fn test_join_notice_with_name() {
        let (is_match, phrase) = matcher().matches("김철수님이 채팅방에 입장했습니다.");
        assert!(is_match);
        assert_eq!(phrase.as_deref(), Some("입장했습니다"));
    }

    #[test]
    fn test_template_only_match_is_scored() {
        // No phrase verbatim, but the whole line fits `.*님.*들어왔.*`
        let outcome = matcher().evaluate("영희님 들어왔어요");
        assert_eq!(outcome.verdict, Verdict::Scored);
        assert_eq!(outcome.phrase.as_deref(), Some("들어왔습니다"));
        assert_eq!(outcome.pattern_score, 1.0);
    }

    #[test]
    fn test_ordinary_chat_does_not_match() {
        let outcome = matcher().evaluate("오늘 점심 뭐 먹을까요");
        assert!(!outcome.is_match);
        assert_eq!(outcome.verdict, Verdict::NoMatch);
    }

    #[test]
    fn test_select_candidate_prefers_blend() {
        let candidates = vec![
            OcrCandidate::new("12:45", 0.99),
            OcrCandidate::new("오늘 점심 뭐 먹을까요", 0.95),
            OcrCandidate::new("홍길동님이 들어왔습니다", 0.7),
        ];

        let (chosen, outcome) = matcher().select_candidate(&candidates).unwrap();
        assert_eq!(chosen.text, "홍길동님이 들어왔습니다");
        assert!(outcome.is_match);
    }

    #[test]
    fn test_select_candidate_all_blacklisted() {
        let candidates = vec![OcrCandidate::new("12:45", 0.9), OcrCandidate::new("", 0.9)];
        assert!(matcher().select_candidate(&candidates).is_none());
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let config = MatcherConfig {
            patterns: vec!["(unclosed".to_string()],
            ..MatcherConfig::default()
        };
        assert!(matches!(
            PatternMatcher::new(&config),
            Err(CoreError::Pattern(_))
        ));
    }
}
