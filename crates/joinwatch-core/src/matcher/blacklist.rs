use std::fmt;

use regex::Regex;
use serde::Serialize;

/// Why a recognition was rejected before any correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistReason {
    Empty,
    Time,
    Date,
    Numeric,
    AsciiOnly,
    TooShort,
}

impl fmt::Display for BlacklistReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            BlacklistReason::Empty => "empty",
            BlacklistReason::Time => "time stamp",
            BlacklistReason::Date => "date",
            BlacklistReason::Numeric => "numerals only",
            BlacklistReason::AsciiOnly => "ascii only",
            BlacklistReason::TooShort => "too short",
        };
        f.write_str(reason)
    }
}

/// Rules that reject chat chrome (timestamps, dates, counters) outright
pub struct Blacklist {
    time: Regex,
    date: Regex,
    numeric: Regex,
    reject_ascii: bool,
    min_length: usize,
}

impl Blacklist {
    /// ASCII-only text is rejected when any target phrase is non-ASCII
    pub fn new(phrases: &[String], min_length: usize) -> Result<Self, regex::Error> {
        Ok(Self {
            time: Regex::new(r"^\d{1,2}:\d{2}(:\d{2})?$")?,
            date: Regex::new(r"^\d{4}[-./]\d{1,2}[-./]\d{1,2}$")?,
            numeric: Regex::new(r"^[\d\s.,:/\-]+$")?,
            reject_ascii: phrases.iter().any(|p| !p.is_ascii()),
            min_length,
        })
    }

    pub fn check(&self, text: &str) -> Option<BlacklistReason> {
        let text = text.trim();

        if text.is_empty() {
            return Some(BlacklistReason::Empty);
        }
        if self.time.is_match(text) {
            return Some(BlacklistReason::Time);
        }
        if self.date.is_match(text) {
            return Some(BlacklistReason::Date);
        }
        if self.numeric.is_match(text) {
            return Some(BlacklistReason::Numeric);
        }
        if self.reject_ascii && text.is_ascii() {
            return Some(BlacklistReason::AsciiOnly);
        }
        if text.chars().count() < self.min_length {
            return Some(BlacklistReason::TooShort);
        }

        None
    }
}
