//! Custom Pattern Matching
//!
//! Mỗi enabled pattern được so với signals của lần scan hiện tại.
//! Literal = case-insensitive substring, regex = `regex::Regex::is_match`.
//! Mỗi pattern match tối đa một lần / scan.

use chrono::{DateTime, Utc};
use regex::Regex;

use super::types::{CustomThreatPattern, SecurityThreat, ThreatDetails, ThreatType};

pub enum PatternMatcher {
    Literal(String),
    Regex(Regex),
}

impl PatternMatcher {
    pub fn compile(pattern: &CustomThreatPattern) -> Result<Self, regex::Error> {
        if pattern.is_regex {
            Ok(PatternMatcher::Regex(Regex::new(&pattern.pattern)?))
        } else {
            Ok(PatternMatcher::Literal(pattern.pattern.to_lowercase()))
        }
    }

    pub fn is_match(&self, signal: &str) -> bool {
        match self {
            PatternMatcher::Literal(needle) => {
                !needle.is_empty() && signal.to_lowercase().contains(needle.as_str())
            }
            PatternMatcher::Regex(re) => re.is_match(signal),
        }
    }
}

/// Evaluate enabled patterns, ordered by id. Patterns that fail to compile are skipped.
pub fn match_patterns<'a, I>(patterns: I, signals: &[String], now: DateTime<Utc>) -> Vec<SecurityThreat>
where
    I: IntoIterator<Item = &'a CustomThreatPattern>,
{
    let mut enabled: Vec<&CustomThreatPattern> =
        patterns.into_iter().filter(|p| p.enabled).collect();
    enabled.sort_by(|a, b| a.id.cmp(&b.id));

    let mut found = Vec::new();

    for pattern in enabled {
        let matcher = match PatternMatcher::compile(pattern) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Skipping custom pattern '{}': {}", pattern.id, e);
                continue;
            }
        };

        if let Some(signal) = signals.iter().find(|s| matcher.is_match(s)) {
            log::info!("Custom pattern '{}' matched signal '{}'", pattern.name, signal);
            found.push(
                SecurityThreat::new(
                    ThreatType::Custom,
                    pattern.severity,
                    format!("Custom pattern matched: {}", pattern.name),
                    now,
                )
                .with_pattern(pattern.id.clone())
                .with_details(ThreatDetails::PatternMatch {
                    pattern: pattern.pattern.clone(),
                    signal: signal.clone(),
                }),
            );
        }
    }

    found
}
