//! Compiled keyword and pattern lists

use regex::Regex;

use crate::{Result, TextProcessingError};

/// Compile one configured regex, naming the table it came from on failure
pub(crate) fn compile(table: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| TextProcessingError::InvalidPattern {
        table: table.to_string(),
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// A list of phrases matched case-insensitively
///
/// `substring` sets match anywhere in the text; `whole_word` sets only match
/// on word boundaries, so "пока" does not fire inside "покажите".
#[derive(Debug, Clone)]
pub struct PhraseSet {
    phrases: Vec<String>,
    bounded: Option<Regex>,
}

impl PhraseSet {
    pub fn substring(phrases: &[String]) -> Self {
        Self {
            phrases: normalize(phrases),
            bounded: None,
        }
    }

    pub fn whole_word(table: &str, phrases: &[String]) -> Result<Self> {
        let phrases = normalize(phrases);
        let bounded = if phrases.is_empty() {
            None
        } else {
            let alternation = phrases
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            Some(compile(table, &format!(r"(?i)\b(?:{})\b", alternation))?)
        };
        Ok(Self { phrases, bounded })
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// Any phrase occurs in `text`
    pub fn matches(&self, text: &str) -> bool {
        match &self.bounded {
            Some(regex) => regex.is_match(text),
            None if self.phrases.is_empty() => false,
            None => {
                let lower = text.to_lowercase();
                self.phrases.iter().any(|p| lower.contains(p.as_str()))
            }
        }
    }

    /// Number of distinct phrases present in `text`
    pub fn count(&self, text: &str) -> usize {
        if let Some(regex) = &self.bounded {
            let lower = text.to_lowercase();
            let mut found: Vec<&str> = regex.find_iter(&lower).map(|m| m.as_str()).collect();
            found.sort_unstable();
            found.dedup();
            return found.len();
        }
        let lower = text.to_lowercase();
        self.phrases
            .iter()
            .filter(|p| lower.contains(p.as_str()))
            .count()
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }
}

fn normalize(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}
