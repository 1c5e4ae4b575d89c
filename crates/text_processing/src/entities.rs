//! Contact entity extraction
//!
//! Finds emails, Russian phone numbers and introduced names in callee speech,
//! and flags mentions of someone with authority over logistics.
//!
//! # Example
//!
//! ```ignore
//! use cold_call_text_processing::EntityExtractor;
//!
//! let extractor = EntityExtractor::default();
//! let entities = extractor.extract("Пишите на ivan@cargo.ru, зовут Иван");
//!
//! assert_eq!(entities.emails, vec!["ivan@cargo.ru"]);
//! assert_eq!(entities.names, vec!["Иван"]);
//! ```

use regex::Regex;

use cold_call_config::{EntityRules, RoleVocabulary};
use cold_call_core::ContactEntities;

use crate::phrases::{compile, PhraseSet};
use crate::Result;

/// Pure, config-driven contact extractor
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    email: Regex,
    phone: Regex,
    names: Vec<Regex>,
    decision_makers: PhraseSet,
    gatekeepers: PhraseSet,
}

impl Default for EntityExtractor {
    fn default() -> Self {
        // Compiled defaults are known-good patterns.
        Self::new(&EntityRules::default(), &RoleVocabulary::default())
            .expect("default entity patterns compile")
    }
}

impl EntityExtractor {
    pub fn new(rules: &EntityRules, roles: &RoleVocabulary) -> Result<Self> {
        let names = rules
            .name_patterns
            .iter()
            .map(|p| compile("entities.name_patterns", p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            email: compile("entities.email_pattern", &rules.email_pattern)?,
            phone: compile("entities.phone_pattern", &rules.phone_pattern)?,
            names,
            decision_makers: PhraseSet::substring(&roles.decision_makers),
            gatekeepers: PhraseSet::substring(&roles.gatekeepers),
        })
    }

    /// Extract every contact entity from `text`
    pub fn extract(&self, text: &str) -> ContactEntities {
        ContactEntities {
            emails: self.extract_emails(text),
            phones: self.extract_phones(text),
            names: self.extract_names(text),
            has_decision_maker: self.mentions_decision_maker(text),
        }
    }

    pub fn extract_emails(&self, text: &str) -> Vec<String> {
        self.email
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// Phone numbers with separators removed, prefix kept
    pub fn extract_phones(&self, text: &str) -> Vec<String> {
        self.phone
            .captures_iter(text)
            .map(|caps| {
                caps.iter()
                    .skip(1)
                    .flatten()
                    .map(|group| group.as_str())
                    .collect::<String>()
            })
            .filter(|phone| !phone.is_empty())
            .collect()
    }

    pub fn extract_names(&self, text: &str) -> Vec<String> {
        self.names
            .iter()
            .flat_map(|pattern| {
                pattern
                    .captures_iter(text)
                    .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Authority keyword present outside of any gatekeeper phrase
    pub fn mentions_decision_maker(&self, text: &str) -> bool {
        let mut lower = text.to_lowercase();
        for phrase in self.gatekeepers.phrases() {
            lower = lower.replace(phrase.as_str(), " ");
        }
        self.decision_makers.matches(&lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_email() {
        let extractor = EntityExtractor::default();
        let entities = extractor.extract("Пишите на Logist@Cargo-Trans.RU пожалуйста");
        assert_eq!(entities.emails, vec!["Logist@Cargo-Trans.RU"]);
        assert!(entities.has_reachable_contact());
    }

    #[test]
    fn test_extract_phone_normalized() {
        let extractor = EntityExtractor::default();

        let phones = extractor.extract_phones("звоните +7 (916) 123-45-67 или 8 916 765 43 21");
        assert_eq!(phones, vec!["+79161234567", "89167654321"]);
    }

    #[test]
    fn test_extract_names() {
        let extractor = EntityExtractor::default();

        let names = extractor.extract_names("Меня зовут Ольга, а Сергей отвечает за доставку");
        assert_eq!(names, vec!["Ольга", "Сергей"]);

        // Lower-case tokens are not names
        assert!(extractor.extract_names("это неважно").is_empty());
    }

    #[test]
    fn test_decision_maker_flag() {
        let extractor = EntityExtractor::default();

        assert!(extractor.mentions_decision_maker("Я директор по логистике"));
        assert!(extractor.mentions_decision_maker("Иван отвечает за поставки"));
        assert!(!extractor.mentions_decision_maker("Я не принимаю решения"));
        assert!(!extractor.mentions_decision_maker("Алло"));
    }

    #[test]
    fn test_empty_and_malformed_input() {
        let extractor = EntityExtractor::default();

        assert_eq!(extractor.extract(""), ContactEntities::default());
        assert_eq!(extractor.extract("@@@ +7 ((( ..."), ContactEntities::default());
    }

    #[test]
    fn test_extract_is_deterministic() {
        let extractor = EntityExtractor::default();
        let text = "Меня зовут Анна, почта anna@firm.ru, телефон 89161234567, я руководитель";

        let first = extractor.extract(text);
        let second = extractor.extract(text);
        assert_eq!(first, second);
        assert!(first.has_decision_maker);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let rules = EntityRules {
            email_pattern: "[".to_string(),
            ..EntityRules::default()
        };
        assert!(EntityExtractor::new(&rules, &RoleVocabulary::default()).is_err());
    }
}
