//! Dialog domain tables
//!
//! Data the dialog engine matches and speaks, kept out of control flow so
//! new phrases ship as YAML rather than code.

mod extraction;
mod objections;
mod prompts;
mod scripts;

pub use extraction::{EntityRules, ReplyMoodRules, RoleVocabulary, SentimentRules, ToneLabels};
pub use objections::{ObjectionRule, ObjectionTable};
pub use prompts::{CallContext, PromptTemplates};
pub use scripts::{
    FallbackScripts, KeywordReply, LadderScripts, ShortAnswerRule, StageRules, StageScripts,
    TerminationRules, TurnBucket,
};

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use cold_call_core::{DialogStage, ObjectionCategory};

use crate::ConfigError;

/// Every table the dialog engine consults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogDomainConfig {
    pub context: CallContext,
    pub objections: ObjectionTable,
    pub roles: RoleVocabulary,
    pub entities: EntityRules,
    pub sentiment: SentimentRules,
    pub reply_mood: ReplyMoodRules,
    pub stages: StageRules,
    pub scripts: FallbackScripts,
    pub termination: TerminationRules,
    pub prompts: PromptTemplates,
}

impl DialogDomainConfig {
    /// Load from a YAML file; omitted sections keep their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;

        let domain: DialogDomainConfig = serde_yaml::from_str(&content)?;
        domain.validate()?;

        tracing::info!(
            path = %path.display(),
            objection_rules = domain.objections.rules.len(),
            company = %domain.context.company,
            "Loaded dialog domain tables"
        );

        Ok(domain)
    }

    /// Load from `path` when given, otherwise use the compiled defaults
    pub fn load_or_default(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Structural checks; regex syntax is checked where patterns are compiled
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_objections()?;
        self.validate_sentiment()?;
        self.validate_scripts()?;
        self.validate_termination()?;
        Ok(())
    }

    fn validate_objections(&self) -> Result<(), ConfigError> {
        let table = &self.objections;

        if !(table.confidence > 0.0 && table.confidence <= 1.0) {
            return Err(ConfigError::invalid(
                "objections.confidence",
                format!("must be in (0, 1], got {}", table.confidence),
            ));
        }

        if table.generic_rebuttal.trim().is_empty() {
            return Err(ConfigError::invalid(
                "objections.generic_rebuttal",
                "must not be empty",
            ));
        }

        let mut seen = HashSet::new();
        for rule in &table.rules {
            if !seen.insert(rule.category) {
                return Err(ConfigError::invalid(
                    "objections.rules",
                    format!("duplicate category '{}'", rule.category),
                ));
            }

            let borrows_gatekeepers = rule.category == ObjectionCategory::Secretary
                && !self.roles.gatekeepers.is_empty();
            if rule.patterns.is_empty() && !borrows_gatekeepers {
                return Err(ConfigError::invalid(
                    format!("objections.rules.{}", rule.category),
                    "needs at least one pattern",
                ));
            }

            if rule.rebuttals.iter().any(|r| r.trim().is_empty()) {
                return Err(ConfigError::invalid(
                    format!("objections.rules.{}", rule.category),
                    "rebuttals must not be blank",
                ));
            }
        }

        Ok(())
    }

    fn validate_sentiment(&self) -> Result<(), ConfigError> {
        let s = &self.sentiment;
        if s.short_threshold >= s.long_threshold {
            return Err(ConfigError::invalid(
                "sentiment.short_threshold",
                format!(
                    "must be below long_threshold ({} >= {})",
                    s.short_threshold, s.long_threshold
                ),
            ));
        }
        Ok(())
    }

    fn validate_scripts(&self) -> Result<(), ConfigError> {
        for stage in DialogStage::ALL {
            let replies = self.scripts.event_driven.for_stage(stage);
            if replies.is_empty() || replies[0].trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("scripts.event_driven.{}", stage),
                    "needs a non-empty first reply",
                ));
            }
        }

        let ladder = &self.scripts.turn_ladder;
        for (i, rule) in ladder.keyword_replies.iter().enumerate() {
            if rule.keywords.is_empty() || rule.replies.is_empty() {
                return Err(ConfigError::invalid(
                    format!("scripts.turn_ladder.keyword_replies[{}]", i),
                    "needs keywords and at least one reply",
                ));
            }
        }

        if ladder.short_answer.reply.trim().is_empty() {
            return Err(ConfigError::invalid(
                "scripts.turn_ladder.short_answer.reply",
                "must not be empty",
            ));
        }

        let ascending = ladder
            .turn_buckets
            .windows(2)
            .all(|pair| pair[0].until_turn < pair[1].until_turn);
        if !ascending {
            return Err(ConfigError::invalid(
                "scripts.turn_ladder.turn_buckets",
                "until_turn must be strictly ascending",
            ));
        }

        Ok(())
    }

    fn validate_termination(&self) -> Result<(), ConfigError> {
        let t = &self.termination;
        if t.termination_reply.trim().is_empty() {
            return Err(ConfigError::invalid(
                "termination.termination_reply",
                "must not be empty",
            ));
        }
        if t.limit_reply.trim().is_empty() {
            return Err(ConfigError::invalid(
                "termination.limit_reply",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_domain_is_valid() {
        let domain = DialogDomainConfig::default();
        assert!(domain.validate().is_ok());
        assert_eq!(domain.context.company, "TRANSTIREX");
    }

    #[test]
    fn test_load_partial_yaml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
context:
  company: "Acme Cargo"
sentiment:
  short_threshold: 3
  long_threshold: 80
termination:
  limit_reply: "До связи!"
"#
        )
        .unwrap();

        let domain = DialogDomainConfig::load(file.path()).unwrap();
        assert_eq!(domain.context.company, "Acme Cargo");
        assert_eq!(domain.context.persona_name, "Алёна");
        assert_eq!(domain.sentiment.long_threshold, 80);
        assert_eq!(domain.termination.limit_reply, "До связи!");
        assert_eq!(domain.objections.rules.len(), 6);
    }

    #[test]
    fn test_load_missing_file() {
        let result = DialogDomainConfig::load("/nonexistent/domain.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_validate_rejects_bad_tables() {
        let mut domain = DialogDomainConfig::default();
        domain.sentiment.short_threshold = 60;
        assert!(domain.validate().is_err());

        let mut domain = DialogDomainConfig::default();
        domain.objections.confidence = 0.0;
        assert!(domain.validate().is_err());

        let mut domain = DialogDomainConfig::default();
        let dup = domain.objections.rules[0].clone();
        domain.objections.rules.push(dup);
        assert!(domain.validate().is_err());

        let mut domain = DialogDomainConfig::default();
        domain.scripts.event_driven.closing.clear();
        assert!(domain.validate().is_err());

        let mut domain = DialogDomainConfig::default();
        domain.scripts.turn_ladder.turn_buckets.reverse();
        assert!(domain.validate().is_err());
    }

    #[test]
    fn test_secretary_borrows_gatekeeper_phrases() {
        let mut domain = DialogDomainConfig::default();
        assert!(domain.validate().is_ok());

        domain.roles.gatekeepers.clear();
        assert!(domain.validate().is_err());
    }
}
