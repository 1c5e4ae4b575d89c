//! Objection classification
//!
//! Every category is tested against the lower-cased utterance; the primary
//! category is the first match in table order.

use regex::Regex;
use serde::{Deserialize, Serialize};

use cold_call_config::{ObjectionTable, RoleVocabulary};
use cold_call_core::ObjectionCategory;

use crate::phrases::compile;
use crate::Result;

/// Outcome of classifying one utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Option<ObjectionCategory>,
    /// Every detected category, in table order
    pub all_matches: Vec<ObjectionCategory>,
    pub rebuttal: Option<String>,
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn none() -> Self {
        Self {
            category: None,
            all_matches: Vec::new(),
            rebuttal: None,
            confidence: 0.0,
        }
    }

    pub fn is_objection(&self) -> bool {
        self.category.is_some()
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    category: ObjectionCategory,
    patterns: Vec<Regex>,
    rebuttal: Option<String>,
}

/// Pattern-table objection classifier
#[derive(Debug, Clone)]
pub struct ObjectionClassifier {
    rules: Vec<CompiledRule>,
    generic_rebuttal: String,
    confidence: f32,
}

impl Default for ObjectionClassifier {
    fn default() -> Self {
        // Compiled defaults are known-good patterns.
        Self::new(&ObjectionTable::default(), &RoleVocabulary::default())
            .expect("default objection patterns compile")
    }
}

impl ObjectionClassifier {
    /// Compile the table; gatekeeper phrases extend the `secretary` rule
    pub fn new(table: &ObjectionTable, roles: &RoleVocabulary) -> Result<Self> {
        let mut rules = Vec::with_capacity(table.rules.len());

        for rule in &table.rules {
            let field = format!("objections.{}", rule.category);
            let mut patterns = rule
                .patterns
                .iter()
                .map(|p| compile(&field, &p.to_lowercase()))
                .collect::<Result<Vec<_>>>()?;

            if rule.category == ObjectionCategory::Secretary {
                for phrase in &roles.gatekeepers {
                    patterns.push(compile(
                        "roles.gatekeepers",
                        &regex::escape(&phrase.to_lowercase()),
                    )?);
                }
            }

            rules.push(CompiledRule {
                category: rule.category,
                patterns,
                rebuttal: rule.rebuttals.first().cloned(),
            });
        }

        Ok(Self {
            rules,
            generic_rebuttal: table.generic_rebuttal.clone(),
            confidence: table.confidence,
        })
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        let lower = text.to_lowercase();

        let all_matches: Vec<ObjectionCategory> = self
            .rules
            .iter()
            .filter(|rule| rule.patterns.iter().any(|p| p.is_match(&lower)))
            .map(|rule| rule.category)
            .collect();

        let Some(&primary) = all_matches.first() else {
            return ClassificationResult::none();
        };

        tracing::debug!(
            category = %primary,
            matches = all_matches.len(),
            "Objection detected"
        );

        ClassificationResult {
            category: Some(primary),
            rebuttal: Some(self.rebuttal_for(primary).to_string()),
            all_matches,
            confidence: self.confidence,
        }
    }

    /// Scripted rebuttal for a category, or the generic one
    pub fn rebuttal_for(&self, category: ObjectionCategory) -> &str {
        self.rules
            .iter()
            .find(|r| r.category == category)
            .and_then(|r| r.rebuttal.as_deref())
            .unwrap_or(&self.generic_rebuttal)
    }
}
