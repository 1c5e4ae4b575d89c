//! Text processing for callee speech
//!
//! This crate provides the pure, config-driven analyzers the dialog engine
//! runs on every utterance:
//! - **Entity Extraction**: emails, phone numbers, names, decision-maker mentions
//! - **Objection Classification**: pattern-table categories with scripted rebuttals
//! - **Tone Heuristics**: callee tone labels and the mood of the agent's reply
//!
//! All pattern tables come from [`cold_call_config::DialogDomainConfig`] and
//! are compiled once; a malformed pattern is reported at construction.
//!
//! # Example
//!
//! ```ignore
//! use cold_call_config::DialogDomainConfig;
//! use cold_call_text_processing::TextAnalyzers;
//!
//! let analyzers = TextAnalyzers::from_domain(&DialogDomainConfig::default())?;
//! let result = analyzers.objections.classify("у нас уже есть перевозчик");
//! ```

pub mod entities;
pub mod objections;
pub mod phrases;
pub mod sentiment;

mod error;

pub use entities::EntityExtractor;
pub use error::{Result, TextProcessingError};
pub use objections::{ClassificationResult, ObjectionClassifier};
pub use phrases::PhraseSet;
pub use sentiment::{Engagement, NextAction, ReplyMood, ReplyMoodAnalyzer, SentimentAnalyzer, Tone};

use cold_call_config::DialogDomainConfig;

/// Every analyzer built from one set of domain tables
#[derive(Debug, Clone)]
pub struct TextAnalyzers {
    pub entities: EntityExtractor,
    pub objections: ObjectionClassifier,
    pub sentiment: SentimentAnalyzer,
    pub reply_mood: ReplyMoodAnalyzer,
}

impl TextAnalyzers {
    pub fn from_domain(domain: &DialogDomainConfig) -> Result<Self> {
        Ok(Self {
            entities: EntityExtractor::new(&domain.entities, &domain.roles)?,
            objections: ObjectionClassifier::new(&domain.objections, &domain.roles)?,
            sentiment: SentimentAnalyzer::new(&domain.sentiment),
            reply_mood: ReplyMoodAnalyzer::new(&domain.reply_mood),
        })
    }
}
