//! Tone and engagement heuristics
//!
//! `SentimentAnalyzer` labels what the callee said; `ReplyMoodAnalyzer`
//! labels what the agent is about to say, to color synthesized speech.

use serde::{Deserialize, Serialize};

use cold_call_config::{ReplyMoodRules, SentimentRules, ToneLabels};
use cold_call_core::EmotionHint;

use crate::phrases::PhraseSet;

/// Callee tone, first matching rule wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Brief,
    Detailed,
    Emphatic,
    Questioning,
    Positive,
    Negative,
    Emotional,
    NeutralQuestioning,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Brief => "brief",
            Tone::Detailed => "detailed",
            Tone::Emphatic => "emphatic",
            Tone::Questioning => "questioning",
            Tone::Positive => "positive",
            Tone::Negative => "negative",
            Tone::Emotional => "emotional",
            Tone::NeutralQuestioning => "neutral_questioning",
            Tone::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for Tone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    short_threshold: usize,
    long_threshold: usize,
    positive: PhraseSet,
    negative: PhraseSet,
    neutral: PhraseSet,
    emotional: PhraseSet,
    labels: ToneLabels,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new(&SentimentRules::default())
    }
}

impl SentimentAnalyzer {
    pub fn new(rules: &SentimentRules) -> Self {
        Self {
            short_threshold: rules.short_threshold,
            long_threshold: rules.long_threshold,
            positive: PhraseSet::substring(&rules.positive),
            negative: PhraseSet::substring(&rules.negative),
            neutral: PhraseSet::substring(&rules.neutral),
            emotional: PhraseSet::substring(&rules.emotional),
            labels: rules.labels.clone(),
        }
    }

    pub fn analyze(&self, text: &str) -> Tone {
        let length = text.chars().count();

        if length < self.short_threshold {
            return Tone::Brief;
        }
        if length > self.long_threshold {
            return Tone::Detailed;
        }
        if text.contains('!') {
            return Tone::Emphatic;
        }
        if text.contains('?') {
            return Tone::Questioning;
        }

        let positive = self.positive.count(text);
        let negative = self.negative.count(text);

        if positive > negative {
            Tone::Positive
        } else if negative > positive {
            Tone::Negative
        } else if self.emotional.matches(text) {
            Tone::Emotional
        } else if self.neutral.matches(text) {
            Tone::NeutralQuestioning
        } else {
            Tone::Neutral
        }
    }

    /// Configured wording of a tone, as used in prompts
    pub fn label(&self, tone: Tone) -> &str {
        let labels = &self.labels;
        match tone {
            Tone::Brief => &labels.brief,
            Tone::Detailed => &labels.detailed,
            Tone::Emphatic => &labels.emphatic,
            Tone::Questioning => &labels.questioning,
            Tone::Positive => &labels.positive,
            Tone::Negative => &labels.negative,
            Tone::Emotional => &labels.emotional,
            Tone::NeutralQuestioning => &labels.neutral_questioning,
            Tone::Neutral => &labels.neutral,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Engagement {
    High,
    Medium,
    Low,
}

/// What the agent's reply implies for the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Continue,
    ObjectionHandling,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMood {
    pub mood: EmotionHint,
    pub engagement: Engagement,
    pub next_action: NextAction,
}

#[derive(Debug, Clone)]
pub struct ReplyMoodAnalyzer {
    positive: PhraseSet,
    negative: PhraseSet,
    high_engagement: PhraseSet,
    low_engagement: PhraseSet,
    close_action: PhraseSet,
    objection_action: PhraseSet,
}

impl Default for ReplyMoodAnalyzer {
    fn default() -> Self {
        Self::new(&ReplyMoodRules::default())
    }
}

impl ReplyMoodAnalyzer {
    pub fn new(rules: &ReplyMoodRules) -> Self {
        Self {
            positive: PhraseSet::substring(&rules.positive),
            negative: PhraseSet::substring(&rules.negative),
            high_engagement: PhraseSet::substring(&rules.high_engagement),
            low_engagement: PhraseSet::substring(&rules.low_engagement),
            close_action: PhraseSet::substring(&rules.close_action),
            objection_action: PhraseSet::substring(&rules.objection_action),
        }
    }

    pub fn analyze(&self, reply: &str) -> ReplyMood {
        let mood = if self.positive.matches(reply) {
            EmotionHint::Positive
        } else if self.negative.matches(reply) {
            EmotionHint::Negative
        } else {
            EmotionHint::Neutral
        };

        let engagement = if self.high_engagement.matches(reply) {
            Engagement::High
        } else if self.low_engagement.matches(reply) {
            Engagement::Low
        } else {
            Engagement::Medium
        };

        let next_action = if self.close_action.matches(reply) {
            NextAction::Close
        } else if self.objection_action.matches(reply) {
            NextAction::ObjectionHandling
        } else {
            NextAction::Continue
        };

        ReplyMood {
            mood,
            engagement,
            next_action,
        }
    }
}
