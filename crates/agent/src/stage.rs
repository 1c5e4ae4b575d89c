//! Dialog stage resolution
//!
//! Two resolvers share one interface, picked by `dialog.profile`:
//! - `EventDrivenResolver` advances on objections, contacts and quote requests
//! - `TurnLadderResolver` follows the completed turn count
//!
//! Both speak the canonical `DialogStage`; the ladder also reports its own
//! finer phase.

use serde::{Deserialize, Serialize};

use cold_call_config::{DialogProfile, StageRules};
use cold_call_core::{ContactEntities, DialogStage};
use cold_call_text_processing::{ClassificationResult, PhraseSet};

/// Five-step ladder of the turn-count profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderPhase {
    Greeting,
    NeedsAnalysis,
    ServiceDetails,
    ContactRequest,
    Closing,
}

impl LadderPhase {
    pub fn from_turn_count(turn_count: u32) -> Self {
        match turn_count {
            0 => LadderPhase::Greeting,
            1..=2 => LadderPhase::NeedsAnalysis,
            3..=4 => LadderPhase::ServiceDetails,
            5..=6 => LadderPhase::ContactRequest,
            _ => LadderPhase::Closing,
        }
    }

    /// Canonical stage this phase belongs to
    pub fn stage(&self) -> DialogStage {
        match self {
            LadderPhase::Greeting => DialogStage::Greeting,
            LadderPhase::NeedsAnalysis | LadderPhase::ServiceDetails => {
                DialogStage::ValuePresentation
            }
            LadderPhase::ContactRequest | LadderPhase::Closing => DialogStage::Closing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LadderPhase::Greeting => "greeting",
            LadderPhase::NeedsAnalysis => "needs_analysis",
            LadderPhase::ServiceDetails => "service_details",
            LadderPhase::ContactRequest => "contact_request",
            LadderPhase::Closing => "closing",
        }
    }
}

impl std::fmt::Display for LadderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the resolver sees of the current turn
#[derive(Debug, Clone, Copy)]
pub struct StageInput<'a> {
    pub current: DialogStage,
    /// Completed exchanges before this utterance
    pub turn_count: u32,
    pub text: &'a str,
    pub classification: &'a ClassificationResult,
    pub entities: &'a ContactEntities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDecision {
    pub stage: DialogStage,
    pub ladder_phase: Option<LadderPhase>,
}

/// Pure transition function over the stage enum
pub trait StageResolver: Send + Sync {
    fn resolve(&self, input: &StageInput<'_>) -> StageDecision;

    fn profile(&self) -> DialogProfile;
}

pub struct EventDrivenResolver {
    quote_request: PhraseSet,
}

impl EventDrivenResolver {
    pub fn new(rules: &StageRules) -> Self {
        Self {
            quote_request: PhraseSet::substring(&rules.quote_request_keywords),
        }
    }
}

impl StageResolver for EventDrivenResolver {
    fn resolve(&self, input: &StageInput<'_>) -> StageDecision {
        let objection = input.classification.is_objection();

        let stage = match input.current {
            DialogStage::Greeting | DialogStage::ObjectionHandling if objection => {
                DialogStage::ObjectionHandling
            }
            DialogStage::Greeting | DialogStage::ObjectionHandling => {
                DialogStage::ValuePresentation
            }
            DialogStage::ValuePresentation
                if input.entities.has_reachable_contact()
                    || self.quote_request.matches(input.text) =>
            {
                DialogStage::Closing
            }
            DialogStage::ValuePresentation => DialogStage::ValuePresentation,
            DialogStage::Closing => DialogStage::Closing,
        };

        StageDecision {
            stage,
            ladder_phase: None,
        }
    }

    fn profile(&self) -> DialogProfile {
        DialogProfile::EventDriven
    }
}

pub struct TurnLadderResolver;

impl StageResolver for TurnLadderResolver {
    fn resolve(&self, input: &StageInput<'_>) -> StageDecision {
        let phase = LadderPhase::from_turn_count(input.turn_count);
        StageDecision {
            stage: phase.stage(),
            ladder_phase: Some(phase),
        }
    }

    fn profile(&self) -> DialogProfile {
        DialogProfile::TurnLadder
    }
}

/// Resolver for the configured profile
pub fn resolver_for(profile: DialogProfile, rules: &StageRules) -> Box<dyn StageResolver> {
    match profile {
        DialogProfile::EventDriven => Box::new(EventDrivenResolver::new(rules)),
        DialogProfile::TurnLadder => Box::new(TurnLadderResolver),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cold_call_core::ObjectionCategory;

    fn objection() -> ClassificationResult {
        ClassificationResult {
            category: Some(ObjectionCategory::Busy),
            all_matches: vec![ObjectionCategory::Busy],
            rebuttal: Some("Перезвоню".to_string()),
            confidence: 0.9,
        }
    }

    fn resolve(
        resolver: &dyn StageResolver,
        current: DialogStage,
        text: &str,
        classification: &ClassificationResult,
        entities: &ContactEntities,
    ) -> DialogStage {
        resolver
            .resolve(&StageInput {
                current,
                turn_count: 0,
                text,
                classification,
                entities,
            })
            .stage
    }

    #[test]
    fn test_event_driven_transitions() {
        let resolver = EventDrivenResolver::new(&StageRules::default());
        let none = ClassificationResult::none();
        let busy = objection();
        let empty = ContactEntities::default();

        use DialogStage::*;
        assert_eq!(resolve(&resolver, Greeting, "занят", &busy, &empty), ObjectionHandling);
        assert_eq!(resolve(&resolver, Greeting, "слушаю", &none, &empty), ValuePresentation);
        assert_eq!(resolve(&resolver, ObjectionHandling, "занят", &busy, &empty), ObjectionHandling);
        assert_eq!(resolve(&resolver, ObjectionHandling, "ну ладно", &none, &empty), ValuePresentation);
        assert_eq!(resolve(&resolver, ValuePresentation, "ну ладно", &none, &empty), ValuePresentation);
        assert_eq!(resolve(&resolver, ValuePresentation, "сделайте расчет", &none, &empty), Closing);
        assert_eq!(resolve(&resolver, Closing, "занят", &busy, &empty), Closing);
    }

    #[test]
    fn test_contact_moves_value_presentation_to_closing() {
        let resolver = EventDrivenResolver::new(&StageRules::default());
        let none = ClassificationResult::none();
        let with_email = ContactEntities {
            emails: vec!["a@b.ru".to_string()],
            ..ContactEntities::default()
        };
        let name_only = ContactEntities {
            names: vec!["Иван".to_string()],
            ..ContactEntities::default()
        };

        assert_eq!(
            resolve(&resolver, DialogStage::ValuePresentation, "a@b.ru", &none, &with_email),
            DialogStage::Closing
        );
        assert_eq!(
            resolve(&resolver, DialogStage::ValuePresentation, "Иван", &none, &name_only),
            DialogStage::ValuePresentation
        );
    }

    #[test]
    fn test_ladder_phases() {
        let resolver = TurnLadderResolver;
        let none = ClassificationResult::none();
        let empty = ContactEntities::default();

        let at = |turn_count| {
            resolver.resolve(&StageInput {
                current: DialogStage::Greeting,
                turn_count,
                text: "",
                classification: &none,
                entities: &empty,
            })
        };

        assert_eq!(at(0).stage, DialogStage::Greeting);
        assert_eq!(at(1).ladder_phase, Some(LadderPhase::NeedsAnalysis));
        assert_eq!(at(2).stage, DialogStage::ValuePresentation);
        assert_eq!(at(4).ladder_phase, Some(LadderPhase::ServiceDetails));
        assert_eq!(at(5).stage, DialogStage::Closing);
        assert_eq!(at(5).ladder_phase, Some(LadderPhase::ContactRequest));
        assert_eq!(at(12).ladder_phase, Some(LadderPhase::Closing));
    }

    #[test]
    fn test_ladder_never_moves_backwards() {
        let stages: Vec<u8> = (0..10)
            .map(|n| LadderPhase::from_turn_count(n).stage().ordinal())
            .collect();
        assert!(stages.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_resolver_for_profile() {
        let rules = StageRules::default();
        assert_eq!(
            resolver_for(DialogProfile::TurnLadder, &rules).profile(),
            DialogProfile::TurnLadder
        );
        assert_eq!(
            resolver_for(DialogProfile::EventDriven, &rules).profile(),
            DialogProfile::EventDriven
        );
    }
}
