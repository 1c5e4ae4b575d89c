//! Core types for the cold-call dialog engine
//!
//! This crate provides the types shared by every other crate:
//! - Dialog stages and conversation turns
//! - Objection categories and extracted contact entities
//! - Collaborator traits (telephony, speech-to-text, text-to-speech)
//! - Collaborator error type

pub mod conversation;
pub mod entities;
pub mod error;
pub mod objection;
pub mod traits;

pub use conversation::{DialogStage, Turn, TurnAnnotation, TurnRole};
pub use entities::ContactEntities;
pub use error::{CollaboratorError, Result};
pub use objection::ObjectionCategory;
pub use traits::{CallPlacement, EmotionHint, SpeechToText, Telephony, TextToSpeech, Transcript};
