//! Narrow interfaces to the systems around the dialog engine

mod speech;
mod telephony;

pub use speech::{EmotionHint, SpeechToText, TextToSpeech, Transcript};
pub use telephony::{CallPlacement, Telephony};
