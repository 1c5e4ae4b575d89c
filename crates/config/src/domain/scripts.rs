//! Scripted replies and termination vocabulary
//!
//! The two dialog profiles keep separate fallback tables. `event_driven`
//! speaks per stage; `turn_ladder` walks keyword rules, a short-answer rule
//! and turn buckets.

use serde::{Deserialize, Serialize};

use cold_call_core::DialogStage;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const PITCH: &str = "Спасибо! Мы помогаем компаниям сокращать сроки и риски по доставке грузов \
                     из Китая. У нас есть точечное предложение по вашему направлению. Давайте я \
                     оперативно подготовлю для вас предварительный расчет?";

const QUOTE_REQUEST: &str =
    "Для расчета нужен город отправки и назначения. Куда вам удобнее получить результат?";

/// Phrases that move `value_presentation` to `closing`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRules {
    #[serde(default = "default_quote_request_keywords")]
    pub quote_request_keywords: Vec<String>,
}

impl Default for StageRules {
    fn default() -> Self {
        Self {
            quote_request_keywords: default_quote_request_keywords(),
        }
    }
}

fn default_quote_request_keywords() -> Vec<String> {
    strings(&["расчет", "расчёт", "просчет"])
}

/// Replies per canonical stage; the first entry is spoken
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageScripts {
    pub greeting: Vec<String>,
    pub objection_handling: Vec<String>,
    pub value_presentation: Vec<String>,
    pub closing: Vec<String>,
}

impl StageScripts {
    pub fn for_stage(&self, stage: DialogStage) -> &[String] {
        match stage {
            DialogStage::Greeting => &self.greeting,
            DialogStage::ObjectionHandling => &self.objection_handling,
            DialogStage::ValuePresentation => &self.value_presentation,
            DialogStage::Closing => &self.closing,
        }
    }
}

impl Default for StageScripts {
    fn default() -> Self {
        Self {
            greeting: strings(&[
                "Добрый день! Меня зовут Мария, я специалист по международным перевозкам \
                 компании TRANSTIREX. Подскажите, с кем я могу обсудить вопросы логистики \
                 из Китая в Россию?",
                "Здравствуйте! Я звоню по поводу логистики из Китая. Подскажите, кто у вас \
                 занимается перевозками?",
            ]),
            objection_handling: strings(&[
                "Понимаю! Речь идет не о массовой рассылке, а об оперативном согласовании \
                 деталей по конкретным поставкам. Подскажите, пожалуйста, как зовут вашего \
                 руководителя отдела логистики?",
                "Конечно, понимаю. А можете подсказать, кто у вас отвечает за логистику?",
            ]),
            value_presentation: strings(&[
                "Мы помогаем таким компаниям, как ваша, сокращать сроки и риски по доставке \
                 грузов из Китая. У нас есть точечное предложение по вашему направлению. \
                 Давайте я оперативно подготовлю для вас предварительный расчет?",
                "У нас есть специальные условия для новых клиентов. Давайте я подготовлю \
                 индивидуальный расчет?",
            ]),
            closing: strings(&[
                "Отлично! Куда вам удобнее получить расчет: в WhatsApp или на email?",
                "Спасибо за информацию! Я направлю персональное предложение. Хорошего дня!",
            ]),
        }
    }
}

/// Keyword-triggered reply; `replies[n]` answers exchange `n + 1`, the
/// last entry covers every later exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordReply {
    pub keywords: Vec<String>,
    pub replies: Vec<String>,
}

impl KeywordReply {
    fn new(keywords: &[&str], replies: &[&str]) -> Self {
        Self {
            keywords: strings(keywords),
            replies: strings(replies),
        }
    }

    /// Reply for a 1-based exchange number
    pub fn reply_for_turn(&self, turn: u32) -> Option<&str> {
        let last = self.replies.len().checked_sub(1)?;
        let index = (turn.saturating_sub(1) as usize).min(last);
        self.replies.get(index).map(String::as_str)
    }
}

/// Reply to a bare "no"; after `until_turn` the call is wound up instead
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortAnswerRule {
    pub answers: Vec<String>,
    pub until_turn: u32,
    pub reply: String,
}

impl Default for ShortAnswerRule {
    fn default() -> Self {
        Self {
            answers: strings(&["нет", "не", "неа"]),
            until_turn: 3,
            reply: "Понимаю. Может быть, у вас есть коллеги, которые занимаются логистикой? \
                    Или подскажите, кто принимает решения по перевозкам?"
                .to_string(),
        }
    }
}

/// Catch-all reply for exchanges up to and including `until_turn`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnBucket {
    pub until_turn: u32,
    pub reply: String,
}

/// Fallback tables of the turn-ladder profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderScripts {
    /// Checked in order; the first rule with a matching keyword wins
    pub keyword_replies: Vec<KeywordReply>,
    pub short_answer: ShortAnswerRule,
    /// Ascending by `until_turn`; past the last bucket the call is wound up
    pub turn_buckets: Vec<TurnBucket>,
}

impl Default for LadderScripts {
    fn default() -> Self {
        Self {
            keyword_replies: vec![
                KeywordReply::new(
                    &["расскажите", "подробнее", "что предлагаете", "как работаете", "что это"],
                    &["Мы специализируемся на доставке грузов из Китая в Россию. Сокращаем \
                       сроки на 20-30% и снижаем риски. Для расчета нужен город отправки и \
                       назначения. Куда вам удобнее получить результат?"],
                ),
                KeywordReply::new(
                    &["email", "почта", "почту", "отправьте", "напишите"],
                    &["Обязательно отправлю! А для персонального предложения подскажите, кто \
                       у вас отвечает за логистику? Это стандартная практика."],
                ),
                KeywordReply::new(
                    &["добрый день", "здравствуйте", "привет"],
                    &[
                        "Спасибо! Я звоню по поводу логистики из Китая в Россию. Подскажите, \
                         с кем я могу обсудить вопросы перевозок?",
                        PITCH,
                        "Спасибо! Для расчета нужен город отправки и назначения. Куда вам \
                         удобнее получить результат?",
                    ],
                ),
            ],
            short_answer: ShortAnswerRule::default(),
            turn_buckets: vec![
                TurnBucket {
                    until_turn: 2,
                    reply: PITCH.to_string(),
                },
                TurnBucket {
                    until_turn: 4,
                    reply: QUOTE_REQUEST.to_string(),
                },
            ],
        }
    }
}

/// Scripted replies for both profiles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackScripts {
    pub event_driven: StageScripts,
    pub turn_ladder: LadderScripts,
}

/// When the call may end, and what is said when it does
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationRules {
    /// Phrases that make a reply a goodbye; matched as whole words
    pub farewell_phrases: Vec<String>,
    /// Callee phrases that end the pitch; matched as whole words
    pub rejection_keywords: Vec<String>,
    pub termination_reply: String,
    /// Spoken when the turn or time limit is reached
    pub limit_reply: String,
}

impl Default for TerminationRules {
    fn default() -> Self {
        Self {
            farewell_phrases: strings(&[
                "спасибо за время",
                "всего доброго",
                "до свидания",
                "прощайте",
                "пока",
            ]),
            rejection_keywords: strings(&[
                "не нужно",
                "не интересует",
                "не интересно",
                "не подходит",
                "не актуально",
                "до свидания",
                "прощайте",
                "пока",
            ]),
            termination_reply: "Понимаю, спасибо за ваше время. Всего доброго!".to_string(),
            limit_reply: "Спасибо за разговор! Я подготовлю коммерческое предложение и перезвоню \
                          в удобное время."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_reply_for_turn() {
        let scripts = LadderScripts::default();
        let greeting = &scripts.keyword_replies[2];
        assert!(greeting.reply_for_turn(1).unwrap().contains("Я звоню"));
        assert_eq!(greeting.reply_for_turn(2), Some(PITCH));
        assert_eq!(greeting.reply_for_turn(3), greeting.reply_for_turn(9));

        let empty = KeywordReply::new(&["x"], &[]);
        assert_eq!(empty.reply_for_turn(1), None);
    }

    #[test]
    fn test_stage_scripts_cover_every_stage() {
        let scripts = StageScripts::default();
        for stage in DialogStage::ALL {
            assert!(!scripts.for_stage(stage).is_empty());
        }
        assert!(scripts.for_stage(DialogStage::Closing)[0].contains("WhatsApp"));
    }
}
