//! Objection detection table
//!
//! Rules are checked in declaration order; the first matching rule is the
//! primary category of an utterance.

use serde::{Deserialize, Serialize};

use cold_call_core::ObjectionCategory;

/// Objection patterns, rebuttals and scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectionTable {
    /// Rules in priority order
    #[serde(default = "default_rules")]
    pub rules: Vec<ObjectionRule>,

    /// Used when the primary category has no rebuttal configured
    #[serde(default = "default_generic_rebuttal")]
    pub generic_rebuttal: String,

    /// Reported for every detection; matching is not graded
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

/// One objection category with its trigger patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectionRule {
    pub category: ObjectionCategory,
    /// Regex or plain phrases, matched against lower-cased text
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Scripted replies; the first one is spoken
    #[serde(default)]
    pub rebuttals: Vec<String>,
}

impl ObjectionRule {
    fn new(category: ObjectionCategory, patterns: &[&str], rebuttals: &[&str]) -> Self {
        Self {
            category,
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            rebuttals: rebuttals.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl Default for ObjectionTable {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            generic_rebuttal: default_generic_rebuttal(),
            confidence: default_confidence(),
        }
    }
}

impl ObjectionTable {
    pub fn rule(&self, category: ObjectionCategory) -> Option<&ObjectionRule> {
        self.rules.iter().find(|r| r.category == category)
    }
}

fn default_generic_rebuttal() -> String {
    "Понимаю! Давайте я подготовлю для вас персональное предложение.".to_string()
}

fn default_confidence() -> f32 {
    0.9
}

// Gatekeeper phrases for `secretary` come from `roles.gatekeepers`.
fn default_rules() -> Vec<ObjectionRule> {
    use ObjectionCategory::*;
    vec![
        ObjectionRule::new(
            NotInterested,
            &[
                "не интересует",
                "не интересно",
                "не нужно",
                "не подходит",
                "не актуально",
                "не требуется",
                "не ищем",
            ],
            &[
                "Понимаю! Но у нас есть специальное предложение именно для вашей отрасли. \
                 Давайте я быстро расскажу, как мы помогаем компаниям экономить до 30% на логистике?",
                "Конечно, понимаю. А можете подсказать, кто у вас отвечает за логистику? \
                 Возможно, им будет интересно наше предложение.",
            ],
        ),
        ObjectionRule::new(
            HasCarrier,
            &[
                "есть перевозчик",
                "работаем с",
                "уже есть",
                "сотрудничаем",
                "поставщик услуг",
                "партнер",
                "договор",
            ],
            &[
                "Отлично! Значит, вы понимаете важность логистики. А что если я покажу, \
                 как можно сократить расходы на 20-30% при том же качестве?",
                "Понимаю! А вы довольны текущими условиями? Мы могли бы предложить \
                 альтернативный вариант для сравнения.",
            ],
        ),
        ObjectionRule::new(
            SendEmail,
            &[
                "отправьте на почту",
                "напишите email",
                "на общую почту",
                "info@",
                "общий@",
                "отправьте предложение",
            ],
            &[
                "Конечно, я отправлю на общую почту. Но чтобы наше предложение не затерялось \
                 среди сотни других, подскажите, пожалуйста, как зовут вашего логиста? \
                 Тогда я укажу его имя в теме письма.",
                "Обязательно отправлю! А для персонального предложения подскажите, \
                 кто у вас отвечает за логистику?",
            ],
        ),
        ObjectionRule::new(
            Busy,
            &[
                "занят",
                "неудобно",
                "позже",
                "не сейчас",
                "не время",
                "сейчас не могу",
                "перезвоните",
            ],
            &[
                "Понимаю, сейчас неудобно. Давайте я перезвоню в удобное время? \
                 Когда вам будет удобно?",
                "Конечно! Когда лучше перезвонить? Утром или после обеда?",
            ],
        ),
        ObjectionRule::new(
            Expensive,
            &["дорого", "стоимость", "цена", "бюджет", "не по карману"],
            &[
                "Понимаю ваши опасения! Но у нас есть гибкие тарифы и специальные условия \
                 для новых клиентов. Давайте я покажу конкретные цифры?",
                "Стоимость зависит от объема и направления. Давайте я подготовлю \
                 индивидуальный расчет?",
            ],
        ),
        ObjectionRule::new(
            Secretary,
            &[],
            &[
                "Понимаю! Тогда подскажите, пожалуйста, как зовут вашего руководителя \
                 отдела логистики? Я подготовлю для него персональное предложение.",
                "Спасибо! А можете соединить с тем, кто принимает решения по логистике?",
            ],
        ),
    ]
}
