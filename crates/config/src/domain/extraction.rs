//! Entity, role and sentiment vocabularies

use serde::{Deserialize, Serialize};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Contact extraction patterns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRules {
    #[serde(default = "default_email_pattern")]
    pub email_pattern: String,

    /// Capture groups are concatenated to normalize the number
    #[serde(default = "default_phone_pattern")]
    pub phone_pattern: String,

    /// Each pattern captures the name in group 1; matched case-sensitively
    #[serde(default = "default_name_patterns")]
    pub name_patterns: Vec<String>,
}

impl Default for EntityRules {
    fn default() -> Self {
        Self {
            email_pattern: default_email_pattern(),
            phone_pattern: default_phone_pattern(),
            name_patterns: default_name_patterns(),
        }
    }
}

fn default_email_pattern() -> String {
    r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b".to_string()
}

fn default_phone_pattern() -> String {
    r"(\+7|8)[\s\-]*\(?(\d{3})\)?[\s\-]*(\d{3})[\s\-]*(\d{2})[\s\-]*(\d{2})".to_string()
}

fn default_name_patterns() -> Vec<String> {
    strings(&[
        r"зовут\s+([А-ЯЁ][а-яё]+)",
        r"меня\s+([А-ЯЁ][а-яё]+)",
        r"это\s+([А-ЯЁ][а-яё]+)",
        r"([А-ЯЁ][а-яё]+)\s+отвечает",
    ])
}

/// Who holds authority over logistics, and who guards the door
///
/// The single source for both the decision-maker flag of extracted
/// entities and the gatekeeper objection. A decision-maker keyword that only
/// occurs inside a gatekeeper phrase ("не принимаю решения") does not count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleVocabulary {
    #[serde(default = "default_decision_makers")]
    pub decision_makers: Vec<String>,

    #[serde(default = "default_gatekeepers")]
    pub gatekeepers: Vec<String>,
}

impl Default for RoleVocabulary {
    fn default() -> Self {
        Self {
            decision_makers: default_decision_makers(),
            gatekeepers: default_gatekeepers(),
        }
    }
}

fn default_decision_makers() -> Vec<String> {
    strings(&[
        "руководитель",
        "директор",
        "начальник",
        "менеджер",
        "отвечает за",
        "принимаю решения",
        "логист",
    ])
}

fn default_gatekeepers() -> Vec<String> {
    strings(&[
        "секретарь",
        "помощник",
        "ассистент",
        "приемная",
        "общий отдел",
        "не принимаю решения",
    ])
}

/// Tone heuristic keywords and length thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRules {
    /// Texts shorter than this many characters are "brief"
    #[serde(default = "default_short_threshold")]
    pub short_threshold: usize,

    /// Texts longer than this many characters are "detailed"
    #[serde(default = "default_long_threshold")]
    pub long_threshold: usize,

    #[serde(default = "default_positive")]
    pub positive: Vec<String>,

    #[serde(default = "default_negative")]
    pub negative: Vec<String>,

    #[serde(default = "default_neutral")]
    pub neutral: Vec<String>,

    #[serde(default = "default_emotional")]
    pub emotional: Vec<String>,

    #[serde(default)]
    pub labels: ToneLabels,
}

impl Default for SentimentRules {
    fn default() -> Self {
        Self {
            short_threshold: default_short_threshold(),
            long_threshold: default_long_threshold(),
            positive: default_positive(),
            negative: default_negative(),
            neutral: default_neutral(),
            emotional: default_emotional(),
            labels: ToneLabels::default(),
        }
    }
}

fn default_short_threshold() -> usize {
    5
}

fn default_long_threshold() -> usize {
    50
}

fn default_positive() -> Vec<String> {
    strings(&[
        "да",
        "конечно",
        "интересно",
        "хорошо",
        "отлично",
        "давайте",
        "расскажите",
        "подробнее",
        "спасибо",
        "понятно",
    ])
}

fn default_negative() -> Vec<String> {
    strings(&[
        "нет",
        "неинтересно",
        "не нужно",
        "не хочу",
        "занят",
        "неудобно",
        "не подходит",
        "дорого",
    ])
}

fn default_neutral() -> Vec<String> {
    strings(&[
        "что", "как", "когда", "где", "почему", "сколько", "можно", "возможно", "а", "но",
    ])
}

fn default_emotional() -> Vec<String> {
    strings(&[
        "волнуюсь",
        "беспокоюсь",
        "сомневаюсь",
        "не уверен",
        "думаю",
        "решаю",
        "обдумываю",
    ])
}

/// Human-readable tone labels, as they appear in prompts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToneLabels {
    pub brief: String,
    pub detailed: String,
    pub emphatic: String,
    pub questioning: String,
    pub positive: String,
    pub negative: String,
    pub emotional: String,
    pub neutral_questioning: String,
    pub neutral: String,
}

impl Default for ToneLabels {
    fn default() -> Self {
        Self {
            brief: "краткий/неопределенный".to_string(),
            detailed: "подробный/заинтересованный".to_string(),
            emphatic: "эмоциональный/активный".to_string(),
            questioning: "вопрошающий/сомневающийся".to_string(),
            positive: "позитивный/заинтересованный".to_string(),
            negative: "негативный/отрицающий".to_string(),
            emotional: "эмоциональный/сомневающийся".to_string(),
            neutral_questioning: "нейтральный/вопрошающий".to_string(),
            neutral: "нейтральный".to_string(),
        }
    }
}

/// Keywords for classifying the agent's own reply before synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyMoodRules {
    pub positive: Vec<String>,
    pub negative: Vec<String>,
    pub high_engagement: Vec<String>,
    pub low_engagement: Vec<String>,
    pub close_action: Vec<String>,
    pub objection_action: Vec<String>,
}

impl Default for ReplyMoodRules {
    fn default() -> Self {
        Self {
            positive: strings(&[
                "отлично",
                "прекрасно",
                "замечательно",
                "рад",
                "понимаю",
                "согласен",
                "конечно",
            ]),
            negative: strings(&["извините", "жаль", "к сожалению"]),
            high_engagement: strings(&["вопрос", "расскажите", "как", "что"]),
            low_engagement: strings(&["спасибо", "до свидания", "всего доброго"]),
            close_action: strings(&["до свидания", "всего доброго", "спасибо за время"]),
            objection_action: strings(&["понимаю ваши", "согласен", "но давайте"]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gatekeeper_phrase_contains_decision_maker_keyword() {
        let roles = RoleVocabulary::default();
        let overlapping: Vec<&String> = roles
            .gatekeepers
            .iter()
            .filter(|g| roles.decision_makers.iter().any(|d| g.contains(d.as_str())))
            .collect();
        assert_eq!(overlapping, vec!["не принимаю решения"]);
    }

    #[test]
    fn test_sentiment_thresholds() {
        let rules = SentimentRules::default();
        assert!(rules.short_threshold < rules.long_threshold);
        assert_eq!(rules.labels.neutral, "нейтральный");
    }
}
