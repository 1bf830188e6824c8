//! Static catalogs: webhook model ids and welcome-screen suggestions.

use serde::Serialize;

/// A model the webhook can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelOption {
    pub label: &'static str,
    /// Numeric id the webhook expects in the `model` field.
    pub id: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<&'static str>,
}

const fn model(label: &'static str, id: &'static str) -> ModelOption {
    ModelOption {
        label,
        id,
        group: None,
    }
}

pub const MODEL_OPTIONS: &[ModelOption] = &[
    model("Auto", "11"),
    model("GPT-5 Nano", "1"),
    model("GPT-4 Mini", "2"),
    model("GPT-5.1", "3"),
    model("GPT-5 Pro", "4"),
    model("Gemini 2.5 Flash Lite", "5"),
    model("Gemini 2.5 Flash", "6"),
    model("Gemini 3 Pro Preview", "7"),
    model("Claude Haiku 4.5", "8"),
    model("Claude Opus 4.5", "9"),
    model("Claude Sonnet 4.5", "10"),
];

pub const DEFAULT_MODEL_ID: &str = "11";

/// Resolve a model id, falling back to the first option.
#[must_use]
pub fn find_model(id: &str) -> &'static ModelOption {
    MODEL_OPTIONS
        .iter()
        .find(|m| m.id == id)
        .unwrap_or(&MODEL_OPTIONS[0])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionCard {
    pub title: &'static str,
    pub subtitle: &'static str,
}

pub const SUGGESTION_CARDS: &[SuggestionCard] = &[
    SuggestionCard {
        title: "Что умеет этот ИИ",
        subtitle: "Расскажите подробнее",
    },
    SuggestionCard {
        title: "Придумай идею для поста",
        subtitle: "о запуске нового продукта",
    },
    SuggestionCard {
        title: "Помогите мне разобраться",
        subtitle: "в техническом документе",
    },
    SuggestionCard {
        title: "Объясни квантовую физику",
        subtitle: "простыми словами",
    },
];
