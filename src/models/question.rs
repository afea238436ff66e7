use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of question kinds the generator can plan for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Exactly one correct option.
    MultipleChoice,
    TrueFalse,
    /// More than one option may be correct.
    MultipleSelect,
    OpenEnded,
}

impl QuestionType {
    pub const ALL: [QuestionType; 4] = [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::MultipleSelect,
        QuestionType::OpenEnded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::MultipleSelect => "multiple_select",
            QuestionType::OpenEnded => "open_ended",
        }
    }

    /// Human-readable catalog name, e.g. `multiple choice`.
    pub fn type_name(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple choice",
            QuestionType::TrueFalse => "true false",
            QuestionType::MultipleSelect => "multiple select",
            QuestionType::OpenEnded => "open ended",
        }
    }

    /// Lenient tag lookup: case-insensitive, accepts spaces or dashes for underscores.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let normalized = normalize_tag(tag);
        QuestionType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
    }

    pub fn is_choice_based(&self) -> bool {
        !matches!(self, QuestionType::OpenEnded)
    }

    pub fn allows_multiple_correct(&self) -> bool {
        matches!(self, QuestionType::MultipleSelect)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    /// Harder exercises sample more freely.
    pub fn temperature(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.4,
            Difficulty::Medium => 0.6,
            Difficulty::Hard => 0.8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn label(&self, language: LanguageMode) -> &'static str {
        match (language, self) {
            (LanguageMode::English, Difficulty::Easy) => "easy",
            (LanguageMode::English, Difficulty::Medium) => "medium",
            (LanguageMode::English, Difficulty::Hard) => "hard",
            (LanguageMode::Vietnamese, Difficulty::Easy) => "dễ",
            (LanguageMode::Vietnamese, Difficulty::Medium) => "trung bình",
            (LanguageMode::Vietnamese, Difficulty::Hard) => "khó",
        }
    }
}

/// Language used for the prompt and for every placeholder the pipeline fabricates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LanguageMode {
    #[default]
    #[serde(rename = "vi")]
    Vietnamese,
    #[serde(rename = "en")]
    English,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseKind {
    MultipleChoice,
    TrueFalse,
    MultipleSelect,
    OpenEnded,
    Mixed,
}

impl From<QuestionType> for ExerciseKind {
    fn from(value: QuestionType) -> Self {
        match value {
            QuestionType::MultipleChoice => ExerciseKind::MultipleChoice,
            QuestionType::TrueFalse => ExerciseKind::TrueFalse,
            QuestionType::MultipleSelect => ExerciseKind::MultipleSelect,
            QuestionType::OpenEnded => ExerciseKind::OpenEnded,
        }
    }
}

impl ExerciseKind {
    /// The question type a bare exercise kind stands for; mixed falls back to multiple choice.
    pub fn default_question_type(&self) -> QuestionType {
        match self {
            ExerciseKind::MultipleChoice | ExerciseKind::Mixed => QuestionType::MultipleChoice,
            ExerciseKind::TrueFalse => QuestionType::TrueFalse,
            ExerciseKind::MultipleSelect => QuestionType::MultipleSelect,
            ExerciseKind::OpenEnded => QuestionType::OpenEnded,
        }
    }
}

/// A question as the model produced it. Nothing here is trusted yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question_text: String,
    pub emoji: String,
    pub explanation: String,
    /// Raw option strings; correct ones carry an inline marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_type: Option<String>,
}

impl GeneratedQuestion {
    pub fn declared_type(&self) -> Option<QuestionType> {
        self.suggested_type.as_deref().and_then(QuestionType::from_tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub answer_text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizedQuestion {
    pub id: i64,
    pub order_num: u32,
    pub question_type_id: i64,
    pub question_type: String,
    pub question_text: String,
    pub emoji: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnswerOption>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionTypeRecord {
    pub id: i64,
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_multiple_choice: bool,
}
