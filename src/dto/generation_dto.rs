use crate::error::{Error, Result};
use crate::models::question::{Difficulty, LanguageMode, QuestionType};
use crate::services::distribution_planner::TypeDistributionPlan;
use crate::services::generation_service::GenerationRequest;
use crate::utils::subject::detect_language;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;
use validator::Validate;

/// Options per choice-based question when the caller does not say.
pub const DEFAULT_NUM_ANSWERS: u32 = 4;

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQuestionsPayload {
    #[serde(default, deserialize_with = "trim_string")]
    #[validate(length(min = 1, message = "exercise_name must not be empty"))]
    pub exercise_name: String,

    #[serde(default, deserialize_with = "trim_string")]
    #[validate(length(min = 1, message = "lesson_name must not be empty"))]
    pub lesson_name: String,

    /// Explicit per-type counts, in the order the caller wrote them.
    #[serde(default, deserialize_with = "ordered_quantities")]
    pub type_quantities: Option<Vec<(QuestionType, i64)>>,

    pub selected_types: Option<Vec<QuestionType>>,

    /// Exercise-level type, used only when nothing else selects types.
    #[serde(rename = "type")]
    pub exercise_type: Option<ExerciseTypeSelection>,

    #[validate(range(min = 1, max = 50, message = "num_questions must be between 1 and 50"))]
    pub num_questions: u32,

    #[validate(range(min = 2, max = 5, message = "num_answers must be between 2 and 5"))]
    pub num_answers: Option<u32>,

    #[serde(default)]
    pub difficulty: Difficulty,

    #[validate(range(min = 1, message = "user_id must be positive"))]
    pub user_id: i64,

    /// Overrides language detection from the lesson name.
    pub language: Option<LanguageMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseTypeSelection {
    MultipleChoice,
    TrueFalse,
    MultipleSelect,
    OpenEnded,
    Mixed,
}

impl ExerciseTypeSelection {
    /// `mixed` on its own means every built-in type.
    fn question_types(&self) -> Vec<QuestionType> {
        match self {
            ExerciseTypeSelection::MultipleChoice => vec![QuestionType::MultipleChoice],
            ExerciseTypeSelection::TrueFalse => vec![QuestionType::TrueFalse],
            ExerciseTypeSelection::MultipleSelect => vec![QuestionType::MultipleSelect],
            ExerciseTypeSelection::OpenEnded => vec![QuestionType::OpenEnded],
            ExerciseTypeSelection::Mixed => QuestionType::ALL.to_vec(),
        }
    }
}

impl GenerateQuestionsPayload {
    /// Validate and resolve into a request the pipeline can run without further checks.
    pub fn into_request(self) -> Result<GenerationRequest> {
        self.validate()?;

        let total = self.num_questions;
        let plan = match (&self.type_quantities, &self.selected_types) {
            (Some(quantities), _) if !quantities.is_empty() => {
                TypeDistributionPlan::from_quantities(total, quantities)?
            }
            (_, Some(selected)) if !selected.is_empty() => {
                TypeDistributionPlan::from_selected(total, selected)?
            }
            _ => match self.exercise_type {
                Some(selection) => {
                    TypeDistributionPlan::from_selected(total, &selection.question_types())?
                }
                None => {
                    return Err(Error::BadRequest(
                        "Select at least one question type via type_quantities, selected_types or type"
                            .to_string(),
                    ))
                }
            },
        };

        let language = self
            .language
            .unwrap_or_else(|| detect_language(&self.lesson_name));

        Ok(GenerationRequest {
            exercise_name: self.exercise_name,
            lesson_name: self.lesson_name,
            plan,
            difficulty: self.difficulty,
            num_answers: self.num_answers.unwrap_or(DEFAULT_NUM_ANSWERS),
            language,
            user_id: self.user_id,
        })
    }
}

fn trim_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.map(|s| s.trim().to_string()).unwrap_or_default())
}

/// `{"true_false": 3, "multiple_choice": 2}` into pairs, keeping document order.
fn ordered_quantities<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<(QuestionType, i64)>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct QuantitiesVisitor;

    impl<'de> Visitor<'de> for QuantitiesVisitor {
        type Value = Option<Vec<(QuestionType, i64)>>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of question type to count")
        }

        fn visit_none<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: serde::de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(
            self,
            deserializer: D2,
        ) -> std::result::Result<Self::Value, D2::Error> {
            deserializer.deserialize_map(self)
        }

        fn visit_map<A: MapAccess<'de>>(
            self,
            mut map: A,
        ) -> std::result::Result<Self::Value, A::Error> {
            let mut pairs = Vec::new();
            while let Some((question_type, count)) = map.next_entry::<QuestionType, i64>()? {
                pairs.push((question_type, count));
            }
            Ok(Some(pairs))
        }
    }

    deserializer.deserialize_option(QuantitiesVisitor)
}
