use serde::{Deserialize, Serialize};

use super::question::{Difficulty, ExerciseKind, FinalizedQuestion};

/// Outbound exercise. Identifiers are synthesized per response and are not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedExercise {
    pub id: i64,
    pub name: String,
    pub lesson_name: String,
    #[serde(rename = "type")]
    pub exercise_type: ExerciseKind,
    pub question_type_id: i64,
    pub num_questions: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_answers: Option<u32>,
    pub difficulty: Difficulty,
    pub user_id: i64,
    pub created_at: String,
    pub questions: Vec<FinalizedQuestion>,
}
