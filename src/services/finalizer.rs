//! Turns the accepted question list into the outbound exercise.

use crate::models::exercise::GeneratedExercise;
use crate::models::question::{
    AnswerOption, FinalizedQuestion, GeneratedQuestion, LanguageMode, QuestionType,
};
use crate::services::generation_service::GenerationRequest;
use crate::services::placeholder::{
    dummy_answers, sample_answer, sample_explanation, PLACEHOLDER_EMOJI,
};
use crate::services::type_catalog::TypeCatalog;
use crate::utils::answer_marker::{parse_option, MarkedOption};
use crate::utils::id_sequence::IdSequence;

pub fn finalize_exercise(
    request: &GenerationRequest,
    questions: Vec<GeneratedQuestion>,
    ids: &mut IdSequence,
    created_at: String,
) -> GeneratedExercise {
    let plan = &request.plan;
    let mut catalog = TypeCatalog::with_defaults();
    let exercise_kind = plan.exercise_kind();
    let default_type = exercise_kind.default_question_type();
    let exercise_type_id = catalog.id_for(default_type);
    let exercise_id = ids.next_id();

    let finalized = questions
        .into_iter()
        .enumerate()
        .map(|(i, q)| {
            let resolved = match plan.single_type() {
                Some(only) => Some(only),
                None if q.suggested_type.is_none() => Some(default_type),
                None => q.declared_type(),
            };

            let (type_id, label) = match (resolved, q.suggested_type.as_deref()) {
                (Some(t), _) => (catalog.id_for(t), t.as_str().to_string()),
                (None, Some(tag)) => (catalog.resolve_tag(tag), tag.trim().to_string()),
                (None, None) => (exercise_type_id, default_type.as_str().to_string()),
            };

            finalize_question(q, i, resolved, type_id, label, request, ids)
        })
        .collect();

    GeneratedExercise {
        id: exercise_id,
        name: request.exercise_name.clone(),
        lesson_name: request.lesson_name.clone(),
        exercise_type: exercise_kind,
        question_type_id: exercise_type_id,
        num_questions: plan.total(),
        num_answers: outbound_num_answers(request),
        difficulty: request.difficulty,
        user_id: request.user_id,
        created_at,
        questions: finalized,
    }
}

/// Only single-type choice exercises report an option count.
fn outbound_num_answers(request: &GenerationRequest) -> Option<u32> {
    match request.plan.single_type() {
        Some(QuestionType::TrueFalse) => Some(2),
        Some(t) if t.is_choice_based() => Some(request.num_answers),
        _ => None,
    }
}

fn finalize_question(
    q: GeneratedQuestion,
    index: usize,
    resolved: Option<QuestionType>,
    type_id: i64,
    label: String,
    request: &GenerationRequest,
    ids: &mut IdSequence,
) -> FinalizedQuestion {
    let language = request.language;
    let id = ids.next_id();

    let (answers, model_answer) = match resolved {
        Some(t) if t.is_choice_based() => {
            let options = normalize_options(t, q.answers.as_deref(), request.num_answers, language, index);
            (Some(assign_ids(options, ids)), q.model_answer)
        }
        Some(_) => (None, Some(open_ended_answer(&q, language))),
        // unknown tag: keep whatever the model gave, markers parsed
        None => {
            let answers = q
                .answers
                .as_deref()
                .filter(|a| !a.is_empty())
                .map(|a| assign_ids(a.iter().map(|s| parse_option(s)).collect(), ids));
            (answers, q.model_answer)
        }
    };

    FinalizedQuestion {
        id,
        order_num: index as u32 + 1,
        question_type_id: type_id,
        question_type: label.clone(),
        question_text: q.question_text,
        emoji: non_blank_or(q.emoji, PLACEHOLDER_EMOJI),
        explanation: non_blank_or(q.explanation, sample_explanation(language)),
        answers,
        model_answer,
        suggested_type: Some(label),
    }
}

/// Shape options to the type's contract.
///
/// True/false needs exactly two options; single-correct types keep exactly one mark.
fn normalize_options(
    question_type: QuestionType,
    raw: Option<&[String]>,
    num_answers: u32,
    language: LanguageMode,
    index: usize,
) -> Vec<MarkedOption> {
    let usable = raw.filter(|a| match question_type {
        QuestionType::TrueFalse => a.len() == 2,
        _ => a.len() >= 2,
    });

    let raw: Vec<String> = match usable {
        Some(a) => a.to_vec(),
        None => {
            tracing::warn!(
                "Question {} has no usable {} options, using placeholders",
                index + 1,
                question_type
            );
            dummy_answers(question_type, num_answers, language).unwrap_or_default()
        }
    };

    let mut options: Vec<MarkedOption> = raw.iter().map(|s| parse_option(s)).collect();

    if !question_type.allows_multiple_correct() {
        let marked = options.iter().filter(|o| o.is_correct).count();
        if marked > 1 {
            tracing::warn!(
                "Question {} has {} correct options, keeping the first",
                index + 1,
                marked
            );
            let mut seen = false;
            for option in options.iter_mut().filter(|o| o.is_correct) {
                option.is_correct = !seen;
                seen = true;
            }
        } else if marked == 0 {
            tracing::warn!("Question {} has no correct option, marking the first", index + 1);
            if let Some(first) = options.first_mut() {
                first.is_correct = true;
            }
        }
    }
    options
}

fn open_ended_answer(q: &GeneratedQuestion, language: LanguageMode) -> String {
    if let Some(answer) = q.model_answer.as_deref().filter(|a| !a.trim().is_empty()) {
        return answer.trim().to_string();
    }
    q.answers
        .iter()
        .flatten()
        .map(|s| parse_option(s))
        .find(|o| o.is_correct && !o.text.is_empty())
        .map(|o| o.text)
        .unwrap_or_else(|| sample_answer(language).to_string())
}

fn assign_ids(options: Vec<MarkedOption>, ids: &mut IdSequence) -> Vec<AnswerOption> {
    options
        .into_iter()
        .map(|o| AnswerOption {
            id: ids.next_id(),
            answer_text: o.text,
            is_correct: o.is_correct,
        })
        .collect()
}

fn non_blank_or(value: String, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Difficulty, ExerciseKind};
    use crate::services::distribution_planner::TypeDistributionPlan;
    use QuestionType::*;

    fn request(plan: TypeDistributionPlan) -> GenerationRequest {
        GenerationRequest {
            exercise_name: "Quiz".to_string(),
            lesson_name: "Photosynthesis".to_string(),
            plan,
            difficulty: Difficulty::Easy,
            num_answers: 4,
            language: LanguageMode::English,
            user_id: 7,
        }
    }

    fn q(tag: Option<&str>, answers: Option<&[&str]>) -> GeneratedQuestion {
        GeneratedQuestion {
            question_text: "What do plants need for photosynthesis?".to_string(),
            emoji: String::new(),
            explanation: "Light.".to_string(),
            answers: answers.map(|a| a.iter().map(|s| s.to_string()).collect()),
            model_answer: None,
            suggested_type: tag.map(str::to_string),
        }
    }

    #[test]
    fn ids_and_positions_are_sequential() {
        let req = request(TypeDistributionPlan::from_selected(2, &[TrueFalse]).unwrap());
        let questions = vec![
            q(Some("true_false"), Some(&["True (correct)", "False"])),
            q(Some("true_false"), Some(&["True", "False (correct)"])),
        ];
        let mut ids = IdSequence::starting_at(1000);
        let exercise = finalize_exercise(&req, questions, &mut ids, "2026-01-01 00:00:00".into());

        assert_eq!(exercise.id, 1000);
        assert_eq!(exercise.questions[0].id, 1001);
        assert_eq!(exercise.questions[0].answers.as_ref().unwrap()[0].id, 1002);
        assert_eq!(exercise.questions[1].id, 1004);
        assert_eq!(exercise.questions[1].order_num, 2);
        assert_eq!(exercise.exercise_type, ExerciseKind::TrueFalse);
        assert_eq!(exercise.question_type_id, 2);
        assert_eq!(exercise.num_answers, Some(2));
        assert_eq!(exercise.questions[0].emoji, "❓");
    }

    #[test]
    fn single_correct_types_keep_only_the_first_mark() {
        let req = request(TypeDistributionPlan::from_selected(1, &[MultipleChoice]).unwrap());
        let questions = vec![q(None, Some(&["A (correct)", "B (correct)", "C", "D"]))];
        let exercise =
            finalize_exercise(&req, questions, &mut IdSequence::starting_at(1), String::new());
        let answers = exercise.questions[0].answers.as_ref().unwrap();
        let flags: Vec<bool> = answers.iter().map(|a| a.is_correct).collect();
        assert_eq!(flags, vec![true, false, false, false]);
        assert_eq!(answers[1].answer_text, "B");
        assert_eq!(exercise.questions[0].question_type_id, 1);
    }

    #[test]
    fn multiple_select_keeps_every_mark() {
        let req = request(TypeDistributionPlan::from_selected(1, &[MultipleSelect]).unwrap());
        let questions = vec![q(None, Some(&["A (correct)", "B (correct)", "C"]))];
        let exercise =
            finalize_exercise(&req, questions, &mut IdSequence::starting_at(1), String::new());
        let correct = exercise.questions[0]
            .answers
            .as_ref()
            .unwrap()
            .iter()
            .filter(|a| a.is_correct)
            .count();
        assert_eq!(correct, 2);
    }

    #[test]
    fn true_false_with_wrong_option_count_gets_placeholders() {
        let req = request(TypeDistributionPlan::from_selected(1, &[TrueFalse]).unwrap());
        let questions = vec![q(None, Some(&["A (correct)", "B", "C"]))];
        let exercise =
            finalize_exercise(&req, questions, &mut IdSequence::starting_at(1), String::new());
        let answers = exercise.questions[0].answers.as_ref().unwrap();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers.iter().filter(|a| a.is_correct).count(), 1);
    }

    #[test]
    fn open_ended_drops_options_and_backfills_a_sample_answer() {
        let plan = TypeDistributionPlan::from_quantities(2, &[(MultipleChoice, 1), (OpenEnded, 1)])
            .unwrap();
        let req = request(plan);
        let questions = vec![
            q(Some("multiple_choice"), Some(&["A (correct)", "B", "C", "D"])),
            q(Some("open_ended"), Some(&["Sunlight (correct)", "Salt"])),
        ];
        let exercise =
            finalize_exercise(&req, questions, &mut IdSequence::starting_at(1), String::new());
        let open = &exercise.questions[1];
        assert!(open.answers.is_none());
        assert_eq!(open.model_answer.as_deref(), Some("Sunlight"));
        assert_eq!(open.question_type_id, 4);
        assert_eq!(exercise.exercise_type, ExerciseKind::Mixed);
        assert_eq!(exercise.num_answers, None);
        assert_eq!(exercise.question_type_id, 1);
    }

    #[test]
    fn unknown_tags_get_fresh_type_ids() {
        let plan = TypeDistributionPlan::from_quantities(2, &[(MultipleChoice, 1), (TrueFalse, 1)])
            .unwrap();
        let req = request(plan);
        let questions = vec![
            q(Some("matching"), Some(&["x (correct)", "y"])),
            q(Some("ordering"), None),
        ];
        let exercise =
            finalize_exercise(&req, questions, &mut IdSequence::starting_at(1), String::new());
        assert_eq!(exercise.questions[0].question_type_id, 5);
        assert_eq!(exercise.questions[0].question_type, "matching");
        assert_eq!(exercise.questions[1].question_type_id, 6);
        assert!(exercise.questions[0].answers.as_ref().unwrap()[0].is_correct);
    }
}
