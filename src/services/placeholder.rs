//! Deterministic filler content used when the model under-delivers.
//!
//! Every string here is recognizable by `is_placeholder`, which is what the
//! plausibility gate counts against.

use crate::models::question::{GeneratedQuestion, LanguageMode, QuestionType};
use crate::utils::answer_marker::mark_correct;

pub const PLACEHOLDER_EMOJI: &str = "❓";

/// Questions this short are never counted as real content.
const MIN_REAL_QUESTION_CHARS: usize = 10;

pub fn sample_question_text(position: usize, language: LanguageMode) -> String {
    match language {
        LanguageMode::English => format!("Sample question {}.", position),
        LanguageMode::Vietnamese => format!("Câu hỏi mẫu {}.", position),
    }
}

pub fn auto_fix_question_text(position: usize, language: LanguageMode) -> String {
    match language {
        LanguageMode::English => format!("Question {} (auto fix).", position),
        LanguageMode::Vietnamese => format!("Câu hỏi {} (tự động fix).", position),
    }
}

pub fn sample_explanation(language: LanguageMode) -> &'static str {
    match language {
        LanguageMode::English => "Sample explanation.",
        LanguageMode::Vietnamese => "Giải thích mẫu.",
    }
}

pub fn parse_error_explanation(language: LanguageMode) -> &'static str {
    match language {
        LanguageMode::English => "Parse error, using sample.",
        LanguageMode::Vietnamese => "Lỗi parse, dùng mẫu.",
    }
}

pub fn sample_answer(language: LanguageMode) -> &'static str {
    match language {
        LanguageMode::English => "Sample answer.",
        LanguageMode::Vietnamese => "Đáp án mẫu.",
    }
}

/// Placeholder options for a choice-based type; `None` for open-ended.
///
/// True/false always yields two options with the second marked. Multiple select
/// draws from a fixed marked/unmarked pool. Multiple choice marks only the first.
pub fn dummy_answers(
    question_type: QuestionType,
    num_answers: u32,
    language: LanguageMode,
) -> Option<Vec<String>> {
    let count = num_answers.max(2) as usize;
    let (truthy, falsy, filler) = match language {
        LanguageMode::English => ("True", "False", "Option"),
        LanguageMode::Vietnamese => ("Đúng", "Sai", "Mẫu"),
    };

    match question_type {
        QuestionType::TrueFalse => Some(vec![truthy.to_string(), mark_correct(falsy)]),
        QuestionType::MultipleSelect => {
            let (wrong, right) = match language {
                LanguageMode::English => ("Incorrect", "Correct"),
                LanguageMode::Vietnamese => (falsy, truthy),
            };
            let pool = [
                wrong.to_string(),
                mark_correct(right),
                mark_correct(right),
                wrong.to_string(),
            ];
            let mut answers: Vec<String> = pool.into_iter().take(count).collect();
            answers.resize(count, wrong.to_string());
            Some(answers)
        }
        QuestionType::MultipleChoice => Some(
            (0..count)
                .map(|i| {
                    let text = match language {
                        LanguageMode::English => format!("{} {}", filler, option_letter(i)),
                        LanguageMode::Vietnamese => filler.to_string(),
                    };
                    if i == 0 {
                        mark_correct(&text)
                    } else {
                        text
                    }
                })
                .collect(),
        ),
        QuestionType::OpenEnded => None,
    }
}

/// A full filler question for the given 1-based position.
pub fn placeholder_question(
    position: usize,
    question_type: QuestionType,
    num_answers: u32,
    language: LanguageMode,
) -> GeneratedQuestion {
    GeneratedQuestion {
        question_text: sample_question_text(position, language),
        emoji: PLACEHOLDER_EMOJI.to_string(),
        explanation: sample_explanation(language).to_string(),
        answers: dummy_answers(question_type, num_answers, language),
        model_answer: (!question_type.is_choice_based())
            .then(|| sample_answer(language).to_string()),
        suggested_type: Some(question_type.as_str().to_string()),
    }
}

/// Stand-in for an object the model emitted but that could not be parsed.
pub fn auto_fix_question(
    position: usize,
    question_type: QuestionType,
    num_answers: u32,
    language: LanguageMode,
) -> GeneratedQuestion {
    GeneratedQuestion {
        question_text: auto_fix_question_text(position, language),
        explanation: parse_error_explanation(language).to_string(),
        ..placeholder_question(position, question_type, num_answers, language)
    }
}

pub fn is_placeholder(question: &GeneratedQuestion, language: LanguageMode) -> bool {
    let text = question.question_text.trim();
    let marker = match language {
        LanguageMode::English => "Sample",
        LanguageMode::Vietnamese => "mẫu",
    };
    text.contains(marker)
        || text.contains("auto fix")
        || text.contains("tự động fix")
        || text.chars().count() <= MIN_REAL_QUESTION_CHARS
}

fn option_letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}
