//! Lesson-name heuristics: which language to prompt in and which subject to name.

use crate::models::question::LanguageMode;

const ENGLISH_GRAMMAR_KEYWORDS: &[&str] = &[
    "english",
    "grammar",
    "passive",
    "voice",
    "infinitive",
    "gerund",
    "ving",
    "tov",
    "tense",
    "conditional",
];

pub fn is_english_grammar(lesson_name: &str) -> bool {
    let lower = lesson_name.to_lowercase();
    ENGLISH_GRAMMAR_KEYWORDS.iter().any(|k| lower.contains(k))
}

pub fn detect_language(lesson_name: &str) -> LanguageMode {
    if is_english_grammar(lesson_name) {
        LanguageMode::English
    } else {
        LanguageMode::Vietnamese
    }
}

/// Subject label shown to the model, rendered in the prompt language.
pub fn subject_hint(lesson_name: &str, language: LanguageMode) -> &'static str {
    let lower = lesson_name.to_lowercase();
    let grammar = is_english_grammar(lesson_name);

    let subject = if lower.contains("math") || lower.contains("toán") {
        Subject::Mathematics
    } else if lower.contains("english") || lower.contains("tiếng anh") {
        if grammar {
            Subject::EnglishGrammar
        } else {
            Subject::EnglishLiterature
        }
    } else if lower.contains("vietnamese") || lower.contains("tiếng việt") {
        Subject::VietnameseLiterature
    } else if grammar {
        Subject::EnglishGrammar
    } else {
        Subject::General
    };

    subject.label(language)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subject {
    Mathematics,
    EnglishGrammar,
    EnglishLiterature,
    VietnameseLiterature,
    General,
}

impl Subject {
    fn label(&self, language: LanguageMode) -> &'static str {
        match (language, self) {
            (LanguageMode::English, Subject::Mathematics) => "Mathematics",
            (LanguageMode::English, Subject::EnglishGrammar) => "English Grammar",
            (LanguageMode::English, Subject::EnglishLiterature) => "English Literature",
            (LanguageMode::English, Subject::VietnameseLiterature) => "Vietnamese Literature",
            (LanguageMode::English, Subject::General) => "General Knowledge",
            (LanguageMode::Vietnamese, Subject::Mathematics) => "Toán học",
            (LanguageMode::Vietnamese, Subject::EnglishGrammar) => "Ngữ pháp tiếng Anh",
            (LanguageMode::Vietnamese, Subject::EnglishLiterature) => "Tiếng Anh",
            (LanguageMode::Vietnamese, Subject::VietnameseLiterature) => "Tiếng Việt",
            (LanguageMode::Vietnamese, Subject::General) => "Kiến thức chung",
        }
    }
}
