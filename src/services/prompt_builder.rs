//! Renders the instruction text sent to the model.
//!
//! Pure: the same plan and settings always produce the same prompt.

use crate::models::question::{Difficulty, LanguageMode, QuestionType};
use crate::services::distribution_planner::TypeDistributionPlan;
use crate::services::type_catalog::TypeCatalog;
use crate::utils::answer_marker::CORRECT_MARKER;
use crate::utils::subject::{is_english_grammar, subject_hint};

#[derive(Debug, Clone)]
pub struct PromptSettings<'a> {
    pub plan: &'a TypeDistributionPlan,
    pub difficulty: Difficulty,
    pub lesson_name: &'a str,
    /// Options per choice-based question (true/false is always 2).
    pub num_answers: u32,
    pub language: LanguageMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    /// The JSON object shape the model is told to emit.
    pub object_shape: String,
}

pub fn build_prompt(settings: &PromptSettings<'_>) -> Prompt {
    let object_shape = object_shape(settings.plan);
    let text = match settings.language {
        LanguageMode::English => english_prompt(settings, &object_shape),
        LanguageMode::Vietnamese => vietnamese_prompt(settings, &object_shape),
    };
    Prompt { text, object_shape }
}

pub fn object_shape(plan: &TypeDistributionPlan) -> String {
    match plan.single_type() {
        None => format!(
            r#"{{ "question_text": "...", "emoji": "...", "answers"?: ["...", "... {m}", ...], "model_answer"?: "...", "explanation": "...", "suggested_type": "{tags}" }}"#,
            m = CORRECT_MARKER,
            tags = plan.types().map(|t| t.as_str()).collect::<Vec<_>>().join("|"),
        ),
        Some(QuestionType::OpenEnded) => {
            r#"{ "question_text": "...", "emoji": "...", "model_answer": "...", "explanation": "...", "suggested_type": "open_ended" }"#
                .to_string()
        }
        Some(t) => format!(
            r#"{{ "question_text": "...", "emoji": "...", "answers": ["...", "... {m}", ...], "explanation": "...", "suggested_type": "{t}" }}"#,
            m = CORRECT_MARKER,
            t = t.as_str(),
        ),
    }
}

/// `2 of type multiple_choice, 3 of type true_false`
pub fn distribution_summary(plan: &TypeDistributionPlan, language: LanguageMode) -> String {
    plan.entries()
        .iter()
        .map(|e| match language {
            LanguageMode::English => format!("{} of type {}", e.count, e.question_type),
            LanguageMode::Vietnamese => format!("{} câu loại {}", e.count, e.question_type),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `questions 1-3: "multiple_choice", questions 4-5: "true_false"`
pub fn ordering_ranges(plan: &TypeDistributionPlan, language: LanguageMode) -> String {
    let noun = match language {
        LanguageMode::English => "questions",
        LanguageMode::Vietnamese => "câu",
    };
    let mut start = 1;
    plan.entries()
        .iter()
        .map(|e| {
            let end = start + e.count - 1;
            let range = format!("{} {}-{}: \"{}\"", noun, start, end, e.question_type);
            start = end + 1;
            range
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn type_rule(question_type: QuestionType, num_answers: u32, language: LanguageMode) -> String {
    let m = CORRECT_MARKER;
    match (language, question_type) {
        (LanguageMode::English, QuestionType::MultipleChoice) => format!(
            "multiple_choice: {} short options, exactly 1 marked \"{}\".",
            num_answers, m
        ),
        (LanguageMode::English, QuestionType::TrueFalse) => format!(
            "true_false: exactly 2 options (\"True\", \"False\"), exactly 1 marked \"{}\".",
            m
        ),
        (LanguageMode::English, QuestionType::MultipleSelect) => format!(
            "multiple_select: {} short options, MORE THAN ONE marked \"{}\".",
            num_answers, m
        ),
        (LanguageMode::English, QuestionType::OpenEnded) => {
            "open_ended: no \"answers\"; include a short \"model_answer\" as the sample response."
                .to_string()
        }
        (LanguageMode::Vietnamese, QuestionType::MultipleChoice) => format!(
            "multiple_choice: {} lựa chọn ngắn, đúng 1 lựa chọn có \"{}\".",
            num_answers, m
        ),
        (LanguageMode::Vietnamese, QuestionType::TrueFalse) => format!(
            "true_false: đúng 2 lựa chọn (\"Đúng\", \"Sai\"), đúng 1 lựa chọn có \"{}\".",
            m
        ),
        (LanguageMode::Vietnamese, QuestionType::MultipleSelect) => format!(
            "multiple_select: {} lựa chọn ngắn, NHIỀU HƠN MỘT lựa chọn có \"{}\".",
            num_answers, m
        ),
        (LanguageMode::Vietnamese, QuestionType::OpenEnded) => {
            "open_ended: không có \"answers\", thêm \"model_answer\" ngắn làm đáp án mẫu."
                .to_string()
        }
    }
}

fn type_rules(settings: &PromptSettings<'_>) -> String {
    settings
        .plan
        .types()
        .map(|t| format!("- {}", type_rule(t, settings.num_answers, settings.language)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn level_description(language: LanguageMode, grammar: bool) -> &'static str {
    match (language, grammar) {
        (LanguageMode::English, true) => {
            "high school students (grades 10-12), academic English grammar for the national curriculum"
        }
        (LanguageMode::English, false) => "high school students (grades 10-12), academic language",
        (LanguageMode::Vietnamese, _) => "học sinh THPT (lớp 10-12), ngôn ngữ học thuật",
    }
}

fn english_prompt(settings: &PromptSettings<'_>, object_shape: &str) -> String {
    let plan = settings.plan;
    let total = plan.total();
    let grammar = is_english_grammar(settings.lesson_name);
    let subject = subject_hint(settings.lesson_name, LanguageMode::English);
    let types = plan.types().map(|t| t.as_str()).collect::<Vec<_>>().join(", ");

    let kind = match plan.single_type() {
        None => format!("mixed-type questions from {}", types),
        Some(QuestionType::OpenEnded) => "open-ended questions".to_string(),
        Some(t) => format!("{} questions", t.type_name()),
    };

    let mut text = format!(
        "Respond with ONLY a valid JSON array of exactly {total} objects. No other text, no markdown fences, no commentary. \
Keep the JSON compact on one line; explanations under 30 words, options under 5 words each.\n\
Each object: {object_shape}\n\
Generate {total} SHORT {kind} for {level} on {subject}, lesson: \"{lesson}\".\n",
        level = level_description(LanguageMode::English, grammar),
        lesson = settings.lesson_name,
    );

    if grammar {
        text.push_str(
            "FOCUS ON GRAMMAR PRACTICE: test rules such as passive voice, to-infinitive versus gerund, \
sentence transformation, error identification and fill-in-the-blank with the correct form, using realistic classroom examples.\n",
        );
    }

    text.push_str("REQUIREMENTS:\n");
    if plan.is_mixed() {
        text.push_str(&format!(
            "- Distribute EXACTLY as: {}.\n- Order the array by type: {}.\n",
            distribution_summary(plan, LanguageMode::English),
            ordering_ranges(plan, LanguageMode::English),
        ));
    } else {
        text.push_str(&format!(
            "- Exactly {}.\n",
            distribution_summary(plan, LanguageMode::English)
        ));
    }
    text.push_str(&type_rules(settings));
    text.push('\n');
    text.push_str(&format!(
        "- Each question is 1-2 short sentences (under 50 words) with a fitting emoji (e.g. 📝, 🔤, 📚).\n\
- Difficulty: {} ({}).\n\
- Add an \"explanation\" (under 30 words) justifying the correct answer.\n\
- Always set \"suggested_type\" using the catalog {} (only the types {} are allowed).\n",
        settings.difficulty.as_str(),
        settings.difficulty.label(LanguageMode::English),
        TypeCatalog::with_defaults().prompt_listing(),
        types,
    ));
    text
}

fn vietnamese_prompt(settings: &PromptSettings<'_>, object_shape: &str) -> String {
    let plan = settings.plan;
    let total = plan.total();
    let subject = subject_hint(settings.lesson_name, LanguageMode::Vietnamese);
    let types = plan.types().map(|t| t.as_str()).collect::<Vec<_>>().join(", ");

    let kind = match plan.single_type() {
        None => format!("kết hợp các loại {}", types),
        Some(QuestionType::OpenEnded) => "tự luận".to_string(),
        Some(t) => format!("trắc nghiệm dạng {}", t.type_name()),
    };

    let mut text = format!(
        "Chỉ trả lời bằng MỘT mảng JSON hợp lệ gồm đúng {total} object. Không thêm văn bản, không markdown, không giải thích bên ngoài. \
Giữ JSON gọn trên một dòng; explanation dưới 30 chữ, mỗi lựa chọn dưới 5 chữ.\n\
Mỗi object: {object_shape}\n\
Tạo {total} câu hỏi NGẮN GỌN {kind} cho {level}, môn {subject}, bài học: \"{lesson}\".\n\
YÊU CẦU:\n",
        level = level_description(LanguageMode::Vietnamese, false),
        lesson = settings.lesson_name,
    );

    if plan.is_mixed() {
        text.push_str(&format!(
            "- Phân bổ CHÍNH XÁC: {}.\n- Sắp xếp mảng theo loại: {}.\n",
            distribution_summary(plan, LanguageMode::Vietnamese),
            ordering_ranges(plan, LanguageMode::Vietnamese),
        ));
    } else {
        text.push_str(&format!(
            "- Đúng {}.\n",
            distribution_summary(plan, LanguageMode::Vietnamese)
        ));
    }
    text.push_str(&type_rules(settings));
    text.push('\n');
    text.push_str(&format!(
        "- Mỗi câu hỏi 1-2 câu ngắn (dưới 50 chữ), kèm emoji phù hợp (ví dụ: 📊, 🔬, 📖).\n\
- Độ khó: {} ({}).\n\
- Thêm \"explanation\" (dưới 30 chữ) giải thích đáp án đúng.\n\
- Luôn điền \"suggested_type\" theo danh mục {} (chỉ dùng các loại {}).\n",
        settings.difficulty.as_str(),
        settings.difficulty.label(LanguageMode::Vietnamese),
        TypeCatalog::with_defaults().prompt_listing(),
        types,
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use QuestionType::*;

    fn mixed_plan() -> TypeDistributionPlan {
        TypeDistributionPlan::from_quantities(5, &[(MultipleChoice, 3), (TrueFalse, 2)]).unwrap()
    }

    fn render(plan: &TypeDistributionPlan, lesson: &str, language: LanguageMode) -> Prompt {
        build_prompt(&PromptSettings {
            plan,
            difficulty: Difficulty::Hard,
            lesson_name: lesson,
            num_answers: 4,
            language,
        })
    }

    #[test]
    fn mixed_prompt_spells_out_distribution_and_order() {
        let prompt = render(&mixed_plan(), "Passive voice", LanguageMode::English);
        assert!(prompt.text.contains("exactly 5 objects"));
        assert!(prompt
            .text
            .contains("2 of type true_false"));
        assert!(prompt.text.contains("3 of type multiple_choice"));
        assert!(prompt
            .text
            .contains(r#"questions 1-3: "multiple_choice", questions 4-5: "true_false""#));
        assert!(prompt.text.contains("FOCUS ON GRAMMAR PRACTICE"));
        assert!(prompt.object_shape.contains("suggested_type"));
        assert!(prompt.object_shape.contains("multiple_choice|true_false"));
    }

    #[test]
    fn type_rules_follow_the_plan() {
        let prompt = render(&mixed_plan(), "Passive voice", LanguageMode::English);
        assert!(prompt.text.contains("multiple_choice: 4 short options, exactly 1 marked"));
        assert!(prompt.text.contains("true_false: exactly 2 options"));
        assert!(!prompt.text.contains("open_ended: no"));
    }

    #[test]
    fn open_ended_shape_asks_for_a_model_answer() {
        let plan = TypeDistributionPlan::from_selected(3, &[OpenEnded]).unwrap();
        let prompt = render(&plan, "Quang hợp", LanguageMode::Vietnamese);
        assert!(prompt.object_shape.contains("model_answer"));
        assert!(!prompt.object_shape.contains("answers\""));
        assert!(prompt.text.contains("tự luận"));
        assert!(prompt.text.contains("Độ khó: Hard (khó)"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let plan = mixed_plan();
        assert_eq!(
            render(&plan, "Toán: hàm số", LanguageMode::Vietnamese),
            render(&plan, "Toán: hàm số", LanguageMode::Vietnamese)
        );
    }

    #[test]
    fn ranges_accumulate_across_entries() {
        let plan = TypeDistributionPlan::from_selected(7, &[MultipleChoice, TrueFalse, OpenEnded])
            .unwrap();
        assert_eq!(
            ordering_ranges(&plan, LanguageMode::Vietnamese),
            r#"câu 1-3: "multiple_choice", câu 4-5: "true_false", câu 6-7: "open_ended""#
        );
    }
}
