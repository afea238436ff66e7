//! Turns raw model text into a plan-shaped list of questions.
//!
//! The text is first normalized (fences stripped, a truncated array closed, the array
//! span isolated), then handed to an ordered list of parse strategies. The first one
//! that yields questions wins; its output is enforced, padded, checked for plausibility
//! and trimmed to the requested total.

use crate::models::question::{GeneratedQuestion, LanguageMode};
use crate::services::distribution_enforcer::{
    count_by_type, enforce_distribution, first_deficit, sort_by_plan, trim_to_plan,
};
use crate::services::distribution_planner::TypeDistributionPlan;
use crate::services::placeholder::{
    auto_fix_question, dummy_answers, is_placeholder, placeholder_question, sample_answer,
    sample_explanation, sample_question_text, PLACEHOLDER_EMOJI,
};
use regex::{Captures, Regex};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("no JSON array found in model output")]
    NoArray,

    #[error("model output could not be parsed: {0}")]
    Unparsable(String),

    #[error("too many placeholder questions: {real} real of {total} requested")]
    TooManyPlaceholders { real: usize, total: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairLayer {
    Direct,
    Repaired,
    Salvaged,
}

impl fmt::Display for RepairLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RepairLayer::Direct => "direct parse",
            RepairLayer::Repaired => "textual repair",
            RepairLayer::Salvaged => "object salvage",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionContext<'a> {
    pub plan: &'a TypeDistributionPlan,
    pub num_answers: u32,
    pub language: LanguageMode,
    /// Fraction of the total that must be real questions.
    pub plausibility_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub questions: Vec<GeneratedQuestion>,
    pub layer: RepairLayer,
    pub padded: usize,
}

type Strategy = fn(&str, &ExtractionContext<'_>) -> Result<Vec<GeneratedQuestion>, ExtractError>;

const STRATEGIES: &[(RepairLayer, Strategy)] = &[
    (RepairLayer::Direct, parse_direct),
    (RepairLayer::Repaired, parse_repaired),
    (RepairLayer::Salvaged, salvage_objects),
];

pub fn extract_questions(
    raw: &str,
    ctx: &ExtractionContext<'_>,
) -> Result<Extraction, ExtractError> {
    let text = close_truncated_array(strip_markdown_fences(raw));
    let span = isolate_array(&text).ok_or(ExtractError::NoArray)?;

    let mut last_error = ExtractError::Unparsable("no strategy applied".to_string());
    for (layer, strategy) in STRATEGIES {
        match strategy(span, ctx) {
            Ok(questions) => {
                tracing::info!("Extracted {} question(s) via {}", questions.len(), layer);
                return finish(questions, *layer, ctx);
            }
            Err(e) => {
                tracing::debug!("{} failed: {}", layer, e);
                last_error = e;
            }
        }
    }
    Err(last_error)
}

/// Enforce, pad, gate, trim. Shared by every strategy.
fn finish(
    mut questions: Vec<GeneratedQuestion>,
    layer: RepairLayer,
    ctx: &ExtractionContext<'_>,
) -> Result<Extraction, ExtractError> {
    let plan = ctx.plan;
    let total = plan.total_len();

    enforce_distribution(&mut questions, plan);
    sort_by_plan(&mut questions, plan);

    let mut padded = 0;
    while questions.len() < total {
        let target = first_deficit(&questions, plan).unwrap_or_else(|| plan.type_at(questions.len()));
        questions.push(placeholder_question(
            questions.len() + 1,
            target,
            ctx.num_answers,
            ctx.language,
        ));
        enforce_distribution(&mut questions, plan);
        sort_by_plan(&mut questions, plan);
        padded += 1;
    }
    if padded > 0 {
        tracing::warn!("Padded {} placeholder question(s) after {}", padded, layer);
    }

    let real = questions
        .iter()
        .filter(|q| !is_placeholder(q, ctx.language))
        .count();
    if (real as f64) < ctx.plausibility_threshold * total as f64 {
        return Err(ExtractError::TooManyPlaceholders { real, total });
    }

    let questions = trim_to_plan(questions, plan);
    if plan.is_mixed() {
        tracing::debug!("Counts after extraction: {:?}", count_by_type(&questions, plan));
    }

    Ok(Extraction {
        questions,
        layer,
        padded,
    })
}

pub fn strip_markdown_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
        text = text.trim_start();
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest.trim_end();
    }
    text
}

/// Output cut off by the token limit loses its closing bracket.
pub fn close_truncated_array(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.ends_with(']') {
        trimmed.to_string()
    } else {
        tracing::debug!("Appending ']' to truncated model output");
        format!("{}]", trimmed)
    }
}

/// First `[` through last `]`.
pub fn isolate_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

/// Conservative fixes: newlines, trailing commas, bare-word values.
pub fn repair_json_text(text: &str) -> String {
    let text = newline_regex().replace_all(text, " ");
    let text = trailing_comma_regex().replace_all(&text, "$1");
    bare_word_regex()
        .replace_all(&text, |caps: &Captures<'_>| {
            let word = &caps[1];
            let literal = matches!(word, "true" | "false" | "null")
                || serde_json::from_str::<serde_json::Number>(word).is_ok();
            if literal {
                format!(":{}{}", word, &caps[2])
            } else {
                format!(":\"{}\"{}", word, &caps[2])
            }
        })
        .into_owned()
}

fn parse_direct(span: &str, _ctx: &ExtractionContext<'_>) -> Result<Vec<GeneratedQuestion>, ExtractError> {
    parse_array(span)
}

fn parse_repaired(span: &str, _ctx: &ExtractionContext<'_>) -> Result<Vec<GeneratedQuestion>, ExtractError> {
    parse_array(&repair_json_text(span))
}

/// Parse each `{...}` span on its own; unparsable ones become auto-fix placeholders.
fn salvage_objects(
    span: &str,
    ctx: &ExtractionContext<'_>,
) -> Result<Vec<GeneratedQuestion>, ExtractError> {
    let repaired = repair_json_text(span);
    let total = ctx.plan.total_len();
    let objects: Vec<&str> = object_regex()
        .find_iter(&repaired)
        .map(|m| m.as_str())
        .take(total)
        .collect();

    if objects.is_empty() {
        return Err(ExtractError::Unparsable(
            "no object spans found".to_string(),
        ));
    }

    let mut salvaged = Vec::with_capacity(objects.len());
    for (i, raw) in objects.into_iter().enumerate() {
        let cleaned = trailing_comma_regex().replace_all(raw, "$1");
        let parsed = serde_json::from_str::<JsonValue>(&cleaned)
            .ok()
            .and_then(|v| coerce_question(&v));

        let question = match parsed {
            Some(q) => backfill(q, i, ctx),
            None => {
                let target = ctx.plan.type_at(salvaged.len());
                tracing::debug!("Object {} unparsable, substituting placeholder", i + 1);
                auto_fix_question(i + 1, target, ctx.num_answers, ctx.language)
            }
        };
        salvaged.push(question);
    }
    Ok(salvaged)
}

fn backfill(mut q: GeneratedQuestion, index: usize, ctx: &ExtractionContext<'_>) -> GeneratedQuestion {
    if q.question_text.trim().is_empty() {
        q.question_text = sample_question_text(index + 1, ctx.language);
    }
    if q.emoji.trim().is_empty() {
        q.emoji = PLACEHOLDER_EMOJI.to_string();
    }
    if q.explanation.trim().is_empty() {
        q.explanation = sample_explanation(ctx.language).to_string();
    }

    let question_type = match q.declared_type() {
        Some(t) => t,
        None => {
            let t = ctx.plan.type_at(index);
            q.suggested_type = Some(t.as_str().to_string());
            t
        }
    };

    if question_type.is_choice_based() {
        if q.answers.as_ref().map_or(true, |a| a.is_empty()) {
            q.answers = dummy_answers(question_type, ctx.num_answers, ctx.language);
        }
    } else if q.model_answer.as_ref().map_or(true, |a| a.trim().is_empty()) {
        q.model_answer = Some(sample_answer(ctx.language).to_string());
    }
    q
}

fn parse_array(text: &str) -> Result<Vec<GeneratedQuestion>, ExtractError> {
    let value: JsonValue =
        serde_json::from_str(text).map_err(|e| ExtractError::Unparsable(e.to_string()))?;
    let items = value
        .as_array()
        .ok_or_else(|| ExtractError::Unparsable("top-level value is not an array".to_string()))?;
    Ok(items.iter().filter_map(coerce_question).collect())
}

/// Lenient field mapping; anything that is not an object is dropped.
fn coerce_question(v: &JsonValue) -> Option<GeneratedQuestion> {
    let obj = v.as_object()?;
    let text = |key: &str| obj.get(key).and_then(scalar_to_string);

    let answers = obj.get("answers").and_then(|a| a.as_array()).map(|a| {
        a.iter()
            .filter_map(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
    });

    Some(GeneratedQuestion {
        question_text: text("question_text")
            .or_else(|| text("question"))
            .unwrap_or_default(),
        emoji: text("emoji").unwrap_or_default(),
        explanation: text("explanation").unwrap_or_default(),
        answers,
        model_answer: text("model_answer").filter(|s| !s.trim().is_empty()),
        suggested_type: text("suggested_type").filter(|s| !s.trim().is_empty()),
    })
}

fn scalar_to_string(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::String(s) => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn newline_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\n]+").expect("static newline pattern"))
}

fn trailing_comma_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([}\]])").expect("static trailing comma pattern"))
}

fn bare_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r":\s*([A-Za-z0-9_]+)\s*([,}])").expect("static bare word pattern")
    })
}

fn object_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*?\}").expect("static object pattern"))
}
