//! Brings a mixed-type question list in line with its plan.
//!
//! All three operations are no-ops for single-type plans and idempotent on a list that
//! already matches.

use crate::models::question::{GeneratedQuestion, QuestionType};
use crate::services::distribution_planner::TypeDistributionPlan;

/// Retag untagged, out-of-plan and surplus questions so each plan type reaches its count.
///
/// Surplus is taken from the tail of a type's matches so the model's earlier picks stay put.
pub fn enforce_distribution(questions: &mut [GeneratedQuestion], plan: &TypeDistributionPlan) {
    if !plan.is_mixed() {
        return;
    }

    let entries = plan.entries();
    let mut counts = vec![0u32; entries.len()];
    let mut queue: Vec<usize> = Vec::new();

    for (i, q) in questions.iter().enumerate() {
        match q.declared_type().and_then(|t| plan.index_of(t)) {
            Some(slot) => counts[slot] += 1,
            None => queue.push(i),
        }
    }

    for (slot, entry) in entries.iter().enumerate() {
        let excess = counts[slot].saturating_sub(entry.count) as usize;
        if excess == 0 {
            continue;
        }
        let surplus: Vec<usize> = questions
            .iter()
            .enumerate()
            .filter(|(_, q)| q.declared_type() == Some(entry.question_type))
            .map(|(i, _)| i)
            .rev()
            .take(excess)
            .collect();
        queue.extend(surplus);
        counts[slot] = entry.count;
    }

    let mut reassigned = 0;
    for index in queue {
        let Some(slot) = (0..entries.len()).find(|&s| counts[s] < entries[s].count) else {
            break;
        };
        questions[index].suggested_type = Some(entries[slot].question_type.as_str().to_string());
        counts[slot] += 1;
        reassigned += 1;
    }

    if reassigned > 0 {
        tracing::debug!("Reassigned {} question(s) to meet distribution", reassigned);
    }
}

/// Stable sort into plan order; types outside the plan go last.
pub fn sort_by_plan(questions: &mut [GeneratedQuestion], plan: &TypeDistributionPlan) {
    if !plan.is_mixed() {
        return;
    }
    let unknown = plan.entries().len();
    questions.sort_by_key(|q| {
        q.declared_type()
            .and_then(|t| plan.index_of(t))
            .unwrap_or(unknown)
    });
}

/// Cut the list to the plan total, preferring items that fill a plan slot.
pub fn trim_to_plan(
    questions: Vec<GeneratedQuestion>,
    plan: &TypeDistributionPlan,
) -> Vec<GeneratedQuestion> {
    let total = plan.total_len();
    if questions.len() <= total {
        return questions;
    }
    if !plan.is_mixed() {
        let mut questions = questions;
        questions.truncate(total);
        return questions;
    }

    let entries = plan.entries();
    let mut taken = vec![0u32; entries.len()];
    let mut keep = vec![false; questions.len()];
    let mut kept = 0;

    for (i, q) in questions.iter().enumerate() {
        if let Some(slot) = q.declared_type().and_then(|t| plan.index_of(t)) {
            if taken[slot] < entries[slot].count {
                taken[slot] += 1;
                keep[i] = true;
                kept += 1;
            }
        }
    }
    for flag in keep.iter_mut() {
        if kept >= total {
            break;
        }
        if !*flag {
            *flag = true;
            kept += 1;
        }
    }

    questions
        .into_iter()
        .zip(keep)
        .filter_map(|(q, keep)| keep.then_some(q))
        .collect()
}

/// First plan type still short of its count, in plan order.
pub fn first_deficit(
    questions: &[GeneratedQuestion],
    plan: &TypeDistributionPlan,
) -> Option<QuestionType> {
    if let Some(only) = plan.single_type() {
        return (questions.len() < plan.total_len()).then_some(only);
    }
    let counts = count_by_type(questions, plan);
    plan.entries()
        .iter()
        .zip(counts)
        .find(|(entry, (_, have))| *have < entry.count)
        .map(|(entry, _)| entry.question_type)
}

/// Per-plan-type counts of declared tags, for logging and checks.
pub fn count_by_type(
    questions: &[GeneratedQuestion],
    plan: &TypeDistributionPlan,
) -> Vec<(QuestionType, u32)> {
    plan.types()
        .map(|t| {
            let n = questions
                .iter()
                .filter(|q| q.declared_type() == Some(t))
                .count() as u32;
            (t, n)
        })
        .collect()
}
