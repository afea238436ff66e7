use crate::error::{Error, Result};
use crate::models::question::{ExerciseKind, QuestionType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    pub question_type: QuestionType,
    pub count: u32,
}

/// Ordered (type, count) pairs. Order is the canonical output order.
///
/// Counts always sum to the requested total, each type appears once and no entry is zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDistributionPlan {
    entries: Vec<PlanEntry>,
}

impl TypeDistributionPlan {
    /// Plan from an explicit type→count map, kept in the caller's order.
    pub fn from_quantities(total: u32, quantities: &[(QuestionType, i64)]) -> Result<Self> {
        let mut entries: Vec<PlanEntry> = Vec::new();
        for &(question_type, count) in quantities {
            if count <= 0 {
                continue;
            }
            let count = u32::try_from(count).map_err(|_| {
                Error::BadRequest(format!("Quantity for {} is too large", question_type))
            })?;
            match entries.iter_mut().find(|e| e.question_type == question_type) {
                Some(existing) => existing.count = existing.count.saturating_add(count),
                None => entries.push(PlanEntry {
                    question_type,
                    count,
                }),
            }
        }

        let sum: u64 = entries.iter().map(|e| u64::from(e.count)).sum();
        if sum != u64::from(total) {
            return Err(Error::BadRequest(format!(
                "Sum of question type quantities ({}) must equal num_questions ({})",
                sum, total
            )));
        }

        Ok(Self { entries })
    }

    /// Even split across the selected types; earlier types absorb the remainder.
    pub fn from_selected(total: u32, selected: &[QuestionType]) -> Result<Self> {
        let mut types: Vec<QuestionType> = Vec::with_capacity(selected.len());
        for t in selected {
            if !types.contains(t) {
                types.push(*t);
            }
        }

        if types.is_empty() {
            return Err(Error::BadRequest(
                "At least one question type must be selected".to_string(),
            ));
        }
        if total == 0 {
            return Err(Error::BadRequest(
                "num_questions must be at least 1".to_string(),
            ));
        }

        let k = types.len() as u32;
        let base = total / k;
        let remainder = total % k;

        let entries = types
            .into_iter()
            .enumerate()
            .map(|(i, question_type)| PlanEntry {
                question_type,
                count: base + u32::from((i as u32) < remainder),
            })
            .filter(|e| e.count > 0)
            .collect();

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn types(&self) -> impl Iterator<Item = QuestionType> + '_ {
        self.entries.iter().map(|e| e.question_type)
    }

    pub fn total(&self) -> u32 {
        self.entries.iter().map(|e| e.count).sum()
    }

    pub fn total_len(&self) -> usize {
        self.total() as usize
    }

    pub fn is_mixed(&self) -> bool {
        self.entries.len() > 1
    }

    /// The only type of a single-type plan.
    pub fn single_type(&self) -> Option<QuestionType> {
        match self.entries.as_slice() {
            [only] => Some(only.question_type),
            _ => None,
        }
    }

    pub fn index_of(&self, question_type: QuestionType) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.question_type == question_type)
    }

    pub fn contains(&self, question_type: QuestionType) -> bool {
        self.index_of(question_type).is_some()
    }

    pub fn count_for(&self, question_type: QuestionType) -> u32 {
        self.entries
            .iter()
            .find(|e| e.question_type == question_type)
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Type expected at a zero-based output position; positions past the end cycle.
    pub fn type_at(&self, position: usize) -> QuestionType {
        let total = self.total_len().max(1);
        let mut offset = position % total;
        for entry in &self.entries {
            if offset < entry.count as usize {
                return entry.question_type;
            }
            offset -= entry.count as usize;
        }
        self.entries
            .first()
            .map(|e| e.question_type)
            .unwrap_or(QuestionType::MultipleChoice)
    }

    pub fn exercise_kind(&self) -> ExerciseKind {
        self.single_type()
            .map(ExerciseKind::from)
            .unwrap_or(ExerciseKind::Mixed)
    }
}

impl fmt::Display for TypeDistributionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}={}", e.question_type, e.count))
            .collect();
        f.write_str(&parts.join(", "))
    }
}
