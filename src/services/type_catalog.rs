use crate::models::question::{normalize_tag, QuestionType, QuestionTypeRecord};

/// Request-local registry of question types.
///
/// Starts from the four built-in types; tags the model invents get the next free id
/// for the lifetime of one response.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    records: Vec<QuestionTypeRecord>,
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl TypeCatalog {
    pub fn with_defaults() -> Self {
        let records = QuestionType::ALL
            .iter()
            .enumerate()
            .map(|(i, t)| QuestionTypeRecord {
                id: i as i64 + 1,
                type_name: t.type_name().to_string(),
                icon: Some(icon_for(*t).to_string()),
                description: Some(description_for(*t).to_string()),
                is_multiple_choice: t.is_choice_based(),
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[QuestionTypeRecord] {
        &self.records
    }

    pub fn id_for(&self, question_type: QuestionType) -> i64 {
        self.find(question_type.type_name())
            .map(|r| r.id)
            .unwrap_or_else(|| {
                QuestionType::ALL
                    .iter()
                    .position(|t| *t == question_type)
                    .map(|p| p as i64 + 1)
                    .unwrap_or(1)
            })
    }

    /// Resolve a free-form tag to a type id, registering it when unknown.
    pub fn resolve_tag(&mut self, tag: &str) -> i64 {
        if let Some(record) = self.find(tag) {
            return record.id;
        }

        let id = self.records.len() as i64 + 1;
        tracing::info!("Registering unknown question type '{}' as id {}", tag.trim(), id);
        self.records.push(QuestionTypeRecord {
            id,
            type_name: tag.trim().to_string(),
            icon: None,
            description: None,
            is_multiple_choice: false,
        });
        id
    }

    /// `1: multiple choice; 2: true false; ...` for the prompt.
    pub fn prompt_listing(&self) -> String {
        self.records
            .iter()
            .map(|r| format!("{}: {}", r.id, r.type_name))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn find(&self, tag: &str) -> Option<&QuestionTypeRecord> {
        let wanted = normalize_tag(tag);
        self.records
            .iter()
            .find(|r| normalize_tag(&r.type_name) == wanted)
    }
}

fn icon_for(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::MultipleChoice => "🔢",
        QuestionType::TrueFalse => "✅",
        QuestionType::MultipleSelect => "📝",
        QuestionType::OpenEnded => "❓",
    }
}

fn description_for(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::MultipleChoice => "Multiple choice with a single correct answer",
        QuestionType::TrueFalse => "True or false statement",
        QuestionType::MultipleSelect => "Multiple choice with several correct answers",
        QuestionType::OpenEnded => "Open-ended written response",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_builtin_types() {
        let catalog = TypeCatalog::with_defaults();
        assert_eq!(catalog.records().len(), 4);
        assert_eq!(catalog.id_for(QuestionType::MultipleChoice), 1);
        assert_eq!(catalog.id_for(QuestionType::OpenEnded), 4);
        assert!(!catalog.records()[3].is_multiple_choice);
    }

    #[test]
    fn tags_resolve_regardless_of_spelling() {
        let mut catalog = TypeCatalog::with_defaults();
        assert_eq!(catalog.resolve_tag("true_false"), 2);
        assert_eq!(catalog.resolve_tag("Multiple Select"), 3);
        assert_eq!(catalog.records().len(), 4);
    }

    #[test]
    fn unknown_tags_get_fresh_ids_once() {
        let mut catalog = TypeCatalog::with_defaults();
        assert_eq!(catalog.resolve_tag("matching"), 5);
        assert_eq!(catalog.resolve_tag("Matching"), 5);
        assert_eq!(catalog.resolve_tag("essay"), 6);
    }

    #[test]
    fn listing_names_every_type() {
        let listing = TypeCatalog::with_defaults().prompt_listing();
        assert_eq!(
            listing,
            "1: multiple choice; 2: true false; 3: multiple select; 4: open ended"
        );
    }
}
