use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::question::{Difficulty, Question};

/// Selection filters for a quiz. `None` means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionFilter {
    pub subject: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
}

impl QuestionFilter {
    /// A filter that matches the entire catalog.
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = normalize(subject.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = normalize(category.into());
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    /// Exact-match test; a missing filter is a wildcard.
    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        self.subject
            .as_deref()
            .is_none_or(|s| s == question.subject())
            && self
                .category
                .as_deref()
                .is_none_or(|c| c == question.category())
            && self
                .difficulty
                .is_none_or(|d| d == question.difficulty())
    }
}

fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Distinct values present in the catalog, used to populate selection controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterValues {
    pub subjects: Vec<String>,
    pub categories: Vec<String>,
    pub difficulties: Vec<Difficulty>,
}

impl FilterValues {
    /// Values offered when the catalog is empty.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            subjects: vec!["General".to_string()],
            categories: vec!["General".to_string()],
            difficulties: Difficulty::ALL.to_vec(),
        }
    }

    /// Collect sorted distinct values from a set of questions.
    ///
    /// Each list independently falls back when it would be empty.
    #[must_use]
    pub fn from_questions<'a>(questions: impl IntoIterator<Item = &'a Question>) -> Self {
        let mut subjects = BTreeSet::new();
        let mut categories = BTreeSet::new();
        let mut difficulties = BTreeSet::new();
        for q in questions {
            subjects.insert(q.subject().to_string());
            categories.insert(q.category().to_string());
            difficulties.insert(q.difficulty());
        }
        Self::from_parts(
            subjects.into_iter().collect(),
            categories.into_iter().collect(),
            difficulties.into_iter().collect(),
        )
    }

    #[must_use]
    pub fn from_parts(
        subjects: Vec<String>,
        categories: Vec<String>,
        difficulties: Vec<Difficulty>,
    ) -> Self {
        let fallback = Self::fallback();
        Self {
            subjects: if subjects.is_empty() {
                fallback.subjects
            } else {
                subjects
            },
            categories: if categories.is_empty() {
                fallback.categories
            } else {
                categories
            },
            difficulties: if difficulties.is_empty() {
                fallback.difficulties
            } else {
                difficulties
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionDraft, QuestionId};

    fn question(id: u64, subject: &str, category: &str, difficulty: Difficulty) -> Question {
        QuestionDraft::new(subject, category, difficulty, "Q?", ["A", "B"], "A")
            .validate()
            .unwrap()
            .assign_id(QuestionId::new(id))
    }

    #[test]
    fn empty_filter_matches_everything() {
        let q = question(1, "Mathematics", "Algebra", Difficulty::Easy);
        assert!(QuestionFilter::any().matches(&q));
    }

    #[test]
    fn filters_combine_with_and() {
        let q = question(1, "Mathematics", "Algebra", Difficulty::Medium);
        let f = QuestionFilter::any()
            .with_subject("Mathematics")
            .with_difficulty(Difficulty::Medium);
        assert!(f.matches(&q));
        assert!(!f.clone().with_category("Geometry").matches(&q));
        assert!(!QuestionFilter::any().with_subject("mathematics").matches(&q));
    }

    #[test]
    fn blank_filter_value_is_a_wildcard() {
        let f = QuestionFilter::any().with_subject("  ");
        assert_eq!(f.subject, None);
    }

    #[test]
    fn filter_values_are_sorted_and_distinct() {
        let qs = [
            question(1, "Science", "Physics", Difficulty::Hard),
            question(2, "Anime", "Trivia", Difficulty::Easy),
            question(3, "Science", "Biology", Difficulty::Easy),
        ];
        let values = FilterValues::from_questions(&qs);
        assert_eq!(values.subjects, ["Anime", "Science"]);
        assert_eq!(values.categories, ["Biology", "Physics", "Trivia"]);
        assert_eq!(values.difficulties, [Difficulty::Easy, Difficulty::Hard]);
    }

    #[test]
    fn empty_catalog_uses_fallback() {
        let values = FilterValues::from_questions(std::iter::empty());
        assert_eq!(values, FilterValues::fallback());
    }
}
