use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use quiz_core::model::{FilterValues, Question, QuestionDraft, QuestionFilter};
use storage::repository::QuestionRepository;
use storage::seed;

use crate::error::CatalogError;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot sample from an empty question set")]
pub struct EmptyResultError;

/// Draw `min(n, len)` distinct questions in random order.
///
/// # Errors
///
/// Returns `EmptyResultError` when `questions` is empty.
pub fn sample(questions: Vec<Question>, n: usize) -> Result<Vec<Question>, EmptyResultError> {
    sample_with(questions, n, &mut rand::rng())
}

/// `sample` with a caller-supplied RNG, for reproducible draws.
///
/// # Errors
///
/// Returns `EmptyResultError` when `questions` is empty.
pub fn sample_with<R: Rng + ?Sized>(
    mut questions: Vec<Question>,
    n: usize,
    rng: &mut R,
) -> Result<Vec<Question>, EmptyResultError> {
    if questions.is_empty() {
        return Err(EmptyResultError);
    }
    questions.shuffle(rng);
    questions.truncate(n);
    Ok(questions)
}

/// Read and write access to the question catalog.
#[derive(Clone)]
pub struct CatalogService {
    questions: Arc<dyn QuestionRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self { questions }
    }

    /// Distinct subjects, categories and difficulties for selection controls.
    ///
    /// An empty catalog yields `FilterValues::fallback()`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the catalog cannot be read.
    pub async fn list_filter_values(&self) -> Result<FilterValues, CatalogError> {
        Ok(self.questions.filter_values().await?)
    }

    /// All questions matching `filter`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the catalog cannot be read.
    pub async fn query(&self, filter: &QuestionFilter) -> Result<Vec<Question>, CatalogError> {
        Ok(self.questions.query_questions(filter).await?)
    }

    /// Validate and insert a new question.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Validation` for a malformed draft, or
    /// `CatalogError::Storage` if the insert fails.
    pub async fn add(&self, draft: QuestionDraft) -> Result<Question, CatalogError> {
        let validated = draft.validate().inspect_err(|err| {
            tracing::warn!(error = %err, "rejected question");
        })?;
        let question = self.questions.insert_question(validated).await?;
        tracing::info!(
            question_id = %question.id(),
            subject = question.subject(),
            category = question.category(),
            "added question"
        );
        Ok(question)
    }

    /// Number of questions in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if the catalog cannot be read.
    pub async fn count(&self) -> Result<u64, CatalogError> {
        Ok(self.questions.count_questions().await?)
    }

    /// Insert `drafts` when the catalog is empty; returns how many were added.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Seed` if a draft is invalid or storage fails.
    pub async fn seed_if_empty(&self, drafts: Vec<QuestionDraft>) -> Result<usize, CatalogError> {
        Ok(seed::seed_if_empty(self.questions.as_ref(), drafts).await?)
    }
}
