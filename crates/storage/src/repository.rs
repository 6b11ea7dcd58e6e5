use async_trait::async_trait;
use quiz_core::model::{
    FilterValues, PendingResult, Question, QuestionFilter, QuestionId, QuizResult, ResultId,
    SessionId, UserId, ValidatedQuestion,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the question catalog.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert a validated question and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_question(&self, question: ValidatedQuestion) -> Result<Question, StorageError>;

    /// All questions matching `filter`, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn query_questions(&self, filter: &QuestionFilter)
    -> Result<Vec<Question>, StorageError>;

    /// Distinct subjects, categories and difficulties, with the empty-catalog fallback.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn filter_values(&self) -> Result<FilterValues, StorageError>;

    /// Number of questions in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the catalog cannot be read.
    async fn count_questions(&self) -> Result<u64, StorageError>;
}

/// Append-only result store keyed by session id.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Store a result for its session.
    ///
    /// Appending twice for the same session stores nothing new and returns
    /// the row written first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn append_result(&self, result: &PendingResult) -> Result<QuizResult, StorageError>;

    /// Fetch the result recorded for a session, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn get_result_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<QuizResult>, StorageError>;

    /// Best results first: percentage desc, score desc, earliest completion first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn top_results(&self, limit: u32) -> Result<Vec<QuizResult>, StorageError>;

    /// A user's results, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_results_for_user(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError>;
}

/// Leaderboard ordering shared by the adapters.
#[must_use]
pub fn leaderboard_order(a: &QuizResult, b: &QuizResult) -> Ordering {
    b.percentage()
        .total_cmp(&a.percentage())
        .then_with(|| b.score().cmp(&a.score()))
        .then_with(|| a.completed_at().cmp(&b.completed_at()))
        .then_with(|| a.id().cmp(&b.id()))
}

#[derive(Default)]
struct QuestionTable {
    next_id: u64,
    rows: BTreeMap<QuestionId, Question>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<QuestionTable>>,
    results: Arc<Mutex<Vec<QuizResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_question(&self, question: ValidatedQuestion) -> Result<Question, StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.next_id += 1;
        let question = question.assign_id(QuestionId::new(guard.next_id));
        guard.rows.insert(question.id(), question.clone());
        Ok(question)
    }

    async fn query_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .rows
            .values()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect())
    }

    async fn filter_values(&self) -> Result<FilterValues, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(FilterValues::from_questions(guard.rows.values()))
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.rows.len() as u64)
    }
}

#[async_trait]
impl ResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &PendingResult) -> Result<QuizResult, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if let Some(existing) = guard
            .iter()
            .find(|r| r.session_id() == result.session_id())
        {
            tracing::debug!(session_id = %result.session_id(), "result already stored");
            return Ok(existing.clone());
        }
        let id = ResultId::new(guard.len() as u64 + 1);
        let stored = result.clone().assign_id(id);
        guard.push(stored.clone());
        Ok(stored)
    }

    async fn get_result_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<QuizResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.iter().find(|r| r.session_id() == session_id).cloned())
    }

    async fn top_results(&self, limit: u32) -> Result<Vec<QuizResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out = guard.clone();
        out.sort_by(leaderboard_order);
        out.truncate(limit as usize);
        Ok(out)
    }

    async fn list_results_for_user(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<QuizResult> = guard
            .iter()
            .filter(|r| r.user() == Some(user))
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.completed_at()
                .cmp(&a.completed_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        out.truncate(limit as usize);
        Ok(out)
    }
}

/// Aggregates catalog and result repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn ResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ResultRepository> = Arc::new(repo);
        Self { questions, results }
    }
}
