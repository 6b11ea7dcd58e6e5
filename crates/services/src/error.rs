//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{QuestionError, QuestionId, SessionError, SessionStatus};
use storage::repository::StorageError;
use storage::seed::SeedError;
use storage::sqlite::SqliteInitError;

use crate::catalog_service::EmptyResultError;

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] QuestionError),
    #[error(transparent)]
    EmptyResult(#[from] EmptyResultError),
    #[error(transparent)]
    Seed(#[from] SeedError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizEngine`.
///
/// Every variant is recoverable: the caller re-prompts, or retries `submit`
/// after a `Persistence` failure since the session stays open.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions match the selected filters")]
    NoQuestionsAvailable,
    #[error("question count must be at least 1")]
    InvalidQuestionCount,
    #[error(transparent)]
    EmptyResult(#[from] EmptyResultError),
    #[error("{choice:?} is not a choice of question {question_id}")]
    InvalidChoice {
        question_id: QuestionId,
        choice: String,
    },
    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),
    #[error("session is already {status}")]
    SessionClosed { status: SessionStatus },
    #[error(transparent)]
    Session(SessionError),
    #[error("persistence failed: {0}")]
    Persistence(#[from] StorageError),
}

impl From<SessionError> for QuizError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Closed { status } => QuizError::SessionClosed { status },
            SessionError::InvalidChoice {
                question_id,
                choice,
            } => QuizError::InvalidChoice {
                question_id,
                choice,
            },
            SessionError::UnknownQuestion(id) => QuizError::UnknownQuestion(id),
            SessionError::NoQuestions => QuizError::NoQuestionsAvailable,
            other => QuizError::Session(other),
        }
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
