use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{QuestionFilter, QuizResult, ResultId, SessionId, SessionOutcome, UserId};
use storage::repository::{ResultRepository, StorageError};

/// One ranked row of the leaderboard.
///
/// Carries raw values only; formatting is left to the front end.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    /// 1-based rank in the returned list.
    pub rank: usize,
    pub result_id: ResultId,
    pub user: Option<UserId>,
    pub filter: QuestionFilter,
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub elapsed_secs: f64,
    pub completed_at: DateTime<Utc>,
    pub outcome: SessionOutcome,
}

impl LeaderboardEntry {
    #[must_use]
    pub fn from_result(rank: usize, result: &QuizResult) -> Self {
        Self {
            rank,
            result_id: result.id(),
            user: result.user().cloned(),
            filter: result.filter().clone(),
            score: result.score(),
            total: result.total(),
            percentage: result.percentage(),
            elapsed_secs: result.elapsed_secs(),
            completed_at: result.completed_at(),
            outcome: result.outcome(),
        }
    }
}

/// Read-only queries over stored quiz results.
#[derive(Clone)]
pub struct LeaderboardService {
    results: Arc<dyn ResultRepository>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        Self { results }
    }

    /// Best results first, ranked from 1.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if results cannot be read.
    pub async fn top(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let rows = self.results.top_results(limit).await?;
        Ok(rows
            .iter()
            .enumerate()
            .map(|(idx, result)| LeaderboardEntry::from_result(idx + 1, result))
            .collect())
    }

    /// A user's results, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if results cannot be read.
    pub async fn history(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        self.results.list_results_for_user(user, limit).await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if results cannot be read.
    pub async fn result_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<QuizResult>, StorageError> {
        self.results.get_result_for_session(session_id).await
    }
}
