use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::filter::QuestionFilter;
use crate::model::ids::{ResultId, SessionId, UserId};
use crate::model::session::SessionOutcome;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("a result needs at least one question")]
    NoQuestions,

    #[error("score ({score}) exceeds total ({total})")]
    ScoreOutOfRange { score: u32, total: u32 },

    #[error("elapsed time cannot be negative")]
    NegativeElapsed,
}

/// Percentage of correct answers rounded to two decimals, ties to even.
///
/// Returns `0.0` for an empty set.
#[must_use]
pub fn percentage(score: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = f64::from(score) / f64::from(total) * 100.0;
    (raw * 100.0).round_ties_even() / 100.0
}

//
// ─── PENDING RESULT ────────────────────────────────────────────────────────────
//

/// Scored outcome of a session that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingResult {
    session_id: SessionId,
    user: Option<UserId>,
    filter: QuestionFilter,
    score: u32,
    total: u32,
    elapsed: Duration,
    completed_at: DateTime<Utc>,
    outcome: SessionOutcome,
}

impl PendingResult {
    /// Build a pending result, checking the score invariants.
    ///
    /// # Errors
    ///
    /// Returns `ResultError` if `total` is zero, `score > total`, or `elapsed`
    /// is negative.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: SessionId,
        user: Option<UserId>,
        filter: QuestionFilter,
        score: u32,
        total: u32,
        elapsed: Duration,
        completed_at: DateTime<Utc>,
        outcome: SessionOutcome,
    ) -> Result<Self, ResultError> {
        if total == 0 {
            return Err(ResultError::NoQuestions);
        }
        if score > total {
            return Err(ResultError::ScoreOutOfRange { score, total });
        }
        if elapsed < Duration::zero() {
            return Err(ResultError::NegativeElapsed);
        }
        Ok(Self {
            session_id,
            user,
            filter,
            score,
            total,
            elapsed,
            completed_at,
            outcome,
        })
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserId> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn filter(&self) -> &QuestionFilter {
        &self.filter
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.total)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn outcome(&self) -> SessionOutcome {
        self.outcome
    }

    #[must_use]
    pub fn assign_id(self, id: ResultId) -> QuizResult {
        QuizResult { id, inner: self }
    }
}

//
// ─── QUIZ RESULT ───────────────────────────────────────────────────────────────
//

/// Stored, immutable result of one completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizResult {
    id: ResultId,
    inner: PendingResult,
}

impl QuizResult {
    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ResultError` if the stored values break the score invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: ResultId,
        session_id: SessionId,
        user: Option<UserId>,
        filter: QuestionFilter,
        score: u32,
        total: u32,
        elapsed: Duration,
        completed_at: DateTime<Utc>,
        outcome: SessionOutcome,
    ) -> Result<Self, ResultError> {
        PendingResult::new(
            session_id,
            user,
            filter,
            score,
            total,
            elapsed,
            completed_at,
            outcome,
        )
        .map(|pending| pending.assign_id(id))
    }

    #[must_use]
    pub fn id(&self) -> ResultId {
        self.id
    }

    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.inner.session_id
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserId> {
        self.inner.user.as_ref()
    }

    #[must_use]
    pub fn filter(&self) -> &QuestionFilter {
        &self.inner.filter
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.inner.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.inner.total
    }

    #[must_use]
    pub fn percentage(&self) -> f64 {
        self.inner.percentage()
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.inner.elapsed
    }

    /// Elapsed time in fractional seconds (millisecond precision).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_secs(&self) -> f64 {
        self.inner.elapsed.num_milliseconds() as f64 / 1000.0
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.inner.completed_at
    }

    #[must_use]
    pub fn outcome(&self) -> SessionOutcome {
        self.inner.outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn pending(score: u32, total: u32) -> Result<PendingResult, ResultError> {
        PendingResult::new(
            SessionId::generate(),
            None,
            QuestionFilter::any(),
            score,
            total,
            Duration::seconds(42),
            fixed_now(),
            SessionOutcome::Submitted,
        )
    }

    #[test]
    fn percentage_rounds_to_two_decimals() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 3), 66.67);
        assert_eq!(percentage(7, 7), 100.0);
        assert_eq!(percentage(0, 5), 0.0);
        assert_eq!(percentage(0, 0), 0.0);
    }

    #[test]
    fn percentage_rounds_exact_ties_to_even() {
        assert_eq!(percentage(1, 32), 3.12);
        assert_eq!(percentage(5, 32), 15.62);
        assert_eq!(percentage(3, 32), 9.38);
        assert_eq!(percentage(1, 8), 12.5);
    }

    #[test]
    fn score_cannot_exceed_total() {
        assert_eq!(
            pending(4, 3).unwrap_err(),
            ResultError::ScoreOutOfRange { score: 4, total: 3 }
        );
        assert_eq!(pending(0, 0).unwrap_err(), ResultError::NoQuestions);
    }

    #[test]
    fn assign_id_keeps_fields() {
        let result = pending(2, 4).unwrap().assign_id(ResultId::new(9));
        assert_eq!(result.id(), ResultId::new(9));
        assert_eq!(result.score(), 2);
        assert_eq!(result.total(), 4);
        assert_eq!(result.percentage(), 50.0);
        assert_eq!(result.elapsed_secs(), 42.0);
    }
}
