use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use quiz_core::model::{
    Direction, QuestionFilter, QuestionId, QuizResult, QuizSession, SessionId, TimeRemaining,
    UserId,
};
use storage::repository::{QuestionRepository, ResultRepository};

use super::view::SessionView;
use crate::Clock;
use crate::catalog_service::sample;
use crate::error::QuizError;

/// Parameters for opening a quiz session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartRequest {
    pub filter: QuestionFilter,
    pub question_count: usize,
    /// `None` means no time limit.
    pub time_budget: Option<Duration>,
    pub user: Option<UserId>,
}

impl StartRequest {
    #[must_use]
    pub fn new(filter: QuestionFilter, question_count: usize) -> Self {
        Self {
            filter,
            question_count,
            time_budget: None,
            user: None,
        }
    }

    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: Option<UserId>) -> Self {
        self.user = user;
        self
    }
}

/// Orchestrates quiz sessions against the catalog and the result store.
///
/// Sessions are plain values owned by the caller; the engine holds no
/// per-session state.
#[derive(Clone)]
pub struct QuizEngine {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    results: Arc<dyn ResultRepository>,
}

impl QuizEngine {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        Self {
            clock,
            questions,
            results,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Query the catalog, sample the requested number of questions and open a session.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::InvalidQuestionCount` for a zero count,
    /// `QuizError::NoQuestionsAvailable` when nothing matches the filter, and
    /// `QuizError::Persistence` if the catalog cannot be read.
    pub async fn start(&self, request: StartRequest) -> Result<QuizSession, QuizError> {
        if request.question_count == 0 {
            tracing::warn!("rejected start with zero questions");
            return Err(QuizError::InvalidQuestionCount);
        }

        let candidates = self.questions.query_questions(&request.filter).await?;
        if candidates.is_empty() {
            tracing::warn!(filter = ?request.filter, "no questions match filter");
            return Err(QuizError::NoQuestionsAvailable);
        }
        let available = candidates.len();
        let picked = sample(candidates, request.question_count)?;
        tracing::debug!(
            available,
            requested = request.question_count,
            picked = picked.len(),
            "sampled questions"
        );

        let session = QuizSession::new(
            SessionId::generate(),
            request.user,
            request.filter,
            picked,
            request.time_budget,
            self.clock.now(),
        )?;
        tracing::info!(
            session_id = %session.id(),
            questions = session.questions().len(),
            timed = session.time_budget().is_some(),
            "started quiz session"
        );
        Ok(session)
    }

    /// Select an answer for a question of the session.
    ///
    /// Returns `true` if the stored answer changed.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SessionClosed`, `QuizError::UnknownQuestion` or
    /// `QuizError::InvalidChoice`.
    pub fn record_answer(
        &self,
        session: &mut QuizSession,
        question_id: QuestionId,
        choice: &str,
    ) -> Result<bool, QuizError> {
        session
            .record_answer(question_id, choice)
            .inspect_err(|err| {
                tracing::warn!(session_id = %session.id(), error = %err, "answer rejected");
            })
            .map_err(QuizError::from)
    }

    /// Drop every answer recorded so far.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SessionClosed` once the session is closed.
    pub fn clear_answers(&self, session: &mut QuizSession) -> Result<(), QuizError> {
        session.clear_answers()?;
        tracing::debug!(session_id = %session.id(), "cleared answers");
        Ok(())
    }

    /// Move the cursor; returns the new position.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SessionClosed` once the session is closed.
    pub fn advance(
        &self,
        session: &mut QuizSession,
        direction: Direction,
    ) -> Result<usize, QuizError> {
        Ok(session.advance(direction)?)
    }

    #[must_use]
    pub fn time_remaining(&self, session: &QuizSession) -> TimeRemaining {
        session.time_remaining(self.clock.now())
    }

    #[must_use]
    pub fn snapshot(&self, session: &QuizSession) -> SessionView {
        SessionView::from_session(session, self.clock.now())
    }

    /// Submit on the learner's request.
    ///
    /// # Errors
    ///
    /// See [`QuizEngine::submit_at`].
    pub async fn submit(&self, session: &mut QuizSession) -> Result<QuizResult, QuizError> {
        self.submit_at(session, self.clock.now(), false).await
    }

    /// Grade the session at `now`, store the result, then close the session.
    ///
    /// The session only leaves `InProgress` after the store accepted the
    /// result, so a failed write can be retried with the same session.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::SessionClosed` if the session was already closed
    /// and `QuizError::Persistence` if the result could not be stored.
    pub async fn submit_at(
        &self,
        session: &mut QuizSession,
        now: DateTime<Utc>,
        forced_by_timeout: bool,
    ) -> Result<QuizResult, QuizError> {
        let pending = session.grade(now, forced_by_timeout).inspect_err(|err| {
            tracing::warn!(session_id = %session.id(), error = %err, "submit rejected");
        })?;

        let stored = self
            .results
            .append_result(&pending)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    session_id = %session.id(),
                    error = %err,
                    "failed to store result, session left open"
                );
            })?;

        session.finish(&pending)?;
        tracing::info!(
            session_id = %session.id(),
            result_id = %stored.id(),
            score = stored.score(),
            total = stored.total(),
            percentage = stored.percentage(),
            outcome = stored.outcome().as_str(),
            "quiz session closed"
        );
        Ok(stored)
    }

    /// Auto-submit once the time budget is spent.
    ///
    /// Returns `None` while time remains, for untimed sessions, and for
    /// sessions that are already closed.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Persistence` if the forced result could not be stored.
    pub async fn enforce_deadline(
        &self,
        session: &mut QuizSession,
    ) -> Result<Option<QuizResult>, QuizError> {
        self.enforce_deadline_at(session, self.clock.now()).await
    }

    /// [`QuizEngine::enforce_deadline`] evaluated at `now`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Persistence` if the forced result could not be stored.
    pub async fn enforce_deadline_at(
        &self,
        session: &mut QuizSession,
        now: DateTime<Utc>,
    ) -> Result<Option<QuizResult>, QuizError> {
        if session.is_closed() || !session.is_time_up(now) {
            return Ok(None);
        }
        tracing::warn!(session_id = %session.id(), "time budget exhausted, submitting");
        self.submit_at(session, now, true).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Difficulty, QuestionDraft, SessionStatus};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    async fn engine_with(questions: &[(&str, &str)]) -> QuizEngine {
        let repo = InMemoryRepository::new();
        for (subject, answer) in questions {
            let draft = QuestionDraft::new(
                *subject,
                "General",
                Difficulty::Medium,
                format!("{subject}?"),
                ["A", "B", "C"],
                *answer,
            );
            repo.insert_question(draft.validate().unwrap()).await.unwrap();
        }
        QuizEngine::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo))
    }

    #[tokio::test]
    async fn zero_question_count_is_rejected() {
        let engine = engine_with(&[("Science", "A")]).await;
        let err = engine
            .start(StartRequest::new(QuestionFilter::any(), 0))
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::InvalidQuestionCount));
    }

    #[tokio::test]
    async fn start_caps_count_at_available_questions() {
        let engine = engine_with(&[("Science", "A"), ("Science", "B"), ("Anime", "C")]).await;
        let session = engine
            .start(StartRequest::new(
                QuestionFilter::any().with_subject("Science"),
                7,
            ))
            .await
            .unwrap();
        assert_eq!(session.questions().len(), 2);
        assert_eq!(session.cursor(), 0);
        assert_eq!(session.started_at(), fixed_now());
        assert_eq!(session.status(), SessionStatus::InProgress);
        assert!(session.questions().iter().all(|q| q.subject() == "Science"));
    }

    #[tokio::test]
    async fn deadline_is_ignored_while_time_remains() {
        let engine = engine_with(&[("Science", "A")]).await;
        let mut session = engine
            .start(
                StartRequest::new(QuestionFilter::any(), 1).with_time_budget(Duration::minutes(1)),
            )
            .await
            .unwrap();

        let later = fixed_now() + Duration::seconds(59);
        assert!(
            engine
                .enforce_deadline_at(&mut session, later)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(session.status(), SessionStatus::InProgress);
    }

    #[tokio::test]
    async fn untimed_session_never_expires() {
        let engine = engine_with(&[("Science", "A")]).await;
        let mut session = engine
            .start(StartRequest::new(QuestionFilter::any(), 1))
            .await
            .unwrap();
        assert_eq!(engine.time_remaining(&session), TimeRemaining::Unlimited);

        let much_later = fixed_now() + Duration::days(30);
        assert!(
            engine
                .enforce_deadline_at(&mut session, much_later)
                .await
                .unwrap()
                .is_none()
        );
    }
}
