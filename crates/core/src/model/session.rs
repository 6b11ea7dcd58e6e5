use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

use crate::model::filter::QuestionFilter;
use crate::model::ids::{QuestionId, SessionId, UserId};
use crate::model::question::Question;
use crate::model::result::{PendingResult, ResultError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("session is {status}, no further changes are accepted")]
    Closed { status: SessionStatus },

    #[error("{choice:?} is not a choice of question {question_id}")]
    InvalidChoice {
        question_id: QuestionId,
        choice: String,
    },

    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),

    #[error("a session needs at least one question")]
    NoQuestions,

    #[error("too many questions for a single session: {len}")]
    TooManyQuestions { len: usize },

    #[error("time budget must be positive")]
    InvalidTimeBudget,

    #[error("result belongs to another session")]
    ForeignResult,

    #[error(transparent)]
    Result(#[from] ResultError),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle state of a session. Both closed states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    InProgress,
    Submitted,
    Expired,
}

impl SessionStatus {
    #[must_use]
    pub fn is_closed(self) -> bool {
        !matches!(self, SessionStatus::InProgress)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Submitted => "submitted",
            SessionStatus::Expired => "expired",
        })
    }
}

/// How a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionOutcome {
    /// The learner submitted.
    Submitted,
    /// The time budget ran out.
    Expired,
}

impl SessionOutcome {
    #[must_use]
    pub fn from_timeout(forced_by_timeout: bool) -> Self {
        if forced_by_timeout {
            SessionOutcome::Expired
        } else {
            SessionOutcome::Submitted
        }
    }

    #[must_use]
    pub fn status(self) -> SessionStatus {
        match self {
            SessionOutcome::Submitted => SessionStatus::Submitted,
            SessionOutcome::Expired => SessionStatus::Expired,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionOutcome::Submitted => "submitted",
            SessionOutcome::Expired => "expired",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "submitted" => Some(SessionOutcome::Submitted),
            "expired" => Some(SessionOutcome::Expired),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Remaining time on a session clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRemaining {
    Unlimited,
    Limited(Duration),
}

impl TimeRemaining {
    #[must_use]
    pub fn is_exhausted(self) -> bool {
        match self {
            TimeRemaining::Unlimited => false,
            TimeRemaining::Limited(left) => left <= Duration::zero(),
        }
    }
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub cursor: usize,
    pub status: SessionStatus,
}

/// Per-question breakdown shown after a session closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub chosen: Option<String>,
    pub correct: String,
    pub is_correct: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One learner's attempt at a fixed, pre-sampled list of questions.
///
/// The caller owns the value and hands it to every operation. Once the status
/// leaves `InProgress` the question list and answers never change again.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSession {
    id: SessionId,
    user: Option<UserId>,
    filter: QuestionFilter,
    questions: Vec<Question>,
    time_budget: Option<Duration>,
    started_at: DateTime<Utc>,
    answers: HashMap<QuestionId, String>,
    cursor: usize,
    status: SessionStatus,
}

impl QuizSession {
    /// Open a session over `questions` in the given order.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoQuestions` for an empty list,
    /// `SessionError::DuplicateQuestion` if an id repeats, and
    /// `SessionError::InvalidTimeBudget` for a zero or negative budget.
    pub fn new(
        id: SessionId,
        user: Option<UserId>,
        filter: QuestionFilter,
        questions: Vec<Question>,
        time_budget: Option<Duration>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        if u32::try_from(questions.len()).is_err() {
            return Err(SessionError::TooManyQuestions {
                len: questions.len(),
            });
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for q in &questions {
            if !seen.insert(q.id()) {
                return Err(SessionError::DuplicateQuestion(q.id()));
            }
        }
        if time_budget.is_some_and(|b| b <= Duration::zero()) {
            return Err(SessionError::InvalidTimeBudget);
        }

        Ok(Self {
            id,
            user,
            filter,
            questions,
            time_budget,
            started_at,
            answers: HashMap::new(),
            cursor: 0,
            status: SessionStatus::InProgress,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
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
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        // cursor is clamped to a non-empty list
        &self.questions[self.cursor]
    }

    #[must_use]
    pub fn answer_for(&self, question_id: QuestionId) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.answers.len(),
            cursor: self.cursor,
            status: self.status,
        }
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.status.is_closed() {
            return Err(SessionError::Closed {
                status: self.status,
            });
        }
        Ok(())
    }

    fn question(&self, question_id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == question_id)
    }

    /// Select `choice` for a question, replacing any earlier selection.
    ///
    /// Returns `true` if the stored answer changed. The cursor does not move.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after submit/expiry,
    /// `SessionError::UnknownQuestion` for a question outside the session, and
    /// `SessionError::InvalidChoice` if `choice` is not listed.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        choice: &str,
    ) -> Result<bool, SessionError> {
        self.ensure_open()?;
        let question = self
            .question(question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;
        if !question.has_choice(choice) {
            return Err(SessionError::InvalidChoice {
                question_id,
                choice: choice.to_string(),
            });
        }
        if self.answer_for(question_id) == Some(choice) {
            return Ok(false);
        }
        self.answers.insert(question_id, choice.to_string());
        Ok(true)
    }

    /// Drop every selection made so far.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after submit/expiry.
    pub fn clear_answers(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.answers.clear();
        Ok(())
    }

    /// Move the cursor one step, clamped to the question list.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` after submit/expiry.
    pub fn advance(&mut self, direction: Direction) -> Result<usize, SessionError> {
        self.ensure_open()?;
        let last = self.questions.len() - 1;
        self.cursor = match direction {
            Direction::Next => (self.cursor + 1).min(last),
            Direction::Previous => self.cursor.saturating_sub(1),
        };
        Ok(self.cursor)
    }

    #[must_use]
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.started_at).max(Duration::zero())
    }

    /// Time left on the budget at `now`, never negative.
    #[must_use]
    pub fn time_remaining(&self, now: DateTime<Utc>) -> TimeRemaining {
        match self.time_budget {
            None => TimeRemaining::Unlimited,
            Some(budget) => {
                TimeRemaining::Limited((budget - self.elapsed(now)).max(Duration::zero()))
            }
        }
    }

    #[must_use]
    pub fn is_time_up(&self, now: DateTime<Utc>) -> bool {
        self.time_remaining(now).is_exhausted()
    }

    /// Score the session as it stands without closing it.
    ///
    /// Unanswered questions count as wrong.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session was already closed.
    pub fn grade(
        &self,
        now: DateTime<Utc>,
        forced_by_timeout: bool,
    ) -> Result<PendingResult, SessionError> {
        self.ensure_open()?;
        let total = u32::try_from(self.questions.len()).map_err(|_| {
            SessionError::TooManyQuestions {
                len: self.questions.len(),
            }
        })?;
        let mut score = 0_u32;
        for question in &self.questions {
            if self
                .answer_for(question.id())
                .is_some_and(|choice| question.is_correct(choice))
            {
                score += 1;
            }
        }

        Ok(PendingResult::new(
            self.id,
            self.user.clone(),
            self.filter.clone(),
            score,
            total,
            self.elapsed(now),
            now,
            SessionOutcome::from_timeout(forced_by_timeout),
        )?)
    }

    /// Close the session with a result produced by `grade`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if already closed and
    /// `SessionError::ForeignResult` if the result was graded for another session.
    pub fn finish(&mut self, result: &PendingResult) -> Result<(), SessionError> {
        self.ensure_open()?;
        if result.session_id() != self.id {
            return Err(SessionError::ForeignResult);
        }
        self.status = result.outcome().status();
        Ok(())
    }

    /// Grade and close in one step. A second call fails with `Closed`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session was already closed.
    pub fn submit(
        &mut self,
        now: DateTime<Utc>,
        forced_by_timeout: bool,
    ) -> Result<PendingResult, SessionError> {
        let result = self.grade(now, forced_by_timeout)?;
        self.finish(&result)?;
        Ok(result)
    }

    /// Per-question breakdown in session order.
    #[must_use]
    pub fn review(&self) -> Vec<QuestionOutcome> {
        self.questions
            .iter()
            .map(|q| {
                let chosen = self.answer_for(q.id()).map(ToString::to_string);
                let is_correct = chosen.as_deref().is_some_and(|c| q.is_correct(c));
                QuestionOutcome {
                    question_id: q.id(),
                    chosen,
                    correct: q.answer().to_string(),
                    is_correct,
                }
            })
            .collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Difficulty, QuestionDraft, percentage};
    use crate::time::fixed_now;

    fn question(id: u64, answer: &str) -> Question {
        QuestionDraft::new(
            "General Knowledge",
            "History",
            Difficulty::Easy,
            format!("Question {id}"),
            ["A", "B", "C", "D"],
            answer,
        )
        .validate()
        .unwrap()
        .assign_id(QuestionId::new(id))
    }

    fn session(questions: Vec<Question>, budget: Option<Duration>) -> QuizSession {
        QuizSession::new(
            SessionId::generate(),
            None,
            QuestionFilter::any(),
            questions,
            budget,
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn correct_single_answer_scores_full_marks() {
        let mut s = session(vec![question(1, "B")], None);
        s.record_answer(QuestionId::new(1), "B").unwrap();
        let result = s.submit(fixed_now() + Duration::seconds(30), false).unwrap();

        assert_eq!(result.score(), 1);
        assert_eq!(result.total(), 1);
        assert_eq!(result.percentage(), 100.0);
        assert_eq!(result.elapsed(), Duration::seconds(30));
        assert_eq!(s.status(), SessionStatus::Submitted);
    }

    #[test]
    fn wrong_single_answer_scores_zero() {
        let mut s = session(vec![question(1, "B")], None);
        s.record_answer(QuestionId::new(1), "C").unwrap();
        let result = s.submit(fixed_now(), false).unwrap();
        assert_eq!(result.score(), 0);
        assert_eq!(result.percentage(), 0.0);
    }

    #[test]
    fn unanswered_questions_count_as_wrong() {
        let mut s = session(vec![question(1, "A"), question(2, "B"), question(3, "C")], None);
        s.record_answer(QuestionId::new(2), "B").unwrap();
        let result = s.submit(fixed_now(), false).unwrap();
        assert_eq!(result.score(), 1);
        assert_eq!(result.total(), 3);
        assert_eq!(result.percentage(), percentage(1, 3));

        let review = s.review();
        assert_eq!(review[0].chosen, None);
        assert!(!review[0].is_correct);
        assert!(review[1].is_correct);
    }

    #[test]
    fn second_submit_is_rejected() {
        let mut s = session(vec![question(1, "A")], None);
        s.submit(fixed_now(), false).unwrap();
        let err = s.submit(fixed_now(), false).unwrap_err();
        assert_eq!(
            err,
            SessionError::Closed {
                status: SessionStatus::Submitted
            }
        );
    }

    #[test]
    fn forced_submit_expires_session() {
        let mut s = session(vec![question(1, "A")], Some(Duration::seconds(60)));
        let result = s.submit(fixed_now() + Duration::seconds(61), true).unwrap();
        assert_eq!(result.outcome(), SessionOutcome::Expired);
        assert_eq!(s.status(), SessionStatus::Expired);
        assert!(matches!(
            s.record_answer(QuestionId::new(1), "A"),
            Err(SessionError::Closed { .. })
        ));
        assert!(matches!(
            s.advance(Direction::Next),
            Err(SessionError::Closed { .. })
        ));
        assert!(matches!(s.clear_answers(), Err(SessionError::Closed { .. })));
    }

    #[test]
    fn grade_does_not_close() {
        let mut s = session(vec![question(1, "A")], None);
        s.record_answer(QuestionId::new(1), "A").unwrap();
        let graded = s.grade(fixed_now(), false).unwrap();
        assert_eq!(graded.score(), 1);
        assert_eq!(s.status(), SessionStatus::InProgress);
        s.finish(&graded).unwrap();
        assert!(s.is_closed());
    }

    #[test]
    fn finish_rejects_result_from_other_session() {
        let mut a = session(vec![question(1, "A")], None);
        let b = session(vec![question(1, "A")], None);
        let foreign = b.grade(fixed_now(), false).unwrap();
        assert_eq!(a.finish(&foreign).unwrap_err(), SessionError::ForeignResult);
        assert_eq!(a.status(), SessionStatus::InProgress);
    }

    #[test]
    fn record_answer_validates_choice_and_question() {
        let mut s = session(vec![question(1, "A")], None);
        assert!(matches!(
            s.record_answer(QuestionId::new(1), "E"),
            Err(SessionError::InvalidChoice { .. })
        ));
        assert!(matches!(
            s.record_answer(QuestionId::new(1), "a"),
            Err(SessionError::InvalidChoice { .. })
        ));
        assert_eq!(
            s.record_answer(QuestionId::new(9), "A").unwrap_err(),
            SessionError::UnknownQuestion(QuestionId::new(9))
        );
    }

    #[test]
    fn record_answer_is_idempotent_and_overwritable() {
        let mut s = session(vec![question(1, "A"), question(2, "B")], None);
        assert!(s.record_answer(QuestionId::new(1), "C").unwrap());
        assert!(!s.record_answer(QuestionId::new(1), "C").unwrap());
        assert!(s.record_answer(QuestionId::new(1), "A").unwrap());
        assert_eq!(s.answer_for(QuestionId::new(1)), Some("A"));
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.progress().answered, 1);
    }

    #[test]
    fn advance_is_clamped() {
        let mut s = session(vec![question(1, "A"), question(2, "B")], None);
        assert_eq!(s.advance(Direction::Previous).unwrap(), 0);
        assert_eq!(s.advance(Direction::Next).unwrap(), 1);
        assert_eq!(s.advance(Direction::Next).unwrap(), 1);
        assert_eq!(s.current_question().id(), QuestionId::new(2));
        assert_eq!(s.advance(Direction::Previous).unwrap(), 0);
    }

    #[test]
    fn clear_answers_resets_map() {
        let mut s = session(vec![question(1, "A")], None);
        s.record_answer(QuestionId::new(1), "A").unwrap();
        s.clear_answers().unwrap();
        assert_eq!(s.answer_for(QuestionId::new(1)), None);
    }

    #[test]
    fn time_remaining_never_negative() {
        let s = session(vec![question(1, "A")], Some(Duration::seconds(300)));
        let start = fixed_now();
        assert_eq!(
            s.time_remaining(start + Duration::seconds(100)),
            TimeRemaining::Limited(Duration::seconds(200))
        );
        assert_eq!(
            s.time_remaining(start + Duration::seconds(300)),
            TimeRemaining::Limited(Duration::zero())
        );
        assert_eq!(
            s.time_remaining(start + Duration::hours(2)),
            TimeRemaining::Limited(Duration::zero())
        );
        assert!(s.is_time_up(start + Duration::seconds(300)));
        assert!(!s.is_time_up(start + Duration::seconds(299)));
    }

    #[test]
    fn unlimited_session_never_times_out() {
        let s = session(vec![question(1, "A")], None);
        assert_eq!(
            s.time_remaining(fixed_now() + Duration::days(3)),
            TimeRemaining::Unlimited
        );
        assert!(!s.is_time_up(fixed_now() + Duration::days(3)));
    }

    #[test]
    fn constructor_rejects_bad_input() {
        let empty = QuizSession::new(
            SessionId::generate(),
            None,
            QuestionFilter::any(),
            Vec::new(),
            None,
            fixed_now(),
        );
        assert_eq!(empty.unwrap_err(), SessionError::NoQuestions);

        let dup = QuizSession::new(
            SessionId::generate(),
            None,
            QuestionFilter::any(),
            vec![question(1, "A"), question(1, "A")],
            None,
            fixed_now(),
        );
        assert_eq!(
            dup.unwrap_err(),
            SessionError::DuplicateQuestion(QuestionId::new(1))
        );

        let zero_budget = QuizSession::new(
            SessionId::generate(),
            None,
            QuestionFilter::any(),
            vec![question(1, "A")],
            Some(Duration::zero()),
            fixed_now(),
        );
        assert_eq!(zero_budget.unwrap_err(), SessionError::InvalidTimeBudget);
    }

    #[test]
    fn elapsed_is_clamped_when_clock_moves_backwards() {
        let mut s = session(vec![question(1, "A")], None);
        let result = s.submit(fixed_now() - Duration::seconds(5), false).unwrap();
        assert_eq!(result.elapsed(), Duration::zero());
    }
}
