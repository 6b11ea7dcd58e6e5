use chrono::{DateTime, Utc};

use quiz_core::model::{
    Difficulty, QuestionId, QuizSession, SessionProgress, SessionStatus, TimeRemaining,
};

/// Presentation-agnostic snapshot of a session at one instant.
///
/// Holds no formatted strings; the front end decides how to render the
/// timer and the progress line.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub question_id: QuestionId,
    pub subject: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub prompt: String,
    pub choices: Vec<String>,
    pub selected: Option<String>,

    pub progress: SessionProgress,
    pub time_remaining: TimeRemaining,
}

impl SessionView {
    #[must_use]
    pub fn from_session(session: &QuizSession, now: DateTime<Utc>) -> Self {
        let question = session.current_question();
        Self {
            question_id: question.id(),
            subject: question.subject().to_string(),
            category: question.category().to_string(),
            difficulty: question.difficulty(),
            prompt: question.prompt().to_string(),
            choices: question.choices().to_vec(),
            selected: session.answer_for(question.id()).map(ToString::to_string),
            progress: session.progress(),
            time_remaining: session.time_remaining(now),
        }
    }

    /// 1-based position of the current question.
    #[must_use]
    pub fn position(&self) -> usize {
        self.progress.cursor + 1
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.progress.cursor == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.progress.cursor + 1 >= self.progress.total
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.progress.status == SessionStatus::InProgress
    }
}
