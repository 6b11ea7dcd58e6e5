mod filter;
mod ids;
mod question;
mod result;
mod session;

pub use filter::{FilterValues, QuestionFilter};
pub use ids::{ParseIdError, QuestionId, ResultId, SessionId, UserId};
pub use question::{Difficulty, Question, QuestionDraft, QuestionError, ValidatedQuestion};
pub use result::{PendingResult, QuizResult, ResultError, percentage};
pub use session::{
    Direction, QuestionOutcome, QuizSession, SessionError, SessionOutcome, SessionProgress,
    SessionStatus, TimeRemaining,
};
