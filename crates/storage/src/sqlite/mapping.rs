use chrono::Duration;
use quiz_core::model::{
    Difficulty, Question, QuestionFilter, QuestionId, QuizResult, ResultId, SessionId,
    SessionOutcome, UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn result_id_from_i64(v: i64) -> Result<ResultId, StorageError> {
    Ok(ResultId::new(i64_to_u64("result_id", v)?))
}

pub(crate) fn parse_difficulty(s: &str) -> Result<Difficulty, StorageError> {
    s.parse::<Difficulty>().map_err(ser)
}

/// Choices are stored as a JSON array so any character may appear in a choice.
pub(crate) fn encode_choices(choices: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(choices).map_err(ser)
}

pub(crate) fn decode_choices(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let choices: String = row.try_get("choices").map_err(ser)?;

    Question::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("subject").map_err(ser)?,
        row.try_get("category").map_err(ser)?,
        parse_difficulty(&difficulty)?,
        row.try_get("prompt").map_err(ser)?,
        decode_choices(&choices)?,
        row.try_get("answer").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizResult, StorageError> {
    let session_id: String = row.try_get("session_id").map_err(ser)?;
    let session_id = session_id.parse::<SessionId>().map_err(ser)?;

    let user = row
        .try_get::<Option<String>, _>("user_id")
        .map_err(ser)?
        .and_then(UserId::new);

    let filter = QuestionFilter {
        subject: row.try_get("subject").map_err(ser)?,
        category: row.try_get("category").map_err(ser)?,
        difficulty: row
            .try_get::<Option<String>, _>("difficulty")
            .map_err(ser)?
            .as_deref()
            .map(parse_difficulty)
            .transpose()?,
    };

    let outcome: String = row.try_get("outcome").map_err(ser)?;
    let outcome = SessionOutcome::parse(&outcome)
        .ok_or_else(|| StorageError::Serialization(format!("invalid outcome: {outcome}")))?;

    let elapsed_ms: i64 = row.try_get("elapsed_ms").map_err(ser)?;

    QuizResult::from_persisted(
        result_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        session_id,
        user,
        filter,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        Duration::milliseconds(elapsed_ms),
        row.try_get("completed_at").map_err(ser)?,
        outcome,
    )
    .map_err(ser)
}
