use quiz_core::model::{PendingResult, QuizResult, SessionId, UserId};

use super::SqliteRepository;
use super::mapping::{map_result_row, result_id_from_i64};
use crate::repository::{ResultRepository, StorageError};

const RESULT_COLUMNS: &str = r"
    id, session_id, user_id, subject, category, difficulty, score,
    total_questions, percentage, elapsed_ms, completed_at, outcome
";

#[async_trait::async_trait]
impl ResultRepository for SqliteRepository {
    async fn append_result(&self, result: &PendingResult) -> Result<QuizResult, StorageError> {
        let filter = result.filter();
        let res = sqlx::query(
            r"
            INSERT INTO quiz_results (
                session_id, user_id, subject, category, difficulty, score,
                total_questions, percentage, elapsed_ms, completed_at, outcome
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(session_id) DO NOTHING
            ",
        )
        .bind(result.session_id().to_string())
        .bind(result.user().map(UserId::as_str))
        .bind(filter.subject.as_deref())
        .bind(filter.category.as_deref())
        .bind(filter.difficulty.map(|d| d.as_str()))
        .bind(i64::from(result.score()))
        .bind(i64::from(result.total()))
        .bind(result.percentage())
        .bind(result.elapsed().num_milliseconds())
        .bind(result.completed_at())
        .bind(result.outcome().as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            tracing::debug!(session_id = %result.session_id(), "result already stored");
            return self
                .get_result_for_session(result.session_id())
                .await?
                .ok_or(StorageError::Conflict);
        }

        let id = result_id_from_i64(res.last_insert_rowid())?;
        Ok(result.clone().assign_id(id))
    }

    async fn get_result_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Option<QuizResult>, StorageError> {
        let sql = format!("SELECT {RESULT_COLUMNS} FROM quiz_results WHERE session_id = ?1");
        let row = sqlx::query(&sql)
            .bind(session_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_result_row).transpose()
    }

    async fn top_results(&self, limit: u32) -> Result<Vec<QuizResult>, StorageError> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM quiz_results
             ORDER BY percentage DESC, score DESC, completed_at ASC, id ASC
             LIMIT ?1"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row(&row)?);
        }
        Ok(out)
    }

    async fn list_results_for_user(
        &self,
        user: &UserId,
        limit: u32,
    ) -> Result<Vec<QuizResult>, StorageError> {
        let sql = format!(
            "SELECT {RESULT_COLUMNS} FROM quiz_results
             WHERE user_id = ?1
             ORDER BY completed_at DESC, id DESC
             LIMIT ?2"
        );
        let rows = sqlx::query(&sql)
            .bind(user.as_str())
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row(&row)?);
        }
        Ok(out)
    }
}
