use quiz_core::model::{Difficulty, FilterValues, Question, QuestionFilter, ValidatedQuestion};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    encode_choices, map_question_row, parse_difficulty, question_id_from_i64, ser,
};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(&self, question: ValidatedQuestion) -> Result<Question, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO questions (subject, category, difficulty, prompt, choices, answer)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(question.subject())
        .bind(question.category())
        .bind(question.difficulty().as_str())
        .bind(question.prompt())
        .bind(encode_choices(question.choices())?)
        .bind(question.answer())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let id = question_id_from_i64(res.last_insert_rowid())?;
        Ok(question.assign_id(id))
    }

    async fn query_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, StorageError> {
        let mut sql = String::from(
            r"
            SELECT id, subject, category, difficulty, prompt, choices, answer
            FROM questions
            WHERE 1 = 1
            ",
        );

        let mut bind_index = 1;
        if filter.subject.is_some() {
            sql.push_str(" AND subject = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if filter.category.is_some() {
            sql.push_str(" AND category = ?");
            sql.push_str(&bind_index.to_string());
            bind_index += 1;
        }
        if filter.difficulty.is_some() {
            sql.push_str(" AND difficulty = ?");
            sql.push_str(&bind_index.to_string());
        }
        sql.push_str(" ORDER BY id ASC");

        let mut query = sqlx::query(&sql);
        if let Some(subject) = &filter.subject {
            query = query.bind(subject.as_str());
        }
        if let Some(category) = &filter.category {
            query = query.bind(category.as_str());
        }
        if let Some(difficulty) = filter.difficulty {
            query = query.bind(difficulty.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }
        Ok(out)
    }

    async fn filter_values(&self) -> Result<FilterValues, StorageError> {
        let subjects = distinct_column(self, "subject").await?;
        let categories = distinct_column(self, "category").await?;

        let mut difficulties = distinct_column(self, "difficulty")
            .await?
            .iter()
            .map(|d| parse_difficulty(d))
            .collect::<Result<Vec<Difficulty>, _>>()?;
        difficulties.sort();

        Ok(FilterValues::from_parts(subjects, categories, difficulties))
    }

    async fn count_questions(&self) -> Result<u64, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM questions")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let n: i64 = row.try_get("n").map_err(ser)?;
        u64::try_from(n).map_err(ser)
    }
}

async fn distinct_column(
    repo: &SqliteRepository,
    column: &'static str,
) -> Result<Vec<String>, StorageError> {
    // column names come from the fixed set above, never from input
    let sql = format!("SELECT DISTINCT {column} AS value FROM questions ORDER BY {column} ASC");
    let rows = sqlx::query(&sql)
        .fetch_all(&repo.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        out.push(row.try_get::<String, _>("value").map_err(ser)?);
    }
    Ok(out)
}
