use quiz_core::model::{QuizResult, ResultId, UserId, UserStats};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_result_row, map_result_row_with_id, ser};
use crate::repository::{QuizResultRepository, QuizResultRow, StorageError};

#[async_trait::async_trait]
impl QuizResultRepository for SqliteRepository {
    async fn append_result(&self, result: &QuizResult) -> Result<ResultId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO quiz_results (theme_id, theme_name, user_id, score, total_questions, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ",
        )
        .bind(id_to_i64("theme_id", result.theme_id().value())?)
        .bind(result.theme_name())
        .bind(result.user_id().to_string())
        .bind(i64::from(result.score()))
        .bind(i64::from(result.total_questions()))
        .bind(result.completed_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(ResultId::new(res.last_insert_rowid()))
    }

    async fn get_result(&self, id: ResultId) -> Result<QuizResult, StorageError> {
        let row = sqlx::query(
            r"
            SELECT theme_id, theme_name, user_id, score, total_questions, completed_at
            FROM quiz_results
            WHERE id = ?1
            ",
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        map_result_row(&row)
    }

    async fn list_user_results(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<QuizResultRow>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, theme_id, theme_name, user_id, score, total_questions, completed_at
            FROM quiz_results
            WHERE user_id = ?1
            ORDER BY completed_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(user.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_result_row_with_id(&row)?);
        }
        Ok(out)
    }

    async fn user_stats(&self, user: UserId) -> Result<UserStats, StorageError> {
        // Per-row percentage uses the same half-up integer rounding as `percentage`.
        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) AS quizzes_taken,
                COALESCE(SUM(score), 0) AS correct_answers,
                COALESCE(SUM(total_questions), 0) AS total_questions,
                COALESCE(
                    SUM((score * 200 + total_questions) / (total_questions * 2)),
                    0
                ) AS percentage_sum
            FROM quiz_results
            WHERE user_id = ?1
            ",
        )
        .bind(user.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        let count = |column: &'static str| -> Result<u32, StorageError> {
            let value: i64 = row.try_get(column).map_err(ser)?;
            Ok(u32::try_from(value).unwrap_or(u32::MAX))
        };
        let percentage_sum: i64 = row.try_get("percentage_sum").map_err(ser)?;
        Ok(UserStats::from_totals(
            count("quizzes_taken")?,
            count("correct_answers")?,
            count("total_questions")?,
            u64::try_from(percentage_sum).map_err(ser)?,
        ))
    }
}
