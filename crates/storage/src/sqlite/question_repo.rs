use quiz_core::model::{Question, QuestionId, ThemeId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_question_row, options_to_json, question_id_from_i64};
use crate::repository::{NewQuestionRecord, QuestionRepository, StorageError};

const QUESTION_COLUMNS: &str = "id, theme_id, text, options, created_by, created_at";

/// Maps a failed insert to `NotFound` when the theme foreign key is violated.
fn insert_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => conn(e),
    }
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_question(&self, question: NewQuestionRecord) -> Result<Question, StorageError> {
        let mut stored = self.insert_questions(vec![question]).await?;
        stored.pop().ok_or(StorageError::Conflict)
    }

    async fn insert_questions(
        &self,
        questions: Vec<NewQuestionRecord>,
    ) -> Result<Vec<Question>, StorageError> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(conn)?;
        let mut out = Vec::with_capacity(questions.len());
        for record in questions {
            let res = sqlx::query(
                r"
                INSERT INTO questions (theme_id, text, options, created_by, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(id_to_i64("theme_id", record.fields.theme_id.value())?)
            .bind(record.fields.text.as_str())
            .bind(options_to_json(&record.fields.options)?)
            .bind(record.created_by.to_string())
            .bind(record.created_at)
            .execute(&mut *tx)
            .await
            .map_err(insert_error)?;

            let id = question_id_from_i64(res.last_insert_rowid())?;
            out.push(Question::new(
                id,
                record.fields,
                record.created_by,
                record.created_at,
            ));
        }
        tx.commit().await.map_err(conn)?;

        Ok(out)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("question_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_question_row).transpose()
    }

    async fn list_questions(&self, theme_id: ThemeId) -> Result<Vec<Question>, StorageError> {
        let sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE theme_id = ?1 ORDER BY created_at ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("theme_id", theme_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        // A row that no longer forms a playable question is skipped, not fatal.
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match map_question_row(&row) {
                Ok(question) => out.push(question),
                Err(err) => {
                    let question_id = row.try_get::<i64, _>("id").ok();
                    tracing::warn!(
                        ?question_id,
                        %theme_id,
                        error = %err,
                        "skipping unreadable question"
                    );
                }
            }
        }
        Ok(out)
    }

    async fn update_question(&self, question: &Question) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE questions SET
                text = ?2,
                options = ?3
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("question_id", question.id().value())?)
        .bind(question.text())
        .bind(options_to_json(question.options())?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let sql = format!("DELETE FROM questions WHERE id = ?1 RETURNING {QUESTION_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("question_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_question_row(&row)
    }
}
