use quiz_core::model::{
    AnswerOption, OptionId, Question, QuestionId, QuizResult, ResultId, Theme, ThemeId, UserId,
};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{QuizResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn theme_id_from_i64(v: i64) -> Result<ThemeId, StorageError> {
    Ok(ThemeId::new(i64_to_u64("theme_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

fn user_id_from_str(raw: &str) -> Result<UserId, StorageError> {
    raw.parse::<UserId>().map_err(ser)
}

/// JSON shape of one answer option inside the `questions.options` column.
#[derive(Debug, Serialize, Deserialize)]
struct OptionJson {
    id: u64,
    text: String,
    is_correct: bool,
}

pub(crate) fn options_to_json(options: &[AnswerOption]) -> Result<String, StorageError> {
    let rows: Vec<OptionJson> = options
        .iter()
        .map(|o| OptionJson {
            id: o.id.value(),
            text: o.text.clone(),
            is_correct: o.is_correct,
        })
        .collect();
    serde_json::to_string(&rows).map_err(ser)
}

pub(crate) fn options_from_json(raw: &str) -> Result<Vec<AnswerOption>, StorageError> {
    let rows: Vec<OptionJson> = serde_json::from_str(raw).map_err(ser)?;
    Ok(rows
        .into_iter()
        .map(|o| AnswerOption::new(OptionId::new(o.id), o.text, o.is_correct))
        .collect())
}

pub(crate) fn colors_to_json(colors: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(colors).map_err(ser)
}

pub(crate) fn map_theme_row(row: &SqliteRow) -> Result<Theme, StorageError> {
    let colors: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("colors").map_err(ser)?).map_err(ser)?;
    Theme::from_persisted(
        theme_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get("title").map_err(ser)?,
        row.try_get("description").map_err(ser)?,
        row.try_get("icon").map_err(ser)?,
        colors,
        user_id_from_str(&row.try_get::<String, _>("created_by").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
        u32_from_i64(
            "questions_count",
            row.try_get::<i64, _>("questions_count").map_err(ser)?,
        )?,
        row.try_get::<i64, _>("is_public").map_err(ser)? != 0,
    )
    .map_err(ser)
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    Question::from_persisted(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        theme_id_from_i64(row.try_get::<i64, _>("theme_id").map_err(ser)?)?,
        row.try_get("text").map_err(ser)?,
        options_from_json(&row.try_get::<String, _>("options").map_err(ser)?)?,
        user_id_from_str(&row.try_get::<String, _>("created_by").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_result_row(row: &SqliteRow) -> Result<QuizResult, StorageError> {
    QuizResult::new(
        theme_id_from_i64(row.try_get::<i64, _>("theme_id").map_err(ser)?)?,
        row.try_get::<String, _>("theme_name").map_err(ser)?,
        user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        u32_from_i64(
            "total_questions",
            row.try_get::<i64, _>("total_questions").map_err(ser)?,
        )?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_result_row_with_id(row: &SqliteRow) -> Result<QuizResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    Ok(QuizResultRow::new(ResultId::new(id), map_result_row(row)?))
}
