use quiz_core::model::{Theme, ThemeId, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{colors_to_json, conn, id_to_i64, map_theme_row, ser, theme_id_from_i64};
use crate::repository::{NewThemeRecord, StorageError, ThemeRepository};

const THEME_COLUMNS: &str =
    "id, title, description, icon, colors, created_by, created_at, questions_count, is_public";

enum ThemeFilter {
    Public,
    VisibleTo(UserId),
    OwnedBy(UserId),
}

impl SqliteRepository {
    async fn fetch_themes(
        &self,
        filter: ThemeFilter,
        limit: u32,
    ) -> Result<Vec<Theme>, StorageError> {
        let (clause, user) = match filter {
            ThemeFilter::Public => ("is_public = 1", None),
            ThemeFilter::VisibleTo(user) => ("(is_public = 1 OR created_by = ?2)", Some(user)),
            ThemeFilter::OwnedBy(user) => ("created_by = ?2", Some(user)),
        };
        let sql = format!(
            "SELECT {THEME_COLUMNS} FROM themes WHERE {clause} ORDER BY created_at DESC, id DESC LIMIT ?1"
        );

        let mut query = sqlx::query(&sql).bind(i64::from(limit));
        if let Some(user) = user {
            query = query.bind(user.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut themes = Vec::with_capacity(rows.len());
        for row in rows {
            themes.push(map_theme_row(&row)?);
        }
        Ok(themes)
    }
}

#[async_trait::async_trait]
impl ThemeRepository for SqliteRepository {
    async fn insert_theme(&self, theme: NewThemeRecord) -> Result<Theme, StorageError> {
        let colors = colors_to_json(&theme.fields.colors)?;
        let res = sqlx::query(
            r"
            INSERT INTO themes (title, description, icon, colors, created_by, created_at, questions_count, is_public)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            ",
        )
        .bind(theme.fields.title.as_str())
        .bind(theme.fields.description.as_str())
        .bind(theme.fields.icon.as_str())
        .bind(colors)
        .bind(theme.created_by.to_string())
        .bind(theme.created_at)
        .bind(i64::from(theme.fields.is_public))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = theme_id_from_i64(res.last_insert_rowid())?;
        Ok(Theme::new(id, theme.fields, theme.created_by, theme.created_at))
    }

    async fn update_theme(&self, theme: &Theme) -> Result<(), StorageError> {
        let res = sqlx::query(
            r"
            UPDATE themes SET
                title = ?2,
                description = ?3,
                icon = ?4,
                colors = ?5,
                is_public = ?6
            WHERE id = ?1
            ",
        )
        .bind(id_to_i64("theme_id", theme.id().value())?)
        .bind(theme.title())
        .bind(theme.description())
        .bind(theme.icon())
        .bind(colors_to_json(theme.colors())?)
        .bind(i64::from(theme.is_public()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_theme(&self, id: ThemeId) -> Result<Option<Theme>, StorageError> {
        let sql = format!("SELECT {THEME_COLUMNS} FROM themes WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("theme_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_theme_row).transpose()
    }

    async fn list_public_themes(&self, limit: u32) -> Result<Vec<Theme>, StorageError> {
        self.fetch_themes(ThemeFilter::Public, limit).await
    }

    async fn list_visible_themes(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Theme>, StorageError> {
        self.fetch_themes(ThemeFilter::VisibleTo(user), limit).await
    }

    async fn list_user_themes(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Theme>, StorageError> {
        self.fetch_themes(ThemeFilter::OwnedBy(user), limit).await
    }

    async fn delete_theme(&self, id: ThemeId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM themes WHERE id = ?1")
            .bind(id_to_i64("theme_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn adjust_question_count(&self, id: ThemeId, delta: i32) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            UPDATE themes
            SET questions_count = MAX(questions_count + ?2, 0)
            WHERE id = ?1
            RETURNING questions_count
            ",
        )
        .bind(id_to_i64("theme_id", id.value())?)
        .bind(i64::from(delta))
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let count: i64 = row.try_get("questions_count").map_err(ser)?;
        u32::try_from(count)
            .map_err(|_| StorageError::Serialization(format!("invalid questions_count: {count}")))
    }
}
