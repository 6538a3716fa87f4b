//! SQLite form repository implementation.
//!
//! Implements `FormRepository` from `formloom-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, JSON columns for
//! question lists and settings maps.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use formloom_core::repository::FormRepository;
use formloom_types::error::RepositoryError;
use formloom_types::form::{Form, FormSettings, FormVersion, VersionStatus};
use formloom_types::question::Question;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `FormRepository`.
pub struct SqliteFormRepository {
    pool: DatabasePool,
}

impl SqliteFormRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct FormRow {
    id: String,
    owner_id: String,
    title: String,
    description: Option<String>,
    questions: String,
    settings: String,
    current_draft_version_id: Option<String>,
    current_published_version_id: Option<String>,
    created_at: String,
    updated_at: String,
}

impl FormRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            questions: row.try_get("questions")?,
            settings: row.try_get("settings")?,
            current_draft_version_id: row.try_get("current_draft_version_id")?,
            current_published_version_id: row.try_get("current_published_version_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_form(self) -> Result<Form, RepositoryError> {
        Ok(Form {
            id: parse_uuid(&self.id, "form id")?,
            owner_id: self.owner_id,
            title: self.title,
            description: self.description,
            questions: parse_questions(&self.questions)?,
            settings: parse_settings(&self.settings)?,
            current_draft_version_id: self
                .current_draft_version_id
                .as_deref()
                .map(|s| parse_uuid(s, "draft version id"))
                .transpose()?,
            current_published_version_id: self
                .current_published_version_id
                .as_deref()
                .map(|s| parse_uuid(s, "published version id"))
                .transpose()?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct VersionRow {
    id: String,
    form_id: String,
    status: String,
    title: String,
    description: Option<String>,
    questions: String,
    settings: String,
    created_at: String,
    updated_at: String,
}

impl VersionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            form_id: row.try_get("form_id")?,
            status: row.try_get("status")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            questions: row.try_get("questions")?,
            settings: row.try_get("settings")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_version(self) -> Result<FormVersion, RepositoryError> {
        let status: VersionStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(FormVersion {
            id: parse_uuid(&self.id, "version id")?,
            form_id: parse_uuid(&self.form_id, "form id")?,
            status,
            title: self.title,
            description: self.description,
            questions: parse_questions(&self.questions)?,
            settings: parse_settings(&self.settings)?,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str, what: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(s).map_err(|e| RepositoryError::Query(format!("invalid {what}: {e}")))
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_questions(json: &str) -> Result<Vec<Question>, RepositoryError> {
    serde_json::from_str(json)
        .map_err(|e| RepositoryError::Query(format!("invalid questions json: {e}")))
}

fn parse_settings(json: &str) -> Result<FormSettings, RepositoryError> {
    serde_json::from_str(json)
        .map_err(|e| RepositoryError::Query(format!("invalid settings json: {e}")))
}

fn questions_json(questions: &[Question]) -> Result<String, RepositoryError> {
    serde_json::to_string(questions)
        .map_err(|e| RepositoryError::Query(format!("failed to serialize questions: {e}")))
}

fn settings_json(settings: &FormSettings) -> Result<String, RepositoryError> {
    serde_json::to_string(settings)
        .map_err(|e| RepositoryError::Query(format!("failed to serialize settings: {e}")))
}

// ---------------------------------------------------------------------------
// FormRepository implementation
// ---------------------------------------------------------------------------

impl FormRepository for SqliteFormRepository {
    async fn create_form(&self, form: &Form) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO forms (id, owner_id, title, description, questions, settings, current_draft_version_id, current_published_version_id, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(form.id.to_string())
        .bind(&form.owner_id)
        .bind(&form.title)
        .bind(&form.description)
        .bind(questions_json(&form.questions)?)
        .bind(settings_json(&form.settings)?)
        .bind(form.current_draft_version_id.map(|id| id.to_string()))
        .bind(form.current_published_version_id.map(|id| id.to_string()))
        .bind(format_datetime(&form.created_at))
        .bind(format_datetime(&form.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("form '{}' already exists", form.id))
            }
            other => RepositoryError::Query(other.to_string()),
        })?;

        Ok(())
    }

    async fn get_form(&self, id: &Uuid) -> Result<Option<Form>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM forms WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let form_row =
                    FormRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(form_row.into_form()?))
            }
            None => Ok(None),
        }
    }

    async fn update_form(&self, form: &Form) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE forms
               SET title = ?, description = ?, questions = ?, settings = ?,
                   current_draft_version_id = ?, current_published_version_id = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&form.title)
        .bind(&form.description)
        .bind(questions_json(&form.questions)?)
        .bind(settings_json(&form.settings)?)
        .bind(form.current_draft_version_id.map(|id| id.to_string()))
        .bind(form.current_published_version_id.map(|id| id.to_string()))
        .bind(format_datetime(&form.updated_at))
        .bind(form.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn upsert_version(&self, version: &FormVersion) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO form_versions (id, form_id, status, title, description, questions, settings, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   status = excluded.status,
                   title = excluded.title,
                   description = excluded.description,
                   questions = excluded.questions,
                   settings = excluded.settings,
                   updated_at = excluded.updated_at"#,
        )
        .bind(version.id.to_string())
        .bind(version.form_id.to_string())
        .bind(version.status.to_string())
        .bind(&version.title)
        .bind(&version.description)
        .bind(questions_json(&version.questions)?)
        .bind(settings_json(&version.settings)?)
        .bind(format_datetime(&version.created_at))
        .bind(format_datetime(&version.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict(
                format!("form '{}' already has a {} version", version.form_id, version.status),
            ),
            other => RepositoryError::Query(other.to_string()),
        })?;

        Ok(())
    }

    async fn get_version(&self, id: &Uuid) -> Result<Option<FormVersion>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM form_versions WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let version_row = VersionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(version_row.into_version()?))
            }
            None => Ok(None),
        }
    }

    async fn get_version_by_status(
        &self,
        form_id: &Uuid,
        status: VersionStatus,
    ) -> Result<Option<FormVersion>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM form_versions WHERE form_id = ? AND status = ?")
            .bind(form_id.to_string())
            .bind(status.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let version_row = VersionRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(version_row.into_version()?))
            }
            None => Ok(None),
        }
    }

    async fn count_forms_by_owner(&self, owner_id: &str) -> Result<u32, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM forms WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count as u32)
    }
}
