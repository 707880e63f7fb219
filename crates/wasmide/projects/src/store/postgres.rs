//! PostgreSQL project metadata store.
//!
//! The schema is created on connect. `share_code` carries a UNIQUE
//! constraint, so concurrent share enabling can never leave two projects
//! holding the same active code.

use super::ProjectStore;
use crate::error::{MetadataError, MetadataResult};
use crate::model::{Project, ProjectId};
use crate::share_code::ShareCode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use wasmide_compiler::Language;

const COLUMNS: &str = "id, name, owner_id, language, is_shared, share_code, created_at";

/// PostgreSQL-backed [`ProjectStore`].
#[derive(Clone)]
pub struct PostgresProjectStore {
    pool: PgPool,
}

impl PostgresProjectStore {
    /// Connect to PostgreSQL and initialize the schema.
    pub async fn connect(database_url: &str) -> MetadataResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> MetadataResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| MetadataError::Backend(format!("failed to connect postgres: {e}")))?;
        Self::from_pool(pool).await
    }

    /// Create the store from an existing pool.
    pub async fn from_pool(pool: PgPool) -> MetadataResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> MetadataResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS wasmide_projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                language TEXT NOT NULL,
                is_shared BOOLEAN NOT NULL DEFAULT FALSE,
                share_code TEXT UNIQUE,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS wasmide_projects_owner_idx ON wasmide_projects (owner_id)",
        ];
        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| MetadataError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for PostgresProjectStore {
    async fn insert(&self, project: &Project) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wasmide_projects
                (id, name, owner_id, language, is_shared, share_code, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(project.id.as_str())
        .bind(&project.name)
        .bind(&project.owner_id)
        .bind(project.language.as_str())
        .bind(project.is_shared)
        .bind(project.share_code.as_ref().map(ShareCode::as_str))
        .bind(project.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        Ok(())
    }

    async fn get(&self, id: &ProjectId) -> MetadataResult<Option<Project>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM wasmide_projects WHERE id = $1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(|r| row_to_project(&r)).transpose()
    }

    async fn list_by_owner(&self, owner_id: &str) -> MetadataResult<Vec<Project>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM wasmide_projects WHERE owner_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(row_to_project).collect()
    }

    async fn rename(&self, id: &ProjectId, name: &str) -> MetadataResult<Project> {
        let row = sqlx::query(&format!(
            "UPDATE wasmide_projects SET name = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .ok_or_else(|| MetadataError::NotFound(format!("project {id}")))?;
        row_to_project(&row)
    }

    async fn enable_sharing(&self, id: &ProjectId, code: &ShareCode) -> MetadataResult<ShareCode> {
        let row = sqlx::query(
            r#"
            UPDATE wasmide_projects
               SET is_shared = TRUE,
                   share_code = COALESCE(share_code, $2)
             WHERE id = $1
            RETURNING share_code
            "#,
        )
        .bind(id.as_str())
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?
        .ok_or_else(|| MetadataError::NotFound(format!("project {id}")))?;

        let active: String = row.try_get("share_code").map_err(backend)?;
        ShareCode::parse(&active)
            .ok_or_else(|| MetadataError::Serialization(format!("malformed share code `{active}`")))
    }

    async fn disable_sharing(&self, id: &ProjectId) -> MetadataResult<()> {
        let result = sqlx::query(
            "UPDATE wasmide_projects SET is_shared = FALSE, share_code = NULL WHERE id = $1",
        )
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!("project {id}")));
        }
        Ok(())
    }

    async fn find_by_share_code(&self, code: &ShareCode) -> MetadataResult<Option<Project>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM wasmide_projects WHERE share_code = $1 AND is_shared = TRUE"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;
        row.map(|r| row_to_project(&r)).transpose()
    }

    async fn delete(&self, id: &ProjectId) -> MetadataResult<bool> {
        let result = sqlx::query("DELETE FROM wasmide_projects WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_to_project(row: &PgRow) -> MetadataResult<Project> {
    let language: String = row.try_get("language").map_err(backend)?;
    let share_code: Option<String> = row.try_get("share_code").map_err(backend)?;
    let share_code = share_code
        .map(|raw| {
            ShareCode::parse(&raw)
                .ok_or_else(|| MetadataError::Serialization(format!("malformed share code `{raw}`")))
        })
        .transpose()?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(backend)?;

    Ok(Project {
        id: ProjectId::from(row.try_get::<String, _>("id").map_err(backend)?),
        name: row.try_get("name").map_err(backend)?,
        owner_id: row.try_get("owner_id").map_err(backend)?,
        language: language
            .parse::<Language>()
            .map_err(|e| MetadataError::Serialization(e.to_string()))?,
        is_shared: row.try_get("is_shared").map_err(backend)?,
        share_code,
        created_at,
    })
}

fn backend(err: sqlx::Error) -> MetadataError {
    MetadataError::Backend(err.to_string())
}

fn map_sqlx_conflict(err: sqlx::Error) -> MetadataError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return MetadataError::UniquenessConflict(db_err.message().to_string());
        }
    }
    backend(err)
}
