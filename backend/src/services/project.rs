//! Project service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{Pagination, Project};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Project service for managing forestry projects
#[derive(Clone)]
pub struct ProjectService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: Uuid,
    nombre: String,
    cliente: Option<String>,
    mezcla_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Project {
            id: row.id,
            nombre: row.nombre,
            cliente: row.cliente,
            mezcla_id: row.mezcla_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a project
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectInput {
    #[validate(length(min = 1, max = 200), custom = "shared::validate_not_blank")]
    pub nombre: String,
    #[validate(length(max = 200))]
    pub cliente: Option<String>,
    pub mezcla_id: Option<Uuid>,
}

/// Input for assigning a mix to a project
#[derive(Debug, Deserialize)]
pub struct AssignMixInput {
    pub mezcla_id: Uuid,
}

impl ProjectService {
    /// Create a new ProjectService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_project(&self, input: CreateProjectInput) -> AppResult<Project> {
        input.validate()?;

        if let Some(mezcla_id) = input.mezcla_id {
            self.ensure_mix(mezcla_id).await?;
        }

        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            INSERT INTO proyectos (nombre, cliente, mezcla_id)
            VALUES ($1, $2, $3)
            RETURNING id, nombre, cliente, mezcla_id, created_at, updated_at
            "#,
        )
        .bind(input.nombre.trim())
        .bind(&input.cliente)
        .bind(input.mezcla_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(project_id = %row.id, nombre = %row.nombre, "project created");
        Ok(row.into())
    }

    pub async fn get_project(&self, project_id: Uuid) -> AppResult<Project> {
        let row = sqlx::query_as::<_, ProjectRow>(
            "SELECT id, nombre, cliente, mezcla_id, created_at, updated_at FROM proyectos WHERE id = $1",
        )
        .bind(project_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

        Ok(row.into())
    }

    pub async fn list_projects(&self, pagination: Pagination) -> AppResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, nombre, cliente, mezcla_id, created_at, updated_at
            FROM proyectos
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    /// Assign the mix that new runs of the project will produce.
    ///
    /// Existing runs keep the mix they were created with.
    pub async fn assign_mix(&self, project_id: Uuid, input: AssignMixInput) -> AppResult<Project> {
        self.ensure_mix(input.mezcla_id).await?;

        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            UPDATE proyectos
            SET mezcla_id = $2, updated_at = now()
            WHERE id = $1
            RETURNING id, nombre, cliente, mezcla_id, created_at, updated_at
            "#,
        )
        .bind(project_id)
        .bind(input.mezcla_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?;

        tracing::info!(project_id = %row.id, mezcla_id = %input.mezcla_id, "mix assigned to project");
        Ok(row.into())
    }

    async fn ensure_mix(&self, mezcla_id: Uuid) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM mezclas WHERE id = $1)")
            .bind(mezcla_id)
            .fetch_one(&self.db)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(AppError::NotFound("Mix".to_string()))
        }
    }
}
