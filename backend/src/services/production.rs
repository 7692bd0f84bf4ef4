//! Production run service
//!
//! Every transition runs in one transaction: the run row is locked with
//! `FOR UPDATE`, the transition is validated against the locked status, and
//! the status is written back only if it is still the status that was read.
//! Completion additionally registers the mix's inputs in the project ledger
//! inside the same transaction, so the status change and the consumption
//! entries commit or roll back together.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{CompletionResults, Pagination, ProductionRun, ProductionStatus, Transition};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::availability::{append_consumption, load_ledger, lock_ledger_keys};
use crate::services::mix::load_mix_requirements;

/// Production service for managing run lifecycles
#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

/// Database row for a production run
#[derive(Debug, sqlx::FromRow)]
struct ProductionRow {
    id: Uuid,
    project_id: Uuid,
    mezcla_id: Uuid,
    cantidad_lotes: Decimal,
    estado: String,
    fecha_inicio: Option<DateTime<Utc>>,
    fecha_fin: Option<DateTime<Utc>>,
    cantidad_producida: Option<Decimal>,
    observaciones: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductionRow> for ProductionRun {
    type Error = AppError;

    fn try_from(row: ProductionRow) -> Result<Self, Self::Error> {
        Ok(ProductionRun {
            id: row.id,
            project_id: row.project_id,
            mix_id: row.mezcla_id,
            cantidad_lotes: row.cantidad_lotes,
            estado: row.estado.parse()?,
            fecha_inicio: row.fecha_inicio,
            fecha_fin: row.fecha_fin,
            cantidad_producida: row.cantidad_producida,
            observaciones: row.observaciones,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const RUN_COLUMNS: &str = "id, project_id, mezcla_id, cantidad_lotes, estado, fecha_inicio, fecha_fin, \
     cantidad_producida, observaciones, created_at, updated_at";

/// Input for creating a production run
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductionInput {
    pub project_id: Uuid,
    #[validate(custom = "shared::validate_positive_field")]
    pub cantidad_lotes: Decimal,
}

/// Results recorded when completing a run
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CompleteProductionInput {
    #[validate(custom = "shared::validate_positive_field")]
    pub cantidad_producida: Option<Decimal>,
    #[validate(length(max = 2000))]
    pub observaciones: Option<String>,
}

/// Filters for listing runs
#[derive(Debug, Default, Deserialize)]
pub struct ProductionFilter {
    pub project_id: Option<Uuid>,
    pub estado: Option<ProductionStatus>,
}

impl ProductionService {
    /// Create a new ProductionService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a pending run of the project's assigned mix
    pub async fn create_run(
        &self,
        user_id: Uuid,
        input: CreateProductionInput,
    ) -> AppResult<ProductionRun> {
        input.validate()?;

        let mezcla_id = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT mezcla_id FROM proyectos WHERE id = $1",
        )
        .bind(input.project_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Project".to_string()))?
        .ok_or_else(|| AppError::Validation {
            field: "project_id".to_string(),
            message: "Project has no mix assigned".to_string(),
            message_es: "El proyecto no tiene una mezcla asignada".to_string(),
        })?;

        let run = ProductionRun::new(input.project_id, mezcla_id, input.cantidad_lotes, Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO producciones (id, project_id, mezcla_id, cantidad_lotes, estado,
                                      created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(run.id)
        .bind(run.project_id)
        .bind(run.mix_id)
        .bind(run.cantidad_lotes)
        .bind(run.estado.as_str())
        .bind(user_id)
        .bind(run.created_at)
        .bind(run.updated_at)
        .execute(&self.db)
        .await?;

        tracing::info!(
            run_id = %run.id,
            project_id = %run.project_id,
            mezcla_id = %run.mix_id,
            cantidad_lotes = %run.cantidad_lotes,
            "production run created"
        );
        Ok(run)
    }

    pub async fn get_run(&self, run_id: Uuid) -> AppResult<ProductionRun> {
        let query = format!("SELECT {} FROM producciones WHERE id = $1", RUN_COLUMNS);
        sqlx::query_as::<_, ProductionRow>(&query)
            .bind(run_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Production run".to_string()))?
            .try_into()
    }

    /// List runs, newest first
    pub async fn list_runs(
        &self,
        filter: ProductionFilter,
        pagination: Pagination,
    ) -> AppResult<Vec<ProductionRun>> {
        let query = format!(
            r#"
            SELECT {}
            FROM producciones
            WHERE ($1::uuid IS NULL OR project_id = $1)
              AND ($2::text IS NULL OR estado = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            RUN_COLUMNS
        );

        let rows = sqlx::query_as::<_, ProductionRow>(&query)
            .bind(filter.project_id)
            .bind(filter.estado.map(|e| e.as_str()))
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(ProductionRun::try_from).collect()
    }

    /// pendiente -> en_progreso
    pub async fn start_run(&self, run_id: Uuid) -> AppResult<ProductionRun> {
        let mut tx = self.db.begin().await?;

        let mut run = load_run_for_update(&mut tx, run_id).await?;
        let previous = run.estado;
        run.iniciar(Utc::now())?;
        save_run_transition(&mut tx, &run, previous).await?;

        tx.commit().await?;

        tracing::info!(run_id = %run.id, from = %previous, to = %run.estado, "production run started");
        Ok(run)
    }

    /// en_progreso -> completada, consuming the mix's inputs from the project ledger
    pub async fn complete_run(
        &self,
        run_id: Uuid,
        user_id: Uuid,
        input: CompleteProductionInput,
    ) -> AppResult<ProductionRun> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let mut run = load_run_for_update(&mut tx, run_id).await?;
        let previous = run.estado;
        run.check(Transition::Completar)?;

        let requirements = load_mix_requirements(&mut tx, &[run.mix_id])
            .await?
            .remove(&run.mix_id)
            .unwrap_or_default();
        let insumo_ids: Vec<Uuid> = requirements.per_batch().keys().copied().collect();

        lock_ledger_keys(&mut tx, run.project_id, &insumo_ids).await?;
        let mut ledger = load_ledger(&mut tx, run.project_id).await?;

        let resultados = CompletionResults {
            cantidad_producida: input.cantidad_producida,
            observaciones: input.observaciones,
        };
        let entries = run.completar(&mut ledger, &requirements, resultados, Utc::now())?;

        for entry in &entries {
            append_consumption(&mut tx, entry, Some(user_id)).await?;
        }
        save_run_transition(&mut tx, &run, previous).await?;

        tx.commit().await?;

        tracing::info!(
            run_id = %run.id,
            project_id = %run.project_id,
            insumos = entries.len(),
            "production run completed"
        );
        Ok(run)
    }

    /// pendiente | en_progreso -> cancelada; releases the run's reservation.
    ///
    /// Writes no ledger entries, but is refused while the project's
    /// consumption (through positive adjustments) already draws on the
    /// capacity the run reserves.
    pub async fn cancel_run(&self, run_id: Uuid) -> AppResult<ProductionRun> {
        let mut tx = self.db.begin().await?;

        let mut run = load_run_for_update(&mut tx, run_id).await?;
        let previous = run.estado;
        run.check(Transition::Cancelar)?;

        let requirements = load_mix_requirements(&mut tx, &[run.mix_id])
            .await?
            .remove(&run.mix_id)
            .unwrap_or_default();
        let insumo_ids: Vec<Uuid> = requirements.per_batch().keys().copied().collect();

        lock_ledger_keys(&mut tx, run.project_id, &insumo_ids).await?;
        let mut ledger = load_ledger(&mut tx, run.project_id).await?;
        ledger.release(run.estado, run.cantidad_lotes, &requirements)?;

        run.cancelar(Utc::now())?;
        save_run_transition(&mut tx, &run, previous).await?;

        tx.commit().await?;

        tracing::info!(run_id = %run.id, from = %previous, to = %run.estado, "production run cancelled");
        Ok(run)
    }
}

async fn load_run_for_update(conn: &mut PgConnection, run_id: Uuid) -> AppResult<ProductionRun> {
    let query = format!("SELECT {} FROM producciones WHERE id = $1 FOR UPDATE", RUN_COLUMNS);
    sqlx::query_as::<_, ProductionRow>(&query)
        .bind(run_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Production run".to_string()))?
        .try_into()
}

/// Write a transition only if the stored status is still `previous`
async fn save_run_transition(
    conn: &mut PgConnection,
    run: &ProductionRun,
    previous: ProductionStatus,
) -> AppResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE producciones
        SET estado = $2, fecha_inicio = $3, fecha_fin = $4, cantidad_producida = $5,
            observaciones = $6, updated_at = $7
        WHERE id = $1 AND estado = $8
        "#,
    )
    .bind(run.id)
    .bind(run.estado.as_str())
    .bind(run.fecha_inicio)
    .bind(run.fecha_fin)
    .bind(run.cantidad_producida)
    .bind(&run.observaciones)
    .bind(run.updated_at)
    .bind(previous.as_str())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(run_id = %run.id, expected = %previous, "production run status changed concurrently");
        return Err(AppError::Conflict {
            resource: "estado".to_string(),
            message: "The production run was modified by another request".to_string(),
            message_es: "La producción fue modificada por otra solicitud".to_string(),
        });
    }
    Ok(())
}
