//! Availability service: the per-project input consumption ledger
//!
//! Ledger reads that precede a write happen inside the writer's transaction,
//! after taking a transaction-scoped advisory lock for every
//! (project, input) pair involved. Concurrent completions and adjustments on
//! the same pair are thereby serialized; pairs are locked in ascending input
//! order so that two writers never wait on each other in a cycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{AvailabilityLedger, AvailabilityLine, ConsumptionEntry, ProductionStatus, Unit};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::mix::load_mix_requirements;

/// Availability service for project input ledgers
#[derive(Clone)]
pub struct AvailabilityService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct ConsumptionRow {
    id: Uuid,
    project_id: Uuid,
    insumo_id: Uuid,
    production_run_id: Option<Uuid>,
    tipo: String,
    cantidad: Decimal,
    unidad: String,
    cantidad_base: Decimal,
    unidad_base: String,
    motivo: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ConsumptionRow> for ConsumptionEntry {
    type Error = AppError;

    fn try_from(row: ConsumptionRow) -> Result<Self, Self::Error> {
        Ok(ConsumptionEntry {
            id: row.id,
            project_id: row.project_id,
            insumo_id: row.insumo_id,
            production_run_id: row.production_run_id,
            tipo: row.tipo.parse()?,
            cantidad: row.cantidad,
            unidad: row.unidad.parse()?,
            cantidad_base: row.cantidad_base,
            unidad_base: row.unidad_base.parse()?,
            motivo: row.motivo,
            created_at: row.created_at,
        })
    }
}

/// Availability report for a project
#[derive(Debug, Clone, Serialize)]
pub struct ProjectAvailability {
    pub project_id: Uuid,
    pub insumos: Vec<AvailabilityLine>,
    /// True when any input has consumed more than its runs require
    pub integrity_warning: bool,
}

/// Input for a signed ledger correction
#[derive(Debug, Deserialize, Validate)]
pub struct AdjustmentInput {
    pub insumo_id: Uuid,
    /// Positive consumes more, negative returns capacity
    #[validate(custom = "shared::validate_nonzero_field")]
    pub cantidad: Decimal,
    #[validate(custom = "shared::validate_unit_field")]
    pub unidad: String,
    #[validate(length(min = 1, max = 500), custom = "shared::validate_not_blank")]
    pub motivo: String,
}

impl AvailabilityService {
    /// Create a new AvailabilityService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Required, consumed and available quantity per input for a project
    pub async fn get_availability(&self, project_id: Uuid) -> AppResult<ProjectAvailability> {
        let mut conn = self.db.acquire().await?;
        ensure_project(&mut conn, project_id).await?;

        let ledger = load_ledger(&mut conn, project_id).await?;
        let insumos = ledger.compute_available();

        let mut integrity_warning = false;
        for line in insumos.iter().filter(|l| l.overdrawn) {
            integrity_warning = true;
            tracing::warn!(
                project_id = %project_id,
                insumo_id = %line.insumo_id,
                requerido = %line.requerido,
                consumido = %line.consumido,
                "consumption exceeds requirement"
            );
        }

        Ok(ProjectAvailability {
            project_id,
            insumos,
            integrity_warning,
        })
    }

    /// Ledger entries of a project, optionally for one input, newest first
    pub async fn list_consumption(
        &self,
        project_id: Uuid,
        insumo_id: Option<Uuid>,
    ) -> AppResult<Vec<ConsumptionEntry>> {
        let mut conn = self.db.acquire().await?;
        ensure_project(&mut conn, project_id).await?;

        let mut entries = load_consumption_entries(&mut conn, project_id, insumo_id).await?;
        entries.reverse();
        Ok(entries)
    }

    /// Append a signed correction to a project's ledger
    pub async fn register_adjustment(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        input: AdjustmentInput,
    ) -> AppResult<ConsumptionEntry> {
        input.validate()?;
        let unidad: Unit = input.unidad.parse()?;

        let mut tx = self.db.begin().await?;
        ensure_project(&mut tx, project_id).await?;

        lock_ledger_keys(&mut tx, project_id, &[input.insumo_id]).await?;
        let mut ledger = load_ledger(&mut tx, project_id).await?;

        let entry = ledger.register_adjustment(
            input.insumo_id,
            input.cantidad,
            unidad,
            input.motivo.trim().to_string(),
            Utc::now(),
        )?;
        append_consumption(&mut tx, &entry, Some(user_id)).await?;

        tx.commit().await?;

        tracing::info!(
            project_id = %project_id,
            insumo_id = %entry.insumo_id,
            cantidad_base = %entry.cantidad_base,
            "ledger adjustment registered"
        );
        Ok(entry)
    }
}

async fn ensure_project(conn: &mut PgConnection, project_id: Uuid) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM proyectos WHERE id = $1)")
        .bind(project_id)
        .fetch_one(&mut *conn)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound("Project".to_string()))
    }
}

/// Serialize ledger writers per (project, input) for the rest of the transaction
pub(crate) async fn lock_ledger_keys(
    conn: &mut PgConnection,
    project_id: Uuid,
    insumo_ids: &[Uuid],
) -> AppResult<()> {
    let mut keys = insumo_ids.to_vec();
    keys.sort();
    keys.dedup();

    for insumo_id in keys {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(ledger_lock_key(project_id, insumo_id))
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

pub(crate) fn ledger_lock_key(project_id: Uuid, insumo_id: Uuid) -> String {
    format!("consumo:{}:{}", project_id, insumo_id)
}

/// Build a project's ledger from its runs and stored entries
pub(crate) async fn load_ledger(
    conn: &mut PgConnection,
    project_id: Uuid,
) -> AppResult<AvailabilityLedger> {
    let runs = sqlx::query_as::<_, (Uuid, String, Decimal)>(
        r#"
        SELECT mezcla_id, estado, cantidad_lotes
        FROM producciones
        WHERE project_id = $1 AND estado <> 'cancelada'
        "#,
    )
    .bind(project_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut mezcla_ids: Vec<Uuid> = runs.iter().map(|(id, _, _)| *id).collect();
    mezcla_ids.sort();
    mezcla_ids.dedup();
    let requirements = load_mix_requirements(conn, &mezcla_ids).await?;

    let mut ledger = AvailabilityLedger::new(project_id);
    for (mezcla_id, estado, cantidad_lotes) in runs {
        let estado: ProductionStatus = estado.parse()?;
        if let Some(req) = requirements.get(&mezcla_id) {
            ledger.reserve(estado, cantidad_lotes, req)?;
        }
    }

    for entry in load_consumption_entries(conn, project_id, None).await? {
        ledger.record(&entry)?;
    }

    Ok(ledger)
}

/// Stored entries of a project, oldest first
pub(crate) async fn load_consumption_entries(
    conn: &mut PgConnection,
    project_id: Uuid,
    insumo_id: Option<Uuid>,
) -> AppResult<Vec<ConsumptionEntry>> {
    let rows = sqlx::query_as::<_, ConsumptionRow>(
        r#"
        SELECT id, project_id, insumo_id, production_run_id, tipo, cantidad, unidad,
               cantidad_base, unidad_base, motivo, created_at
        FROM consumos
        WHERE project_id = $1 AND ($2::uuid IS NULL OR insumo_id = $2)
        ORDER BY created_at, id
        "#,
    )
    .bind(project_id)
    .bind(insumo_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(ConsumptionEntry::try_from).collect()
}

pub(crate) async fn append_consumption(
    conn: &mut PgConnection,
    entry: &ConsumptionEntry,
    created_by: Option<Uuid>,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO consumos (id, project_id, insumo_id, production_run_id, tipo, cantidad, unidad,
                              cantidad_base, unidad_base, motivo, created_by, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(entry.id)
    .bind(entry.project_id)
    .bind(entry.insumo_id)
    .bind(entry.production_run_id)
    .bind(entry.tipo.as_str())
    .bind(entry.cantidad)
    .bind(entry.unidad.symbol())
    .bind(entry.cantidad_base)
    .bind(entry.unidad_base.symbol())
    .bind(&entry.motivo)
    .bind(created_by)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_key_is_per_pair() {
        let project = Uuid::new_v4();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ledger_lock_key(project, a), ledger_lock_key(project, a));
        assert_ne!(ledger_lock_key(project, a), ledger_lock_key(project, b));
        assert_ne!(ledger_lock_key(project, a), ledger_lock_key(Uuid::new_v4(), a));
    }
}
