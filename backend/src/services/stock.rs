//! Laboratory stock service for tracking input movements and balances
//!
//! Balances are held per input in the base unit of the input's catalog unit.
//! A movement locks the balance row, applies the movement and records it with
//! the resulting balance in one transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{apply_movement, MovementDirection, Pagination, StockBalance, StockMovement, Unit};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Stock service for laboratory input movements
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct BalanceRow {
    insumo_id: Uuid,
    cantidad: Decimal,
    unidad: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BalanceRow> for StockBalance {
    type Error = AppError;

    fn try_from(row: BalanceRow) -> Result<Self, Self::Error> {
        Ok(StockBalance {
            insumo_id: row.insumo_id,
            cantidad: row.cantidad,
            unidad: row.unidad.parse()?,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    insumo_id: Uuid,
    direccion: String,
    cantidad: Decimal,
    unidad: String,
    cantidad_base: Decimal,
    saldo_resultante: Decimal,
    motivo: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(StockMovement {
            id: row.id,
            insumo_id: row.insumo_id,
            direccion: row.direccion.parse()?,
            cantidad: row.cantidad,
            unidad: row.unidad.parse()?,
            cantidad_base: row.cantidad_base,
            saldo_resultante: row.saldo_resultante,
            motivo: row.motivo,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

/// Input for recording a stock movement
#[derive(Debug, Deserialize, Validate)]
pub struct RecordMovementInput {
    pub insumo_id: Uuid,
    pub direccion: MovementDirection,
    #[validate(custom = "shared::validate_positive_field")]
    pub cantidad: Decimal,
    #[validate(custom = "shared::validate_unit_field")]
    pub unidad: String,
    #[validate(length(max = 500))]
    pub motivo: Option<String>,
}

impl StockService {
    /// Create a new StockService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record an entry or exit; exits beyond the balance are rejected
    pub async fn record_movement(
        &self,
        user_id: Uuid,
        input: RecordMovementInput,
    ) -> AppResult<StockMovement> {
        input.validate()?;
        let unidad: Unit = input.unidad.parse()?;

        let mut tx = self.db.begin().await?;

        let catalog_unit: Unit = sqlx::query_scalar::<_, String>("SELECT unidad FROM insumos WHERE id = $1")
            .bind(input.insumo_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Input".to_string()))?
            .parse()?;
        let base_unit = catalog_unit.base();
        let cantidad_base = shared::convert(input.cantidad, unidad, base_unit)?;

        sqlx::query(
            r#"
            INSERT INTO stock_insumos (insumo_id, cantidad, unidad)
            VALUES ($1, 0, $2)
            ON CONFLICT (insumo_id) DO NOTHING
            "#,
        )
        .bind(input.insumo_id)
        .bind(base_unit.symbol())
        .execute(&mut *tx)
        .await?;

        let balance = sqlx::query_scalar::<_, Decimal>(
            "SELECT cantidad FROM stock_insumos WHERE insumo_id = $1 FOR UPDATE",
        )
        .bind(input.insumo_id)
        .fetch_one(&mut *tx)
        .await?;

        let saldo = apply_movement(input.insumo_id, balance, input.direccion, cantidad_base)?;

        sqlx::query("UPDATE stock_insumos SET cantidad = $2, updated_at = now() WHERE insumo_id = $1")
            .bind(input.insumo_id)
            .bind(saldo)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query_as::<_, MovementRow>(
            r#"
            INSERT INTO movimientos_laboratorio (id, insumo_id, direccion, cantidad, unidad,
                                                 cantidad_base, saldo_resultante, motivo, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, insumo_id, direccion, cantidad, unidad, cantidad_base,
                      saldo_resultante, motivo, created_by, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.insumo_id)
        .bind(input.direccion.as_str())
        .bind(input.cantidad)
        .bind(unidad.symbol())
        .bind(cantidad_base)
        .bind(saldo)
        .bind(&input.motivo)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            insumo_id = %input.insumo_id,
            direccion = %input.direccion.as_str(),
            cantidad_base = %cantidad_base,
            saldo = %saldo,
            "stock movement recorded"
        );
        row.try_into()
    }

    /// Current balance of every input that has had a movement
    pub async fn list_balances(&self) -> AppResult<Vec<StockBalance>> {
        let rows = sqlx::query_as::<_, BalanceRow>(
            r#"
            SELECT s.insumo_id, s.cantidad, s.unidad, s.updated_at
            FROM stock_insumos s
            JOIN insumos i ON i.id = s.insumo_id
            ORDER BY i.nombre
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockBalance::try_from).collect()
    }

    /// Movements of one input, newest first
    pub async fn list_movements(
        &self,
        insumo_id: Uuid,
        pagination: Pagination,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, insumo_id, direccion, cantidad, unidad, cantidad_base,
                   saldo_resultante, motivo, created_by, created_at
            FROM movimientos_laboratorio
            WHERE insumo_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(insumo_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockMovement::try_from).collect()
    }
}
