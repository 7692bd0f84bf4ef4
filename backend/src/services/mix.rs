//! Mix service: compositions of recipes produced together in batches

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{Mix, MixComponent, MixRequirements, RecipeInMix};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::catalog::unique_violation;

/// Mix service for managing recipe compositions
#[derive(Clone)]
pub struct MixService {
    db: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct MixRow {
    id: Uuid,
    nombre: String,
    descripcion: Option<String>,
    created_at: DateTime<Utc>,
}

/// One recipe line of one recipe in a mix, joined with the input's catalog unit
#[derive(Debug, sqlx::FromRow)]
struct MixComponentRow {
    mezcla_id: Uuid,
    receta_id: Uuid,
    insumo_id: Uuid,
    cantidad: Decimal,
    unidad: String,
    cantidad_en_mezcla: Decimal,
    insumo_unidad: String,
}

impl TryFrom<MixComponentRow> for MixComponent {
    type Error = AppError;

    fn try_from(row: MixComponentRow) -> Result<Self, Self::Error> {
        Ok(MixComponent {
            receta_id: row.receta_id,
            insumo_id: row.insumo_id,
            cantidad: row.cantidad,
            unidad: row.unidad.parse()?,
            cantidad_en_mezcla: row.cantidad_en_mezcla,
            insumo_unidad: row.insumo_unidad.parse()?,
        })
    }
}

/// Input for creating a mix
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMixInput {
    #[validate(length(min = 1, max = 200), custom = "shared::validate_not_blank")]
    pub nombre: String,
    pub descripcion: Option<String>,
    #[serde(default)]
    #[validate]
    pub recetas: Vec<RecipeInMixInput>,
}

/// Per-batch multiplier for a recipe; re-adding a recipe replaces its quantity
#[derive(Debug, Deserialize, Validate)]
pub struct RecipeInMixInput {
    pub receta_id: Uuid,
    #[validate(custom = "shared::validate_positive_field")]
    pub cantidad: Decimal,
}

impl MixService {
    /// Create a new MixService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_mix(&self, input: CreateMixInput) -> AppResult<Mix> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, MixRow>(
            r#"
            INSERT INTO mezclas (nombre, descripcion)
            VALUES ($1, $2)
            RETURNING id, nombre, descripcion, created_at
            "#,
        )
        .bind(input.nombre.trim())
        .bind(&input.descripcion)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "nombre", "A mix with this name already exists", "Ya existe una mezcla con ese nombre"))?;

        for receta in &input.recetas {
            upsert_recipe_in_mix(&mut tx, row.id, receta).await?;
        }

        tx.commit().await?;

        tracing::info!(mezcla_id = %row.id, recetas = input.recetas.len(), "mix created");
        self.get_mix(row.id).await
    }

    /// Add a recipe to a mix or update its quantity
    pub async fn set_recipe_in_mix(
        &self,
        mezcla_id: Uuid,
        input: RecipeInMixInput,
    ) -> AppResult<Mix> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM mezclas WHERE id = $1)")
            .bind(mezcla_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Mix".to_string()));
        }

        upsert_recipe_in_mix(&mut tx, mezcla_id, &input).await?;
        tx.commit().await?;

        self.get_mix(mezcla_id).await
    }

    pub async fn get_mix(&self, mezcla_id: Uuid) -> AppResult<Mix> {
        let row = sqlx::query_as::<_, MixRow>(
            "SELECT id, nombre, descripcion, created_at FROM mezclas WHERE id = $1",
        )
        .bind(mezcla_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Mix".to_string()))?;

        let recetas = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT receta_id, cantidad FROM recetas_en_mezcla WHERE mezcla_id = $1 ORDER BY receta_id",
        )
        .bind(mezcla_id)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|(receta_id, cantidad)| RecipeInMix { receta_id, cantidad })
        .collect();

        Ok(Mix {
            id: row.id,
            nombre: row.nombre,
            descripcion: row.descripcion,
            recetas,
            created_at: row.created_at,
        })
    }

    /// List mixes without their recipes
    pub async fn list_mixes(&self) -> AppResult<Vec<Mix>> {
        let rows = sqlx::query_as::<_, MixRow>(
            "SELECT id, nombre, descripcion, created_at FROM mezclas ORDER BY nombre",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Mix {
                id: r.id,
                nombre: r.nombre,
                descripcion: r.descripcion,
                recetas: Vec::new(),
                created_at: r.created_at,
            })
            .collect())
    }

    /// Per-batch input requirements of a mix
    pub async fn get_requirements(&self, mezcla_id: Uuid) -> AppResult<MixRequirements> {
        let mut conn = self.db.acquire().await?;
        let mut by_mix = load_mix_requirements(&mut conn, &[mezcla_id]).await?;
        Ok(by_mix.remove(&mezcla_id).unwrap_or_default())
    }
}

async fn upsert_recipe_in_mix(
    conn: &mut PgConnection,
    mezcla_id: Uuid,
    input: &RecipeInMixInput,
) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM recetas WHERE id = $1)")
        .bind(input.receta_id)
        .fetch_one(&mut *conn)
        .await?;
    if !exists {
        return Err(AppError::NotFound("Recipe".to_string()));
    }

    sqlx::query(
        r#"
        INSERT INTO recetas_en_mezcla (mezcla_id, receta_id, cantidad)
        VALUES ($1, $2, $3)
        ON CONFLICT (mezcla_id, receta_id)
        DO UPDATE SET cantidad = EXCLUDED.cantidad
        "#,
    )
    .bind(mezcla_id)
    .bind(input.receta_id)
    .bind(input.cantidad)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Load per-batch requirements for each of `mezcla_ids`.
///
/// Mixes with no recipe lines map to empty requirements.
pub(crate) async fn load_mix_requirements(
    conn: &mut PgConnection,
    mezcla_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, MixRequirements>> {
    let rows = sqlx::query_as::<_, MixComponentRow>(
        r#"
        SELECT rm.mezcla_id, rm.receta_id, ir.insumo_id, ir.cantidad, ir.unidad,
               rm.cantidad AS cantidad_en_mezcla, i.unidad AS insumo_unidad
        FROM recetas_en_mezcla rm
        JOIN insumos_receta ir ON ir.receta_id = rm.receta_id
        JOIN insumos i ON i.id = ir.insumo_id
        WHERE rm.mezcla_id = ANY($1)
        "#,
    )
    .bind(mezcla_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut components: HashMap<Uuid, Vec<MixComponent>> = HashMap::new();
    for row in rows {
        let mezcla_id = row.mezcla_id;
        components.entry(mezcla_id).or_default().push(row.try_into()?);
    }

    mezcla_ids
        .iter()
        .map(|id| {
            let requirements = match components.get(id) {
                Some(c) => MixRequirements::from_components(c)?,
                None => MixRequirements::default(),
            };
            Ok((*id, requirements))
        })
        .collect()
}
