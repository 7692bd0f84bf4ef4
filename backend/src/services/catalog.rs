//! Input catalog and recipe service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{Insumo, InsumoCategory, Recipe, RecipeInput, Unit};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Catalog service for inputs and recipes
#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Database row for an input
#[derive(Debug, sqlx::FromRow)]
struct InsumoRow {
    id: Uuid,
    nombre: String,
    categoria: String,
    unidad: String,
    descripcion: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<InsumoRow> for Insumo {
    type Error = AppError;

    fn try_from(row: InsumoRow) -> Result<Self, Self::Error> {
        Ok(Insumo {
            id: row.id,
            nombre: row.nombre,
            categoria: row.categoria.parse()?,
            unidad: row.unidad.parse()?,
            descripcion: row.descripcion,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RecipeRow {
    id: Uuid,
    nombre: String,
    descripcion: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct RecipeInputRow {
    insumo_id: Uuid,
    cantidad: Decimal,
    unidad: String,
}

/// Input for creating a catalog input
#[derive(Debug, Deserialize, Validate)]
pub struct CreateInsumoInput {
    #[validate(length(min = 1, max = 200), custom = "shared::validate_not_blank")]
    pub nombre: String,
    pub categoria: InsumoCategory,
    #[validate(custom = "shared::validate_unit_field")]
    pub unidad: String,
    pub descripcion: Option<String>,
}

/// Input for creating a recipe
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRecipeInput {
    #[validate(length(min = 1, max = 200), custom = "shared::validate_not_blank")]
    pub nombre: String,
    pub descripcion: Option<String>,
    #[serde(default)]
    #[validate]
    pub insumos: Vec<RecipeLineInput>,
}

/// One input line of a recipe; re-setting an existing input replaces its quantity
#[derive(Debug, Deserialize, Validate)]
pub struct RecipeLineInput {
    pub insumo_id: Uuid,
    #[validate(custom = "shared::validate_positive_field")]
    pub cantidad: Decimal,
    #[validate(custom = "shared::validate_unit_field")]
    pub unidad: String,
}

impl CatalogService {
    /// Create a new CatalogService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Add an input to the catalog
    pub async fn create_insumo(&self, input: CreateInsumoInput) -> AppResult<Insumo> {
        input.validate()?;
        let unidad: Unit = input.unidad.parse()?;

        let row = sqlx::query_as::<_, InsumoRow>(
            r#"
            INSERT INTO insumos (nombre, categoria, unidad, descripcion)
            VALUES ($1, $2, $3, $4)
            RETURNING id, nombre, categoria, unidad, descripcion, created_at
            "#,
        )
        .bind(input.nombre.trim())
        .bind(input.categoria.as_str())
        .bind(unidad.symbol())
        .bind(&input.descripcion)
        .fetch_one(&self.db)
        .await
        .map_err(|e| unique_violation(e, "nombre", "An input with this name already exists", "Ya existe un insumo con ese nombre"))?;

        tracing::info!(insumo_id = %row.id, nombre = %row.nombre, "input created");
        row.try_into()
    }

    pub async fn get_insumo(&self, insumo_id: Uuid) -> AppResult<Insumo> {
        sqlx::query_as::<_, InsumoRow>(
            "SELECT id, nombre, categoria, unidad, descripcion, created_at FROM insumos WHERE id = $1",
        )
        .bind(insumo_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Input".to_string()))?
        .try_into()
    }

    pub async fn list_insumos(&self) -> AppResult<Vec<Insumo>> {
        let rows = sqlx::query_as::<_, InsumoRow>(
            "SELECT id, nombre, categoria, unidad, descripcion, created_at FROM insumos ORDER BY nombre",
        )
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Insumo::try_from).collect()
    }

    /// Create a recipe, optionally with its input lines
    pub async fn create_recipe(&self, input: CreateRecipeInput) -> AppResult<Recipe> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            INSERT INTO recetas (nombre, descripcion)
            VALUES ($1, $2)
            RETURNING id, nombre, descripcion, created_at
            "#,
        )
        .bind(input.nombre.trim())
        .bind(&input.descripcion)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "nombre", "A recipe with this name already exists", "Ya existe una receta con ese nombre"))?;

        for line in &input.insumos {
            upsert_recipe_line(&mut tx, row.id, line).await?;
        }

        tx.commit().await?;

        tracing::info!(receta_id = %row.id, lines = input.insumos.len(), "recipe created");
        self.get_recipe(row.id).await
    }

    /// Set the quantity of an input in a recipe, adding the line if missing
    pub async fn set_recipe_input(
        &self,
        receta_id: Uuid,
        line: RecipeLineInput,
    ) -> AppResult<Recipe> {
        line.validate()?;

        let mut tx = self.db.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM recetas WHERE id = $1)")
            .bind(receta_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(AppError::NotFound("Recipe".to_string()));
        }

        upsert_recipe_line(&mut tx, receta_id, &line).await?;
        tx.commit().await?;

        self.get_recipe(receta_id).await
    }

    pub async fn get_recipe(&self, receta_id: Uuid) -> AppResult<Recipe> {
        let row = sqlx::query_as::<_, RecipeRow>(
            "SELECT id, nombre, descripcion, created_at FROM recetas WHERE id = $1",
        )
        .bind(receta_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Recipe".to_string()))?;

        let lines = sqlx::query_as::<_, RecipeInputRow>(
            r#"
            SELECT insumo_id, cantidad, unidad
            FROM insumos_receta
            WHERE receta_id = $1
            ORDER BY insumo_id
            "#,
        )
        .bind(receta_id)
        .fetch_all(&self.db)
        .await?;

        let insumos = lines
            .into_iter()
            .map(|l| {
                Ok(RecipeInput {
                    insumo_id: l.insumo_id,
                    cantidad: l.cantidad,
                    unidad: l.unidad.parse()?,
                })
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Recipe {
            id: row.id,
            nombre: row.nombre,
            descripcion: row.descripcion,
            insumos,
            created_at: row.created_at,
        })
    }

    /// List recipes without their lines
    pub async fn list_recipes(&self) -> AppResult<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(
            "SELECT id, nombre, descripcion, created_at FROM recetas ORDER BY nombre",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Recipe {
                id: r.id,
                nombre: r.nombre,
                descripcion: r.descripcion,
                insumos: Vec::new(),
                created_at: r.created_at,
            })
            .collect())
    }
}

/// Insert or replace a recipe line after checking the unit against the input's catalog unit
async fn upsert_recipe_line(
    conn: &mut sqlx::PgConnection,
    receta_id: Uuid,
    line: &RecipeLineInput,
) -> AppResult<()> {
    let catalog_unit = sqlx::query_scalar::<_, String>("SELECT unidad FROM insumos WHERE id = $1")
        .bind(line.insumo_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Input".to_string()))?;

    let unidad: Unit = line.unidad.parse()?;
    let catalog_unit: Unit = catalog_unit.parse()?;
    shared::convert(Decimal::ONE, unidad, catalog_unit)?;

    sqlx::query(
        r#"
        INSERT INTO insumos_receta (receta_id, insumo_id, cantidad, unidad)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (receta_id, insumo_id)
        DO UPDATE SET cantidad = EXCLUDED.cantidad, unidad = EXCLUDED.unidad
        "#,
    )
    .bind(receta_id)
    .bind(line.insumo_id)
    .bind(line.cantidad)
    .bind(unidad.symbol())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Map a unique-constraint violation to a conflict, passing other errors through
pub(crate) fn unique_violation(
    err: sqlx::Error,
    field: &str,
    message: &str,
    message_es: &str,
) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => AppError::Conflict {
            resource: field.to_string(),
            message: message.to_string(),
            message_es: message_es.to_string(),
        },
        _ => AppError::DatabaseError(err),
    }
}
