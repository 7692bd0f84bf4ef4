//! Input catalog, recipes and mixes

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainResult, UnitError, UnknownVariant};
use crate::units::{to_base, Unit};
use crate::validation::quantity_out_of_range;

/// Category of a catalog input
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsumoCategory {
    Semilla,
    Sustrato,
    Promotor,
    Capsula,
    Otro,
}

impl InsumoCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsumoCategory::Semilla => "semilla",
            InsumoCategory::Sustrato => "sustrato",
            InsumoCategory::Promotor => "promotor",
            InsumoCategory::Capsula => "capsula",
            InsumoCategory::Otro => "otro",
        }
    }
}

impl FromStr for InsumoCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semilla" => Ok(InsumoCategory::Semilla),
            "sustrato" => Ok(InsumoCategory::Sustrato),
            "promotor" => Ok(InsumoCategory::Promotor),
            "capsula" => Ok(InsumoCategory::Capsula),
            "otro" => Ok(InsumoCategory::Otro),
            _ => Err(UnknownVariant::new("input category", s)),
        }
    }
}

/// A catalog item consumed in production
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insumo {
    pub id: Uuid,
    pub nombre: String,
    pub categoria: InsumoCategory,
    /// Unit the input is catalogued in; ledgers track its base unit
    pub unidad: Unit,
    pub descripcion: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A named formula of input quantities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: Uuid,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub insumos: Vec<RecipeInput>,
    pub created_at: DateTime<Utc>,
}

/// One input line of a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInput {
    pub insumo_id: Uuid,
    pub cantidad: Decimal,
    pub unidad: Unit,
}

/// A composition of recipes produced together in batches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mix {
    pub id: Uuid,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub recetas: Vec<RecipeInMix>,
    pub created_at: DateTime<Utc>,
}

/// A recipe's per-batch multiplier within a mix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeInMix {
    pub receta_id: Uuid,
    pub cantidad: Decimal,
}

/// Flattened mix row: one recipe line of one recipe in a mix
#[derive(Debug, Clone)]
pub struct MixComponent {
    pub receta_id: Uuid,
    pub insumo_id: Uuid,
    /// Quantity of the input per unit of recipe
    pub cantidad: Decimal,
    pub unidad: Unit,
    /// Recipe multiplier within the mix
    pub cantidad_en_mezcla: Decimal,
    /// Catalog unit of the input
    pub insumo_unidad: Unit,
}

/// Required quantity of one input, in its base unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RequirementLine {
    pub insumo_id: Uuid,
    pub cantidad: Decimal,
    pub unidad: Unit,
}

/// Per-batch input requirements of a mix, aggregated per input in base units
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MixRequirements {
    per_batch: BTreeMap<Uuid, Decimal>,
    units: BTreeMap<Uuid, Unit>,
}

impl MixRequirements {
    /// Aggregate mix rows into per-batch requirements.
    ///
    /// Fails if a recipe line is expressed in a unit of a different dimension
    /// than its input's catalog unit.
    pub fn from_components(components: &[MixComponent]) -> DomainResult<Self> {
        let mut requirements = Self::default();

        for c in components {
            crate::validation::validate_positive_quantity("cantidad", c.cantidad)?;
            crate::validation::validate_positive_quantity("cantidad_en_mezcla", c.cantidad_en_mezcla)?;

            if c.unidad.dimension() != c.insumo_unidad.dimension() {
                return Err(UnitError::IncompatibleDimension {
                    from: c.unidad.symbol().to_string(),
                    to: c.insumo_unidad.symbol().to_string(),
                }
                .into());
            }

            let amount = c
                .cantidad
                .checked_mul(c.cantidad_en_mezcla)
                .ok_or_else(|| quantity_out_of_range("cantidad"))?;
            let (base, base_unit) = to_base(amount, c.unidad)?;
            let total = requirements.per_batch.entry(c.insumo_id).or_insert(Decimal::ZERO);
            *total = total
                .checked_add(base)
                .ok_or_else(|| quantity_out_of_range("cantidad"))?;
            requirements.units.insert(c.insumo_id, base_unit);
        }

        Ok(requirements)
    }

    pub fn is_empty(&self) -> bool {
        self.per_batch.is_empty()
    }

    pub fn per_batch(&self) -> &BTreeMap<Uuid, Decimal> {
        &self.per_batch
    }

    pub fn base_unit(&self, insumo_id: &Uuid) -> Option<Unit> {
        self.units.get(insumo_id).copied()
    }

    /// Requirements for `cantidad_lotes` batches, ordered by input id
    pub fn scaled(&self, cantidad_lotes: Decimal) -> DomainResult<Vec<RequirementLine>> {
        self.per_batch
            .iter()
            .zip(self.units.values())
            .map(|((insumo_id, per_batch), unidad)| {
                let cantidad = per_batch
                    .checked_mul(cantidad_lotes)
                    .ok_or_else(|| quantity_out_of_range("cantidad_lotes"))?;
                Ok(RequirementLine {
                    insumo_id: *insumo_id,
                    cantidad,
                    unidad: *unidad,
                })
            })
            .collect()
    }
}
