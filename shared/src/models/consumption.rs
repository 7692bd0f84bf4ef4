//! Consumption ledger entries

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UnknownVariant;
use crate::units::Unit;

/// Kind of ledger entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionKind {
    /// Written when a production run completes
    Consumo,
    /// Signed correction entered by an administrator
    Ajuste,
}

impl ConsumptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumptionKind::Consumo => "consumo",
            ConsumptionKind::Ajuste => "ajuste",
        }
    }
}

impl FromStr for ConsumptionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consumo" => Ok(ConsumptionKind::Consumo),
            "ajuste" => Ok(ConsumptionKind::Ajuste),
            _ => Err(UnknownVariant::new("consumption kind", s)),
        }
    }
}

/// An immutable ledger entry for one input of one project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionEntry {
    pub id: Uuid,
    pub project_id: Uuid,
    pub insumo_id: Uuid,
    pub production_run_id: Option<Uuid>,
    pub tipo: ConsumptionKind,
    /// Amount as registered
    pub cantidad: Decimal,
    pub unidad: Unit,
    /// Amount in the base unit of its dimension; negative only for adjustments
    pub cantidad_base: Decimal,
    pub unidad_base: Unit,
    pub motivo: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Availability of one input for a project, in base units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AvailabilityLine {
    pub insumo_id: Uuid,
    pub unidad: Unit,
    pub requerido: Decimal,
    pub consumido: Decimal,
    /// Clamped at zero; see `overdrawn`
    pub disponible: Decimal,
    /// Consumed exceeds required: a data-integrity fault, not a normal state
    pub overdrawn: bool,
}
