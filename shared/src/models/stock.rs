//! Laboratory stock models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult, UnknownVariant};
use crate::units::Unit;

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MovementDirection {
    Entrada,
    Salida,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::Entrada => "entrada",
            MovementDirection::Salida => "salida",
        }
    }
}

impl FromStr for MovementDirection {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrada" => Ok(MovementDirection::Entrada),
            "salida" => Ok(MovementDirection::Salida),
            _ => Err(UnknownVariant::new("movement direction", s)),
        }
    }
}

/// A laboratory stock movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub insumo_id: Uuid,
    pub direccion: MovementDirection,
    pub cantidad: Decimal,
    pub unidad: Unit,
    pub cantidad_base: Decimal,
    pub saldo_resultante: Decimal,
    pub motivo: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Running stock balance of an input, in its base unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockBalance {
    pub insumo_id: Uuid,
    pub cantidad: Decimal,
    pub unidad: Unit,
    pub updated_at: DateTime<Utc>,
}

/// Apply a movement of `amount_base` to `balance`, rejecting overdrafts
pub fn apply_movement(
    insumo_id: Uuid,
    balance: Decimal,
    direction: MovementDirection,
    amount_base: Decimal,
) -> DomainResult<Decimal> {
    crate::validation::validate_positive_quantity("cantidad", amount_base)?;

    match direction {
        MovementDirection::Entrada => balance
            .checked_add(amount_base)
            .ok_or_else(|| crate::validation::quantity_out_of_range("cantidad")),
        MovementDirection::Salida if amount_base > balance => Err(DomainError::InsufficientStock {
            insumo_id,
            requested: amount_base,
            balance,
        }),
        MovementDirection::Salida => Ok(balance - amount_base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entrada_adds() {
        let id = Uuid::new_v4();
        let balance = apply_movement(id, Decimal::from(5), MovementDirection::Entrada, Decimal::from(3));
        assert_eq!(balance, Ok(Decimal::from(8)));
    }

    #[test]
    fn test_salida_to_zero() {
        let id = Uuid::new_v4();
        let balance = apply_movement(id, Decimal::from(5), MovementDirection::Salida, Decimal::from(5));
        assert_eq!(balance, Ok(Decimal::ZERO));
    }

    #[test]
    fn test_salida_overdraft_rejected() {
        let id = Uuid::new_v4();
        let result = apply_movement(id, Decimal::from(5), MovementDirection::Salida, Decimal::from(6));
        assert!(matches!(result, Err(DomainError::InsufficientStock { .. })));
    }
}
