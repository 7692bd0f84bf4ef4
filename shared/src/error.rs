//! Domain errors raised by the production core

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{ProductionStatus, Transition};

/// Unit conversion failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("Unsupported unit: {0}")]
    UnsupportedUnit(String),

    #[error("Incompatible units: cannot convert {from} to {to}")]
    IncompatibleDimension { from: String, to: String },

    #[error("Quantity {amount} {unit} is out of range")]
    Overflow { amount: String, unit: String },
}

/// A stored code that matches no variant of a domain enum
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Business rule violations in the production core
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Cannot {action} a production run in status {from}")]
    InvalidTransition {
        from: ProductionStatus,
        action: Transition,
    },

    #[error("Insufficient availability for input {insumo_id}: requested {requested}, available {available}")]
    InsufficientAvailability {
        insumo_id: Uuid,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Insufficient stock for input {insumo_id}: requested {requested}, balance {balance}")]
    InsufficientStock {
        insumo_id: Uuid,
        requested: Decimal,
        balance: Decimal,
    },

    #[error("Invalid quantity for {field}: {message}")]
    InvalidQuantity { field: String, message: String },

    #[error(transparent)]
    Unit(#[from] UnitError),
}

pub type DomainResult<T> = Result<T, DomainError>;
