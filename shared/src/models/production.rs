//! Production run lifecycle
//!
//! A run moves `pendiente -> en_progreso -> completada`, or is cancelled from
//! either non-terminal state. Consumption is written only on completion, and
//! only through the availability ledger.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ConsumptionEntry, MixRequirements};
use crate::error::{DomainError, DomainResult, UnknownVariant};
use crate::ledger::AvailabilityLedger;

/// Status of a production run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    Pendiente,
    EnProgreso,
    Completada,
    Cancelada,
}

impl ProductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStatus::Pendiente => "pendiente",
            ProductionStatus::EnProgreso => "en_progreso",
            ProductionStatus::Completada => "completada",
            ProductionStatus::Cancelada => "cancelada",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProductionStatus::Completada | ProductionStatus::Cancelada)
    }

    /// Whether a run in this status counts toward the project's required inputs.
    /// Pending runs reserve capacity as soon as they exist.
    pub fn reserves_capacity(&self) -> bool {
        !matches!(self, ProductionStatus::Cancelada)
    }
}

impl FromStr for ProductionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pendiente" => Ok(ProductionStatus::Pendiente),
            "en_progreso" => Ok(ProductionStatus::EnProgreso),
            "completada" => Ok(ProductionStatus::Completada),
            "cancelada" => Ok(ProductionStatus::Cancelada),
            _ => Err(UnknownVariant::new("production status", s)),
        }
    }
}

impl fmt::Display for ProductionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations that move a run between statuses
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Iniciar,
    Completar,
    Cancelar,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transition::Iniciar => "iniciar",
            Transition::Completar => "completar",
            Transition::Cancelar => "cancelar",
        }
    }

    pub fn target(&self) -> ProductionStatus {
        match self {
            Transition::Iniciar => ProductionStatus::EnProgreso,
            Transition::Completar => ProductionStatus::Completada,
            Transition::Cancelar => ProductionStatus::Cancelada,
        }
    }

    pub fn is_allowed_from(&self, status: ProductionStatus) -> bool {
        match self {
            Transition::Iniciar => status == ProductionStatus::Pendiente,
            Transition::Completar => status == ProductionStatus::EnProgreso,
            Transition::Cancelar => !status.is_terminal(),
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution of a mix for a project, scaled by batch count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionRun {
    pub id: Uuid,
    pub project_id: Uuid,
    pub mix_id: Uuid,
    pub cantidad_lotes: Decimal,
    pub estado: ProductionStatus,
    pub fecha_inicio: Option<DateTime<Utc>>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub cantidad_producida: Option<Decimal>,
    pub observaciones: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome data recorded when a run completes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompletionResults {
    pub cantidad_producida: Option<Decimal>,
    pub observaciones: Option<String>,
}

impl ProductionRun {
    /// Create a pending run
    pub fn new(
        project_id: Uuid,
        mix_id: Uuid,
        cantidad_lotes: Decimal,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        crate::validation::validate_batch_count(cantidad_lotes)?;

        Ok(Self {
            id: Uuid::new_v4(),
            project_id,
            mix_id,
            cantidad_lotes,
            estado: ProductionStatus::Pendiente,
            fecha_inicio: None,
            fecha_fin: None,
            cantidad_producida: None,
            observaciones: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Validate a transition against the current status and return the target status
    pub fn check(&self, transition: Transition) -> DomainResult<ProductionStatus> {
        if transition.is_allowed_from(self.estado) {
            Ok(transition.target())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.estado,
                action: transition,
            })
        }
    }

    pub fn iniciar(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.estado = self.check(Transition::Iniciar)?;
        self.fecha_inicio = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancelar(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        self.estado = self.check(Transition::Cancelar)?;
        self.fecha_fin = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Complete the run, registering its input consumption in `ledger`.
    ///
    /// Either every input of the mix is registered and the run becomes
    /// `completada`, or nothing changes: neither the ledger nor the run.
    pub fn completar(
        &mut self,
        ledger: &mut AvailabilityLedger,
        requirements: &MixRequirements,
        resultados: CompletionResults,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<ConsumptionEntry>> {
        let target = self.check(Transition::Completar)?;

        let lines = requirements.scaled(self.cantidad_lotes)?;
        let entries = ledger.register_all(&lines, Some(self.id), now)?;

        self.estado = target;
        self.fecha_fin = Some(now);
        self.cantidad_producida = resultados.cantidad_producida;
        self.observaciones = resultados.observaciones;
        self.updated_at = now;

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run() -> ProductionRun {
        ProductionRun::new(Uuid::new_v4(), Uuid::new_v4(), Decimal::from(2), Utc::now()).unwrap()
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            ProductionStatus::Pendiente,
            ProductionStatus::EnProgreso,
            ProductionStatus::Completada,
            ProductionStatus::Cancelada,
        ] {
            assert_eq!(status.as_str().parse::<ProductionStatus>(), Ok(status));
        }
        assert!("archivada".parse::<ProductionStatus>().is_err());
    }

    #[test]
    fn test_new_run_is_pending() {
        let run = run();
        assert_eq!(run.estado, ProductionStatus::Pendiente);
        assert!(run.fecha_inicio.is_none());
        assert!(run.fecha_fin.is_none());
    }

    #[test]
    fn test_new_run_rejects_zero_batches() {
        let result = ProductionRun::new(Uuid::new_v4(), Uuid::new_v4(), Decimal::ZERO, Utc::now());
        assert!(matches!(result, Err(DomainError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_cancel_from_pending() {
        let mut run = run();
        run.cancelar(Utc::now()).unwrap();
        assert_eq!(run.estado, ProductionStatus::Cancelada);
        assert!(run.fecha_fin.is_some());
    }

    #[test]
    fn test_cannot_start_cancelled_run() {
        let mut run = run();
        run.cancelar(Utc::now()).unwrap();
        let err = run.iniciar(Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: ProductionStatus::Cancelada,
                action: Transition::Iniciar,
            }
        );
        assert!(run.fecha_inicio.is_none());
    }

    #[test]
    fn test_transition_table() {
        use ProductionStatus::*;
        assert!(Transition::Iniciar.is_allowed_from(Pendiente));
        assert!(!Transition::Iniciar.is_allowed_from(EnProgreso));
        assert!(Transition::Completar.is_allowed_from(EnProgreso));
        assert!(!Transition::Completar.is_allowed_from(Pendiente));
        assert!(Transition::Cancelar.is_allowed_from(Pendiente));
        assert!(Transition::Cancelar.is_allowed_from(EnProgreso));
        assert!(!Transition::Cancelar.is_allowed_from(Completada));
        assert!(!Transition::Cancelar.is_allowed_from(Cancelada));
    }
}
