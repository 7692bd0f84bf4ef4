//! Availability ledger
//!
//! Tracks, per project and input, how much the project's non-cancelled runs
//! require and how much completed runs (plus adjustments) have consumed. All
//! amounts are held in the input's base unit.
//!
//! The ledger enforces `consumed <= required` for every input on every
//! registration. It is an in-memory view: callers load it from storage and
//! must serialize registrations for the same (project, input) pair across
//! requests (the backend holds a transaction-scoped lock while it is in use).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult, UnitError};
use crate::models::{
    AvailabilityLine, ConsumptionEntry, ConsumptionKind, MixRequirements, ProductionStatus,
    RequirementLine,
};
use crate::units::{to_base, Unit};
use crate::validation::quantity_out_of_range;

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityLedger {
    project_id: Uuid,
    required: BTreeMap<Uuid, Decimal>,
    consumed: BTreeMap<Uuid, Decimal>,
    units: BTreeMap<Uuid, Unit>,
}

impl AvailabilityLedger {
    pub fn new(project_id: Uuid) -> Self {
        Self {
            project_id,
            required: BTreeMap::new(),
            consumed: BTreeMap::new(),
            units: BTreeMap::new(),
        }
    }

    pub fn project_id(&self) -> Uuid {
        self.project_id
    }

    /// Add a run's reservation. Cancelled runs contribute nothing.
    pub fn reserve(
        &mut self,
        estado: ProductionStatus,
        cantidad_lotes: Decimal,
        requirements: &MixRequirements,
    ) -> DomainResult<()> {
        if !estado.reserves_capacity() {
            return Ok(());
        }
        for line in requirements.scaled(cantidad_lotes)? {
            let required = self.required.entry(line.insumo_id).or_insert(Decimal::ZERO);
            *required = required
                .checked_add(line.cantidad)
                .ok_or_else(|| quantity_out_of_range("cantidad_lotes"))?;
            self.units.insert(line.insumo_id, line.unidad);
        }
        Ok(())
    }

    /// Drop a run's reservation, as cancelling it does.
    ///
    /// Fails with `InsufficientAvailability` if an input's consumption already
    /// draws on the capacity being released; the ledger is unchanged on failure.
    pub fn release(
        &mut self,
        estado: ProductionStatus,
        cantidad_lotes: Decimal,
        requirements: &MixRequirements,
    ) -> DomainResult<()> {
        if !estado.reserves_capacity() {
            return Ok(());
        }
        let lines = requirements.scaled(cantidad_lotes)?;
        for line in &lines {
            let remaining = self.remaining_for(&line.insumo_id);
            if remaining < line.cantidad {
                return Err(DomainError::InsufficientAvailability {
                    insumo_id: line.insumo_id,
                    requested: line.cantidad,
                    available: remaining.max(Decimal::ZERO),
                });
            }
        }
        for line in lines {
            if let Some(required) = self.required.get_mut(&line.insumo_id) {
                *required -= line.cantidad;
            }
        }
        Ok(())
    }

    /// Replay a stored entry
    pub fn record(&mut self, entry: &ConsumptionEntry) -> DomainResult<()> {
        self.check_unit(entry.insumo_id, entry.unidad_base)?;
        let consumed = self.consumed.entry(entry.insumo_id).or_insert(Decimal::ZERO);
        *consumed = consumed
            .checked_add(entry.cantidad_base)
            .ok_or_else(|| quantity_out_of_range("cantidad_base"))?;
        self.units.entry(entry.insumo_id).or_insert(entry.unidad_base);
        Ok(())
    }

    /// Total required per input across all reserving runs
    pub fn compute_total_required(&self) -> &BTreeMap<Uuid, Decimal> {
        &self.required
    }

    /// Net consumed per input across all entries
    pub fn compute_consumed(&self) -> &BTreeMap<Uuid, Decimal> {
        &self.consumed
    }

    pub fn required_for(&self, insumo_id: &Uuid) -> Decimal {
        self.required.get(insumo_id).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn consumed_for(&self, insumo_id: &Uuid) -> Decimal {
        self.consumed.get(insumo_id).copied().unwrap_or(Decimal::ZERO)
    }

    /// Required minus consumed, unclamped
    pub fn remaining_for(&self, insumo_id: &Uuid) -> Decimal {
        self.required_for(insumo_id)
            .checked_sub(self.consumed_for(insumo_id))
            .unwrap_or(Decimal::MIN)
    }

    /// Availability for every input the ledger knows about, ordered by input id
    pub fn compute_available(&self) -> Vec<AvailabilityLine> {
        self.units
            .iter()
            .map(|(insumo_id, unidad)| {
                let requerido = self.required_for(insumo_id);
                let consumido = self.consumed_for(insumo_id);
                let remaining = self.remaining_for(insumo_id);
                AvailabilityLine {
                    insumo_id: *insumo_id,
                    unidad: *unidad,
                    requerido,
                    consumido,
                    disponible: remaining.max(Decimal::ZERO),
                    overdrawn: remaining < Decimal::ZERO,
                }
            })
            .collect()
    }

    /// Register consumption of `amount` of an input.
    ///
    /// Fails with `InsufficientAvailability` if the converted amount would push
    /// consumption above the requirement; the ledger is unchanged on failure.
    pub fn register_consumption(
        &mut self,
        insumo_id: Uuid,
        amount: Decimal,
        unit: Unit,
        production_run_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DomainResult<ConsumptionEntry> {
        crate::validation::validate_positive_quantity("cantidad", amount)?;
        self.check_unit(insumo_id, unit)?;

        let (base, base_unit) = to_base(amount, unit)?;
        let remaining = self.remaining_for(&insumo_id);
        if base > remaining {
            return Err(DomainError::InsufficientAvailability {
                insumo_id,
                requested: base,
                available: remaining.max(Decimal::ZERO),
            });
        }

        Ok(self.append(
            insumo_id,
            ConsumptionKind::Consumo,
            amount,
            unit,
            base,
            base_unit,
            production_run_id,
            None,
            now,
        ))
    }

    /// Register every line or none of them
    pub fn register_all(
        &mut self,
        lines: &[RequirementLine],
        production_run_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<ConsumptionEntry>> {
        let mut staged = self.clone();
        let entries = lines
            .iter()
            .map(|line| {
                staged.register_consumption(
                    line.insumo_id,
                    line.cantidad,
                    line.unidad,
                    production_run_id,
                    now,
                )
            })
            .collect::<DomainResult<Vec<_>>>()?;

        *self = staged;
        Ok(entries)
    }

    /// Register a signed correction.
    ///
    /// Positive adjustments are bounded by the requirement like consumption;
    /// negative ones cannot take net consumption below zero.
    pub fn register_adjustment(
        &mut self,
        insumo_id: Uuid,
        amount: Decimal,
        unit: Unit,
        motivo: String,
        now: DateTime<Utc>,
    ) -> DomainResult<ConsumptionEntry> {
        if amount.is_zero() {
            return Err(DomainError::InvalidQuantity {
                field: "cantidad".to_string(),
                message: "Adjustment cannot be zero".to_string(),
            });
        }
        self.check_unit(insumo_id, unit)?;

        let (base, base_unit) = to_base(amount, unit)?;
        if base > Decimal::ZERO {
            let remaining = self.remaining_for(&insumo_id);
            if base > remaining {
                return Err(DomainError::InsufficientAvailability {
                    insumo_id,
                    requested: base,
                    available: remaining.max(Decimal::ZERO),
                });
            }
        } else if self.consumed_for(&insumo_id) + base < Decimal::ZERO {
            return Err(DomainError::InvalidQuantity {
                field: "cantidad".to_string(),
                message: format!(
                    "Adjustment of {} {} exceeds consumed amount {}",
                    base,
                    base_unit,
                    self.consumed_for(&insumo_id)
                ),
            });
        }

        Ok(self.append(
            insumo_id,
            ConsumptionKind::Ajuste,
            amount,
            unit,
            base,
            base_unit,
            None,
            Some(motivo),
            now,
        ))
    }

    fn check_unit(&self, insumo_id: Uuid, unit: Unit) -> DomainResult<()> {
        match self.units.get(&insumo_id) {
            Some(known) if known.dimension() != unit.dimension() => {
                Err(UnitError::IncompatibleDimension {
                    from: unit.symbol().to_string(),
                    to: known.symbol().to_string(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn append(
        &mut self,
        insumo_id: Uuid,
        tipo: ConsumptionKind,
        cantidad: Decimal,
        unidad: Unit,
        cantidad_base: Decimal,
        unidad_base: Unit,
        production_run_id: Option<Uuid>,
        motivo: Option<String>,
        now: DateTime<Utc>,
    ) -> ConsumptionEntry {
        *self.consumed.entry(insumo_id).or_insert(Decimal::ZERO) += cantidad_base;
        self.units.entry(insumo_id).or_insert(unidad_base);

        ConsumptionEntry {
            id: Uuid::new_v4(),
            project_id: self.project_id,
            insumo_id,
            production_run_id,
            tipo,
            cantidad,
            unidad,
            cantidad_base,
            unidad_base,
            motivo,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MixComponent;

    fn requirements(insumo_id: Uuid, kg_per_batch: i64) -> MixRequirements {
        MixRequirements::from_components(&[MixComponent {
            receta_id: Uuid::new_v4(),
            insumo_id,
            cantidad: Decimal::from(kg_per_batch),
            unidad: Unit::Kilogram,
            cantidad_en_mezcla: Decimal::ONE,
            insumo_unidad: Unit::Kilogram,
        }])
        .unwrap()
    }

    #[test]
    fn test_pending_runs_reserve_capacity() {
        let sustrato = Uuid::new_v4();
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::Pendiente, Decimal::from(3), &requirements(sustrato, 10)).unwrap();

        assert_eq!(ledger.required_for(&sustrato), Decimal::from(30_000));
    }

    #[test]
    fn test_cancelled_runs_reserve_nothing() {
        let sustrato = Uuid::new_v4();
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::Cancelada, Decimal::from(3), &requirements(sustrato, 10)).unwrap();

        assert_eq!(ledger.required_for(&sustrato), Decimal::ZERO);
        assert!(ledger.compute_available().is_empty());
    }

    #[test]
    fn test_register_within_requirement() {
        let sustrato = Uuid::new_v4();
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::EnProgreso, Decimal::ONE, &requirements(sustrato, 10)).unwrap();

        let entry = ledger
            .register_consumption(sustrato, Decimal::from(4), Unit::Kilogram, None, Utc::now())
            .unwrap();
        assert_eq!(entry.cantidad_base, Decimal::from(4_000));
        assert_eq!(entry.unidad_base, Unit::Gram);
        assert_eq!(ledger.remaining_for(&sustrato), Decimal::from(6_000));
    }

    #[test]
    fn test_register_beyond_requirement_fails_without_change() {
        let sustrato = Uuid::new_v4();
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::EnProgreso, Decimal::ONE, &requirements(sustrato, 10)).unwrap();
        let before = ledger.clone();

        let err = ledger
            .register_consumption(sustrato, Decimal::from(10_001), Unit::Gram, None, Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientAvailability {
                insumo_id: sustrato,
                requested: Decimal::from(10_001),
                available: Decimal::from(10_000),
            }
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_register_wrong_dimension() {
        let sustrato = Uuid::new_v4();
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::EnProgreso, Decimal::ONE, &requirements(sustrato, 10)).unwrap();

        let err = ledger
            .register_consumption(sustrato, Decimal::ONE, Unit::Liter, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::Unit(UnitError::IncompatibleDimension { .. })));
    }

    #[test]
    fn test_register_all_is_all_or_nothing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::EnProgreso, Decimal::ONE, &requirements(a, 1)).unwrap();
        ledger.reserve(ProductionStatus::EnProgreso, Decimal::ONE, &requirements(b, 1)).unwrap();
        let before = ledger.clone();

        let lines = [
            RequirementLine { insumo_id: a, cantidad: Decimal::from(1_000), unidad: Unit::Gram },
            RequirementLine { insumo_id: b, cantidad: Decimal::from(1_001), unidad: Unit::Gram },
        ];
        assert!(ledger.register_all(&lines, None, Utc::now()).is_err());
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_negative_adjustment_frees_capacity() {
        let sustrato = Uuid::new_v4();
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::EnProgreso, Decimal::ONE, &requirements(sustrato, 10)).unwrap();
        ledger
            .register_consumption(sustrato, Decimal::from(10), Unit::Kilogram, None, Utc::now())
            .unwrap();

        let entry = ledger
            .register_adjustment(
                sustrato,
                Decimal::from(-2),
                Unit::Kilogram,
                "bolsa devuelta".to_string(),
                Utc::now(),
            )
            .unwrap();
        assert_eq!(entry.tipo, ConsumptionKind::Ajuste);
        assert_eq!(ledger.remaining_for(&sustrato), Decimal::from(2_000));
    }

    #[test]
    fn test_negative_adjustment_cannot_go_below_zero() {
        let sustrato = Uuid::new_v4();
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::EnProgreso, Decimal::ONE, &requirements(sustrato, 10)).unwrap();

        let result = ledger.register_adjustment(
            sustrato,
            Decimal::from(-1),
            Unit::Gram,
            "error".to_string(),
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::InvalidQuantity { .. })));
    }

    #[test]
    fn test_overdrawn_is_reported_clamped() {
        let sustrato = Uuid::new_v4();
        let project_id = Uuid::new_v4();
        let mut ledger = AvailabilityLedger::new(project_id);
        ledger
            .record(&ConsumptionEntry {
                id: Uuid::new_v4(),
                project_id,
                insumo_id: sustrato,
                production_run_id: None,
                tipo: ConsumptionKind::Consumo,
                cantidad: Decimal::from(5),
                unidad: Unit::Gram,
                cantidad_base: Decimal::from(5),
                unidad_base: Unit::Gram,
                motivo: None,
                created_at: Utc::now(),
            })
            .unwrap();

        let lines = ledger.compute_available();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].disponible, Decimal::ZERO);
        assert!(lines[0].overdrawn);
    }

    #[test]
    fn test_release_drops_reservation() {
        let sustrato = Uuid::new_v4();
        let req = requirements(sustrato, 10);
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::Pendiente, Decimal::from(3), &req).unwrap();

        ledger.release(ProductionStatus::Pendiente, Decimal::from(3), &req).unwrap();
        assert_eq!(ledger.required_for(&sustrato), Decimal::ZERO);
    }

    #[test]
    fn test_release_rejected_when_adjustment_draws_on_it() {
        let sustrato = Uuid::new_v4();
        let req = requirements(sustrato, 10);
        let mut ledger = AvailabilityLedger::new(Uuid::new_v4());
        ledger.reserve(ProductionStatus::Pendiente, Decimal::from(3), &req).unwrap();
        ledger
            .register_adjustment(
                sustrato,
                Decimal::from(10),
                Unit::Kilogram,
                "merma en vivero".to_string(),
                Utc::now(),
            )
            .unwrap();
        let before = ledger.clone();

        let err = ledger
            .release(ProductionStatus::Pendiente, Decimal::from(3), &req)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientAvailability {
                insumo_id: sustrato,
                requested: Decimal::from(30_000),
                available: Decimal::from(20_000),
            }
        );
        assert_eq!(ledger, before);
    }
}
