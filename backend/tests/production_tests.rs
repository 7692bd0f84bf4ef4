//! Production run lifecycle tests
//!
//! Tests for the run state machine including:
//! - Property 1: Reachable Status Trajectories
//! - Property 2: Completion Requires In-Progress Run
//! - Property 8: Repeated Start Is Rejected

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    AvailabilityLedger, CompletionResults, DomainError, MixComponent, MixRequirements,
    ProductionRun, ProductionStatus, Transition, Unit,
};
use std::str::FromStr;
use uuid::Uuid;

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

/// One input at `kg_per_batch` kilograms per batch
fn single_input_mix(insumo_id: Uuid, kg_per_batch: Decimal) -> MixRequirements {
    MixRequirements::from_components(&[MixComponent {
        receta_id: Uuid::new_v4(),
        insumo_id,
        cantidad: kg_per_batch,
        unidad: Unit::Kilogram,
        cantidad_en_mezcla: Decimal::ONE,
        insumo_unidad: Unit::Kilogram,
    }])
    .unwrap()
}

/// Apply a transition the way the service does, returning the ledger entries written
fn apply(
    run: &mut ProductionRun,
    transition: Transition,
    ledger: &mut AvailabilityLedger,
    requirements: &MixRequirements,
) -> Result<usize, DomainError> {
    let now = Utc::now();
    match transition {
        Transition::Iniciar => run.iniciar(now).map(|_| 0),
        Transition::Cancelar => run.cancelar(now).map(|_| 0),
        Transition::Completar => run
            .completar(ledger, requirements, CompletionResults::default(), now)
            .map(|entries| entries.len()),
    }
}

fn arb_transition() -> impl Strategy<Value = Transition> {
    prop_oneof![
        Just(Transition::Iniciar),
        Just(Transition::Completar),
        Just(Transition::Cancelar),
    ]
}

// ============================================================================
// Property 1: Reachable Status Trajectories
// ============================================================================
// For any sequence of transition requests, the sequence of statuses the run
// actually passes through SHALL be a prefix of pendiente -> en_progreso ->
// completada, pendiente -> en_progreso -> cancelada or pendiente -> cancelada.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn property_1_only_valid_trajectories(
        transitions in prop::collection::vec(arb_transition(), 0..8),
        lotes in 1u32..20,
    ) {
        let insumo = Uuid::new_v4();
        let requirements = single_input_mix(insumo, dec("2.5"));
        let mut run = ProductionRun::new(Uuid::new_v4(), Uuid::new_v4(), Decimal::from(lotes), Utc::now()).unwrap();
        let mut ledger = AvailabilityLedger::new(run.project_id);
        ledger.reserve(run.estado, run.cantidad_lotes, &requirements).unwrap();

        let mut trajectory = vec![run.estado];
        for transition in transitions {
            if apply(&mut run, transition, &mut ledger, &requirements).is_ok() {
                trajectory.push(run.estado);
            }
        }

        use ProductionStatus::*;
        let allowed: [&[ProductionStatus]; 3] = [
            &[Pendiente, EnProgreso, Completada],
            &[Pendiente, EnProgreso, Cancelada],
            &[Pendiente, Cancelada],
        ];
        prop_assert!(
            allowed.iter().any(|path| path.starts_with(&trajectory)),
            "unreachable trajectory {:?}",
            trajectory
        );
    }

    /// Terminal runs reject every further transition
    #[test]
    fn property_1_terminal_states_are_final(
        cancel_first in any::<bool>(),
        transition in arb_transition(),
    ) {
        let insumo = Uuid::new_v4();
        let requirements = single_input_mix(insumo, Decimal::ONE);
        let mut run = ProductionRun::new(Uuid::new_v4(), Uuid::new_v4(), Decimal::ONE, Utc::now()).unwrap();
        let mut ledger = AvailabilityLedger::new(run.project_id);
        ledger.reserve(run.estado, run.cantidad_lotes, &requirements).unwrap();

        if cancel_first {
            run.cancelar(Utc::now()).unwrap();
        } else {
            run.iniciar(Utc::now()).unwrap();
            run.completar(&mut ledger, &requirements, CompletionResults::default(), Utc::now()).unwrap();
        }
        let before = run.clone();

        let result = apply(&mut run, transition, &mut ledger, &requirements);
        let is_invalid_transition = matches!(result, Err(DomainError::InvalidTransition { .. }));
        prop_assert!(is_invalid_transition);
        prop_assert_eq!(run, before);
    }
}

// ============================================================================
// Property 2: Completion Requires In-Progress Run
// ============================================================================
// completar on a run that is not en_progreso SHALL fail with InvalidTransition
// and SHALL leave the ledger untouched.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn property_2_completion_outside_progress_writes_nothing(
        lotes in 1u32..50,
        kg_per_batch in 1u32..100,
        state in 0u8..3,
    ) {
        let insumo = Uuid::new_v4();
        let requirements = single_input_mix(insumo, Decimal::from(kg_per_batch));
        let mut run = ProductionRun::new(Uuid::new_v4(), Uuid::new_v4(), Decimal::from(lotes), Utc::now()).unwrap();
        let mut ledger = AvailabilityLedger::new(run.project_id);
        ledger.reserve(run.estado, run.cantidad_lotes, &requirements).unwrap();

        // 0: pendiente, 1: cancelada, 2: completada
        match state {
            1 => run.cancelar(Utc::now()).unwrap(),
            2 => {
                run.iniciar(Utc::now()).unwrap();
                run.completar(&mut ledger, &requirements, CompletionResults::default(), Utc::now()).unwrap();
            }
            _ => {}
        }
        let ledger_before = ledger.clone();
        let from = run.estado;

        let result = run.completar(&mut ledger, &requirements, CompletionResults::default(), Utc::now());

        prop_assert_eq!(
            result,
            Err(DomainError::InvalidTransition { from, action: Transition::Completar })
        );
        prop_assert_eq!(ledger, ledger_before);
    }
}

// ============================================================================
// Property 8: Repeated Start Is Rejected
// ============================================================================
// Starting a run twice SHALL fail the second time, leaving it en_progreso with
// its original fecha_inicio.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn property_8_second_start_is_rejected(offset_secs in 1i64..86_400) {
        let created = Utc::now();
        let mut run = ProductionRun::new(Uuid::new_v4(), Uuid::new_v4(), Decimal::ONE, created).unwrap();

        run.iniciar(created).unwrap();
        let started_at = run.fecha_inicio;

        let later = created + chrono::Duration::seconds(offset_secs);
        let result = run.iniciar(later);

        prop_assert_eq!(
            result,
            Err(DomainError::InvalidTransition {
                from: ProductionStatus::EnProgreso,
                action: Transition::Iniciar,
            })
        );
        prop_assert_eq!(run.estado, ProductionStatus::EnProgreso);
        prop_assert_eq!(run.fecha_inicio, started_at);
        prop_assert_eq!(run.updated_at, created);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_completion_stores_results() {
        let insumo = Uuid::new_v4();
        let requirements = single_input_mix(insumo, dec("10"));
        let mut run = ProductionRun::new(Uuid::new_v4(), Uuid::new_v4(), Decimal::from(3), Utc::now()).unwrap();
        let mut ledger = AvailabilityLedger::new(run.project_id);
        ledger.reserve(run.estado, run.cantidad_lotes, &requirements).unwrap();

        run.iniciar(Utc::now()).unwrap();
        let resultados = CompletionResults {
            cantidad_producida: Some(dec("2800")),
            observaciones: Some("Lote sin incidencias".to_string()),
        };
        let entries = run.completar(&mut ledger, &requirements, resultados, Utc::now()).unwrap();

        assert_eq!(run.estado, ProductionStatus::Completada);
        assert!(run.fecha_fin.is_some());
        assert_eq!(run.cantidad_producida, Some(dec("2800")));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].production_run_id, Some(run.id));
        assert_eq!(entries[0].cantidad_base, dec("30000"));
        assert_eq!(entries[0].unidad_base, Unit::Gram);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ProductionStatus::EnProgreso).unwrap();
        assert_eq!(json, "\"en_progreso\"");
        let parsed: ProductionStatus = serde_json::from_str("\"cancelada\"").unwrap();
        assert_eq!(parsed, ProductionStatus::Cancelada);
    }

    #[test]
    fn test_cancel_in_progress_keeps_ledger() {
        let insumo = Uuid::new_v4();
        let requirements = single_input_mix(insumo, Decimal::ONE);
        let mut run = ProductionRun::new(Uuid::new_v4(), Uuid::new_v4(), Decimal::ONE, Utc::now()).unwrap();
        let mut ledger = AvailabilityLedger::new(run.project_id);
        ledger.reserve(run.estado, run.cantidad_lotes, &requirements).unwrap();
        let before = ledger.clone();

        run.iniciar(Utc::now()).unwrap();
        run.cancelar(Utc::now()).unwrap();

        assert_eq!(run.estado, ProductionStatus::Cancelada);
        assert_eq!(ledger, before);
    }
}
