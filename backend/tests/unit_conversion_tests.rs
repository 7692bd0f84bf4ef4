//! Unit conversion tests
//!
//! Tests for quantity conversion including:
//! - Property 4: Conversion Round Trip
//! - Property 5: Cross-Dimension Conversion Is Rejected

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{convert, convert_to_base_unit, convert_unit, unit_dimension, Unit, UnitDimension, UnitError};
use std::str::FromStr;

/// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const MASS: [Unit; 4] = [Unit::Milligram, Unit::Gram, Unit::Kilogram, Unit::Tonne];
const VOLUME: [Unit; 4] = [Unit::Milliliter, Unit::Centiliter, Unit::Liter, Unit::CubicMeter];
const COUNT: [Unit; 4] = [Unit::Piece, Unit::Dozen, Unit::Hundred, Unit::Thousand];

fn arb_same_dimension_pair() -> impl Strategy<Value = (Unit, Unit)> {
    prop_oneof![Just(MASS), Just(VOLUME), Just(COUNT)]
        .prop_flat_map(|units| (prop::sample::select(units.to_vec()), prop::sample::select(units.to_vec())))
}

// ============================================================================
// Property 4: Conversion Round Trip
// ============================================================================
// For any amount x and units A, B of the same dimension,
// convert_unit(convert_unit(x, A, B), B, A) SHALL equal x within tolerance.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn property_4_round_trip(
        (from, to) in arb_same_dimension_pair(),
        millis in 1u64..1_000_000_000,
    ) {
        let x = Decimal::new(millis as i64, 3);

        let there = convert(x, from, to).unwrap();
        let back = convert(there, to, from).unwrap();

        let tolerance = dec("0.000000001");
        let diff = (back - x).abs();
        prop_assert!(
            diff < tolerance,
            "Round trip mismatch: {} {} -> {} {} -> {} {}",
            x, from, there, to, back, from
        );
    }

    /// Converting to base through either entry point agrees
    #[test]
    fn property_4_base_conversion_agrees(
        (unit, _) in arb_same_dimension_pair(),
        amount in 1u32..100_000,
    ) {
        let x = Decimal::from(amount);
        let (base, base_unit) = convert_to_base_unit(x, unit.symbol()).unwrap();
        prop_assert_eq!(base_unit, unit.dimension().base_unit());
        prop_assert_eq!(convert_unit(x, unit.symbol(), base_unit.symbol()).unwrap(), base);
    }
}

// ============================================================================
// Property 5: Cross-Dimension Conversion Is Rejected
// ============================================================================
// Converting between units of different dimensions SHALL fail with
// IncompatibleDimension.

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn property_5_cross_dimension_rejected(
        from_group in 0usize..3,
        shift in 1usize..3,
        i in 0usize..4,
        j in 0usize..4,
        amount in 1u32..10_000,
    ) {
        let groups = [MASS, VOLUME, COUNT];
        let from = groups[from_group][i];
        let to = groups[(from_group + shift) % 3][j];

        let result = convert(Decimal::from(amount), from, to);
        prop_assert_eq!(
            result,
            Err(UnitError::IncompatibleDimension {
                from: from.symbol().to_string(),
                to: to.symbol().to_string(),
            })
        );
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_known_factors() {
        assert_eq!(convert_unit(dec("1"), "t", "kg").unwrap(), dec("1000"));
        assert_eq!(convert_unit(dec("2"), "l", "ml").unwrap(), dec("2000"));
        assert_eq!(convert_unit(dec("3"), "docena", "u").unwrap(), dec("36"));
        assert_eq!(convert_unit(dec("500"), "mg", "g").unwrap(), dec("0.5"));
        assert_eq!(convert_unit(dec("1"), "m3", "l").unwrap(), dec("1000"));
    }

    #[test]
    fn test_mass_to_volume_fails() {
        assert!(matches!(
            convert_unit(dec("1"), "kg", "l"),
            Err(UnitError::IncompatibleDimension { .. })
        ));
    }

    #[test]
    fn test_symbols_are_case_insensitive() {
        assert_eq!(unit_dimension(" KG ").unwrap(), UnitDimension::Mass);
        assert_eq!(unit_dimension("Unidades").unwrap(), UnitDimension::Count);
    }

    #[test]
    fn test_unknown_unit() {
        assert_eq!(
            unit_dimension("galon"),
            Err(UnitError::UnsupportedUnit("galon".to_string()))
        );
    }

    #[test]
    fn test_unit_serializes_as_symbol() {
        assert_eq!(serde_json::to_string(&Unit::Kilogram).unwrap(), "\"kg\"");
        let parsed: Unit = serde_json::from_str("\"docena\"").unwrap();
        assert_eq!(parsed, Unit::Dozen);
        assert!(serde_json::from_str::<Unit>("\"oz\"").is_err());
    }
}
