//! Unit conversion for input quantities
//!
//! Every supported unit belongs to one dimension (mass, volume, count) and
//! converts linearly to that dimension's base unit: grams, milliliters, units.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::UnitError;

/// Dimension family of a unit
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UnitDimension {
    Mass,
    Volume,
    Count,
}

impl UnitDimension {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitDimension::Mass => "mass",
            UnitDimension::Volume => "volume",
            UnitDimension::Count => "count",
        }
    }

    /// Canonical unit that amounts of this dimension are stored in
    pub fn base_unit(&self) -> Unit {
        match self {
            UnitDimension::Mass => Unit::Gram,
            UnitDimension::Volume => Unit::Milliliter,
            UnitDimension::Count => Unit::Piece,
        }
    }
}

impl fmt::Display for UnitDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported measurement units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum Unit {
    Milligram,
    Gram,
    Kilogram,
    Tonne,
    Milliliter,
    Centiliter,
    Liter,
    CubicMeter,
    Piece,
    Dozen,
    Hundred,
    Thousand,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Milligram => "mg",
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Tonne => "t",
            Unit::Milliliter => "ml",
            Unit::Centiliter => "cl",
            Unit::Liter => "l",
            Unit::CubicMeter => "m3",
            Unit::Piece => "u",
            Unit::Dozen => "docena",
            Unit::Hundred => "ciento",
            Unit::Thousand => "millar",
        }
    }

    pub fn dimension(&self) -> UnitDimension {
        match self {
            Unit::Milligram | Unit::Gram | Unit::Kilogram | Unit::Tonne => UnitDimension::Mass,
            Unit::Milliliter | Unit::Centiliter | Unit::Liter | Unit::CubicMeter => {
                UnitDimension::Volume
            }
            Unit::Piece | Unit::Dozen | Unit::Hundred | Unit::Thousand => UnitDimension::Count,
        }
    }

    /// How many base units one of this unit is worth
    pub fn factor(&self) -> Decimal {
        match self {
            Unit::Milligram => Decimal::new(1, 3),
            Unit::Gram | Unit::Milliliter | Unit::Piece => Decimal::ONE,
            Unit::Centiliter => Decimal::from(10),
            Unit::Dozen => Decimal::from(12),
            Unit::Hundred => Decimal::from(100),
            Unit::Kilogram | Unit::Liter | Unit::Thousand => Decimal::from(1_000),
            Unit::Tonne | Unit::CubicMeter => Decimal::from(1_000_000),
        }
    }

    pub fn base(&self) -> Unit {
        self.dimension().base_unit()
    }

    pub fn is_base(&self) -> bool {
        self.base() == *self
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = match s.trim().to_lowercase().as_str() {
            "mg" => Unit::Milligram,
            "g" | "gr" => Unit::Gram,
            "kg" => Unit::Kilogram,
            "t" | "ton" => Unit::Tonne,
            "ml" => Unit::Milliliter,
            "cl" => Unit::Centiliter,
            "l" | "lt" => Unit::Liter,
            "m3" => Unit::CubicMeter,
            "u" | "unidad" | "unidades" => Unit::Piece,
            "docena" => Unit::Dozen,
            "ciento" => Unit::Hundred,
            "millar" => Unit::Thousand,
            _ => return Err(UnitError::UnsupportedUnit(s.to_string())),
        };
        Ok(unit)
    }
}

impl TryFrom<String> for Unit {
    type Error = UnitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Unit> for String {
    fn from(unit: Unit) -> Self {
        unit.symbol().to_string()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Classify a unit symbol into its dimension family
pub fn unit_dimension(unit: &str) -> Result<UnitDimension, UnitError> {
    Ok(unit.parse::<Unit>()?.dimension())
}

/// Convert an amount to the base unit of its dimension
pub fn convert_to_base_unit(amount: Decimal, unit: &str) -> Result<(Decimal, Unit), UnitError> {
    let unit: Unit = unit.parse()?;
    to_base(amount, unit)
}

/// Typed variant of [`convert_to_base_unit`]
pub fn to_base(amount: Decimal, unit: Unit) -> Result<(Decimal, Unit), UnitError> {
    let base = amount
        .checked_mul(unit.factor())
        .ok_or_else(|| UnitError::Overflow {
            amount: amount.to_string(),
            unit: unit.symbol().to_string(),
        })?;
    Ok((base, unit.base()))
}

/// Convert an amount between two units of the same dimension
pub fn convert_unit(amount: Decimal, from: &str, to: &str) -> Result<Decimal, UnitError> {
    let from: Unit = from.parse()?;
    let to: Unit = to.parse()?;
    convert(amount, from, to)
}

/// Typed variant of [`convert_unit`]
pub fn convert(amount: Decimal, from: Unit, to: Unit) -> Result<Decimal, UnitError> {
    if from.dimension() != to.dimension() {
        return Err(UnitError::IncompatibleDimension {
            from: from.symbol().to_string(),
            to: to.symbol().to_string(),
        });
    }
    if from == to {
        return Ok(amount);
    }
    let (base, _) = to_base(amount, from)?;
    Ok(base / to.factor())
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_unit() -> impl Strategy<Value = Unit> {
        prop::sample::select(vec![
            Unit::Milligram,
            Unit::Gram,
            Unit::Kilogram,
            Unit::Tonne,
            Unit::Milliliter,
            Unit::Centiliter,
            Unit::Liter,
            Unit::CubicMeter,
            Unit::Piece,
            Unit::Dozen,
            Unit::Hundred,
            Unit::Thousand,
        ])
    }

    proptest! {
        #[test]
        fn base_amount_scales_by_factor(unit in arb_unit(), amount in 1u32..1_000_000) {
            let (base, base_unit) = to_base(Decimal::from(amount), unit).unwrap();
            prop_assert!(base_unit.is_base());
            prop_assert_eq!(base_unit.dimension(), unit.dimension());
            prop_assert_eq!(base, Decimal::from(amount) * unit.factor());
        }

        #[test]
        fn symbol_parses_back(unit in arb_unit()) {
            prop_assert_eq!(unit.symbol().parse::<Unit>(), Ok(unit));
        }
    }
}
