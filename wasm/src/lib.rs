//! WebAssembly module for the Forestry Operations Platform
//!
//! Provides client-side computation for:
//! - Unit conversion and unit validation in input forms
//! - Scaling a mix's per-batch requirements by a batch count
//! - Checking which run actions are available for a status

use rust_decimal::Decimal;
use std::str::FromStr;
use wasm_bindgen::prelude::*;

use shared::{ProductionStatus, RequirementLine, Transition, Unit};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("forestal-ops wasm loaded"));
}

fn parse_amount(amount: &str) -> Result<Decimal, JsValue> {
    Decimal::from_str(amount.trim())
        .map_err(|e| JsValue::from_str(&format!("Invalid amount '{}': {}", amount, e)))
}

/// Convert `amount` between two units of the same dimension.
///
/// Amounts travel as decimal strings so no precision is lost crossing into JavaScript.
#[wasm_bindgen]
pub fn convert_quantity(amount: &str, from: &str, to: &str) -> Result<String, JsValue> {
    let amount = parse_amount(amount)?;
    shared::convert_unit(amount, from, to)
        .map(|v| v.normalize().to_string())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert `amount` to the base unit of its dimension; returns `{"cantidad", "unidad"}`
#[wasm_bindgen]
pub fn to_base_quantity(amount: &str, unit: &str) -> Result<String, JsValue> {
    let amount = parse_amount(amount)?;
    let (value, base) = shared::convert_to_base_unit(amount, unit)
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    serde_json::to_string(&serde_json::json!({
        "cantidad": value.normalize().to_string(),
        "unidad": base.symbol(),
    }))
    .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Dimension of a unit: "mass", "volume" or "count"
#[wasm_bindgen]
pub fn unit_dimension(unit: &str) -> Result<String, JsValue> {
    shared::unit_dimension(unit)
        .map(|d| d.as_str().to_string())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

#[wasm_bindgen]
pub fn is_supported_unit(unit: &str) -> bool {
    Unit::from_str(unit).is_ok()
}

/// Whether a quantity entered in `unit` can be recorded against an input stocked in `catalog_unit`
#[wasm_bindgen]
pub fn units_compatible(unit: &str, catalog_unit: &str) -> bool {
    match (Unit::from_str(unit), Unit::from_str(catalog_unit)) {
        (Ok(a), Ok(b)) => a.dimension() == b.dimension(),
        _ => false,
    }
}

/// Multiply per-batch requirement lines (JSON array) by a batch count
#[wasm_bindgen]
pub fn scale_requirements(lines_json: &str, cantidad_lotes: &str) -> Result<String, JsValue> {
    let lotes = parse_amount(cantidad_lotes)?;
    shared::validate_batch_count(lotes).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let lines: Vec<RequirementLine> = serde_json::from_str(lines_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid requirements JSON: {}", e)))?;

    let scaled = scale_lines(lines, lotes).map_err(|e| JsValue::from_str(&e))?;

    serde_json::to_string(&scaled).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn scale_lines(lines: Vec<RequirementLine>, lotes: Decimal) -> Result<Vec<RequirementLine>, String> {
    lines
        .into_iter()
        .map(|line| {
            let cantidad = line
                .cantidad
                .checked_mul(lotes)
                .ok_or_else(|| format!("Requirement for {} is out of range", line.insumo_id))?;
            Ok(RequirementLine { cantidad, ..line })
        })
        .collect()
}

/// Whether `accion` (iniciar, completar, cancelar) is allowed from `estado`
#[wasm_bindgen]
pub fn can_transition(estado: &str, accion: &str) -> bool {
    let transition = match accion {
        "iniciar" => Transition::Iniciar,
        "completar" => Transition::Completar,
        "cancelar" => Transition::Cancelar,
        _ => return false,
    };
    ProductionStatus::from_str(estado)
        .map(|status| transition.is_allowed_from(status))
        .unwrap_or(false)
}
