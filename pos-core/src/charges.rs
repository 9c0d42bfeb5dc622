//! Money calculation utilities using rust_decimal for precision.
//!
//! All arithmetic runs on `Decimal` internally and converts to `f64` only
//! at the model boundary, rounded to 2 decimal places half-up.

use rust_decimal::prelude::*;
use shared::CartLine;

use crate::config::RateConfig;
use crate::error::{PosError, PosResult};

/// Rounding: 2 decimal places, half-up.
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed unit price per line.
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per line.
const MAX_QUANTITY: i32 = 9999;

/// Computed charge components of an order.
///
/// Invariant: `total = subtotal + service_charge + tax`, each rounded to
/// 2 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Charges {
    pub subtotal: f64,
    pub service_charge: f64,
    pub tax: f64,
    pub total: f64,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

fn decimal(value: f64, field: &str) -> PosResult<Decimal> {
    Decimal::from_f64(value)
        .ok_or_else(|| PosError::Validation(format!("{field} is not a finite number: {value}")))
}

/// Validate a cart line before any persistence attempt.
pub fn validate_line(line: &CartLine) -> PosResult<()> {
    if line.product_id.is_empty() {
        return Err(PosError::Validation("line has empty product id".into()));
    }
    if !line.price.is_finite() || line.price < 0.0 {
        return Err(PosError::Validation(format!(
            "price must be a non-negative finite number, got {}",
            line.price
        )));
    }
    if line.price > MAX_PRICE {
        return Err(PosError::Validation(format!(
            "price exceeds maximum allowed ({MAX_PRICE}), got {}",
            line.price
        )));
    }
    if line.quantity <= 0 {
        return Err(PosError::Validation(format!(
            "quantity must be positive, got {}",
            line.quantity
        )));
    }
    if line.quantity > MAX_QUANTITY {
        return Err(PosError::Validation(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {}",
            line.quantity
        )));
    }
    Ok(())
}

/// Validate a whole cart snapshot. Empty carts are rejected here so no
/// zero-line order ever reaches the store or the offline queue.
pub fn validate_lines(lines: &[CartLine]) -> PosResult<()> {
    if lines.is_empty() {
        return Err(PosError::Validation("cart is empty".into()));
    }
    for line in lines {
        validate_line(line)?;
    }
    Ok(())
}

/// `price * quantity` for one line, unrounded.
pub fn line_total(line: &CartLine) -> PosResult<Decimal> {
    let price = decimal(line.price, "price")?;
    Ok(price * Decimal::from(line.quantity))
}

/// Sum of `price * quantity` over all lines, rounded.
pub fn subtotal(lines: &[CartLine]) -> PosResult<Decimal> {
    let mut sum = Decimal::ZERO;
    for line in lines {
        sum += line_total(line)?;
    }
    Ok(round2(sum))
}

/// Compute charges from scratch for a cart snapshot.
///
/// Service charge applies to the subtotal; tax applies to
/// subtotal + service charge.
pub fn compute(lines: &[CartLine], rates: RateConfig) -> PosResult<Charges> {
    let sub = subtotal(lines)?;
    let sc_rate = decimal(rates.service_charge_rate, "service_charge_rate")?;
    let tax_rate = decimal(rates.tax_rate, "tax_rate")?;

    let service_charge = round2(sub * sc_rate);
    let tax = round2((sub + service_charge) * tax_rate);
    let total = round2(sub + service_charge + tax);

    Ok(Charges {
        subtotal: sub.to_f64().unwrap_or_default(),
        service_charge: service_charge.to_f64().unwrap_or_default(),
        tax: tax.to_f64().unwrap_or_default(),
        total: total.to_f64().unwrap_or_default(),
    })
}

/// Combine already-rounded charge components additively.
///
/// Used on the merge path: the existing order's components may carry
/// manual adjustments, so merging adds the new submission's components
/// instead of recomputing from the merged lines.
pub fn combine(existing: Charges, incoming: Charges) -> PosResult<Charges> {
    let add = |a: f64, b: f64, field: &str| -> PosResult<f64> {
        let sum = round2(decimal(a, field)? + decimal(b, field)?);
        Ok(sum.to_f64().unwrap_or_default())
    };
    Ok(Charges {
        subtotal: add(existing.subtotal, incoming.subtotal, "subtotal")?,
        service_charge: add(
            existing.service_charge,
            incoming.service_charge,
            "service_charge",
        )?,
        tax: add(existing.tax, incoming.tax, "tax")?,
        total: add(existing.total, incoming.total, "total")?,
    })
}
