//! Fixed-point amount handling
//!
//! Balances, prices, quantities and fee rates carry at most eight fractional
//! digits. They travel through the API as [`Decimal`] and are persisted as
//! signed 64-bit "atoms" of 10^-8 units so the storage layer can compare and
//! adjust them inside a single SQL statement.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::{Result, TypesError};

/// Number of fractional digits every amount is held to
pub const AMOUNT_SCALE: u32 = 8;

const ATOMS_PER_UNIT: i64 = 100_000_000;

/// Convert a decimal amount into integer atoms.
///
/// Fails if the value has more than [`AMOUNT_SCALE`] fractional digits or
/// does not fit in an `i64` once scaled.
pub fn to_atoms(value: Decimal) -> Result<i64> {
    if value.normalize().scale() > AMOUNT_SCALE {
        return Err(TypesError::InvalidAmount {
            field: "amount".to_string(),
            reason: format!("{} has more than {} decimal places", value, AMOUNT_SCALE),
        });
    }

    value
        .checked_mul(Decimal::from(ATOMS_PER_UNIT))
        .and_then(|scaled| scaled.trunc().to_i64())
        .ok_or_else(|| TypesError::AmountOverflow(value.to_string()))
}

/// Convert integer atoms back into a normalized decimal
pub fn from_atoms(atoms: i64) -> Decimal {
    Decimal::new(atoms, AMOUNT_SCALE).normalize()
}

/// Round a positive value up to [`AMOUNT_SCALE`] places
pub fn round_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::AwayFromZero)
}

/// Parse a strictly positive amount from user input.
///
/// Accepts plain (`"0.5"`) and scientific (`"5e-1"`) notation.
pub fn parse_positive(field: &str, raw: &str) -> Result<Decimal> {
    let raw = raw.trim();
    let value = Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| TypesError::InvalidAmount {
            field: field.to_string(),
            reason: format!("'{}' is not a number", raw),
        })?;

    if value <= Decimal::ZERO {
        return Err(TypesError::InvalidAmount {
            field: field.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    to_atoms(value).map_err(|e| match e {
        TypesError::InvalidAmount { reason, .. } => TypesError::InvalidAmount {
            field: field.to_string(),
            reason,
        },
        other => other,
    })?;

    Ok(value.normalize())
}
