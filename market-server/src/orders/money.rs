//! Money calculation utilities using rust_decimal for precision
//!
//! All comparisons are done using `Decimal` internally; values stay `f64` at
//! the model boundary for storage/serialization.

use rust_decimal::prelude::*;
use shared::error::{AppError, ErrorCode};
use shared::models::{OrderItem, PriceBreakdown};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed price per item
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 9999;

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Compare two monetary values for equality (within 0.01 tolerance)
pub fn money_eq(a: f64, b: f64) -> bool {
    let diff = (to_decimal(a) - to_decimal(b)).abs();
    diff < MONEY_TOLERANCE
}

#[inline]
fn require_finite(value: f64, field_name: &str) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate an order line item before snapshotting it
pub fn validate_item(item: &OrderItem) -> Result<(), AppError> {
    require_finite(item.price, "price")?;
    if item.price < 0.0 {
        return Err(AppError::validation(format!(
            "price must be non-negative, got {}",
            item.price
        )));
    }
    if item.price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, item.price
        )));
    }

    if item.quantity <= 0 {
        return Err(AppError::validation(format!(
            "quantity must be positive, got {}",
            item.quantity
        )));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, item.quantity
        )));
    }

    Ok(())
}

/// Validate a caller-supplied price breakdown
///
/// Line-item prices are kept as historical snapshots, but the arithmetic
/// invariant total = items + tax + shipping is always enforced.
pub fn validate_breakdown(prices: &PriceBreakdown) -> Result<(), AppError> {
    require_finite(prices.items_price, "items_price")?;
    require_finite(prices.tax_price, "tax_price")?;
    require_finite(prices.shipping_price, "shipping_price")?;
    require_finite(prices.total_price, "total_price")?;

    for (field, value) in [
        ("items_price", prices.items_price),
        ("tax_price", prices.tax_price),
        ("shipping_price", prices.shipping_price),
        ("total_price", prices.total_price),
    ] {
        if value < 0.0 {
            return Err(AppError::validation(format!(
                "{} must be non-negative, got {}",
                field, value
            )));
        }
    }

    let expected = to_decimal(prices.items_price)
        + to_decimal(prices.tax_price)
        + to_decimal(prices.shipping_price);
    if (expected - to_decimal(prices.total_price)).abs() >= MONEY_TOLERANCE {
        return Err(AppError::with_message(
            ErrorCode::OrderTotalMismatch,
            format!(
                "total_price {} does not equal items {} + tax {} + shipping {}",
                prices.total_price, prices.items_price, prices.tax_price, prices.shipping_price
            ),
        )
        .with_detail("expected_total", to_f64(expected))
        .with_detail("total_price", prices.total_price));
    }

    Ok(())
}
