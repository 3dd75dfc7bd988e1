//! Validation utilities for feed purchases

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Maximum length of a supplier name
pub const MAX_SUPPLIER_LENGTH: usize = 100;

/// Maximum length of a supplier batch number
pub const MAX_BATCH_NUMBER_LENGTH: usize = 100;

/// Validate supplier name is present and not too long
pub fn validate_supplier(supplier: &str) -> Result<(), &'static str> {
    let trimmed = supplier.trim();
    if trimmed.is_empty() {
        return Err("Supplier is required");
    }
    if trimmed.chars().count() > MAX_SUPPLIER_LENGTH {
        return Err("Supplier must be at most 100 characters");
    }
    Ok(())
}

/// Validate batch number length
pub fn validate_batch_number(batch_number: &str) -> Result<(), &'static str> {
    if batch_number.chars().count() > MAX_BATCH_NUMBER_LENGTH {
        return Err("Batch number must be at most 100 characters");
    }
    Ok(())
}

/// `quantity_kg` is stored as `NUMERIC(12, 3)`
pub const QUANTITY_INTEGER_DIGITS: u32 = 9;
pub const QUANTITY_DECIMAL_PLACES: u32 = 3;

/// `cost_per_kg` is stored as `NUMERIC(10, 2)`
pub const COST_INTEGER_DIGITS: u32 = 8;
pub const COST_DECIMAL_PLACES: u32 = 2;

fn too_many_integer_digits(value: Decimal, max_digits: u32) -> bool {
    value.abs().trunc() >= Decimal::from(10u64.pow(max_digits))
}

// Trailing zeros do not count, so "2.500" is a valid cost
fn too_many_decimal_places(value: Decimal, max_places: u32) -> bool {
    value.normalize().scale() > max_places
}

/// Validate purchased quantity is positive and fits its column
pub fn validate_quantity_kg(quantity_kg: Decimal) -> Result<(), &'static str> {
    if quantity_kg <= Decimal::ZERO {
        return Err("Quantity must be greater than 0");
    }
    if too_many_integer_digits(quantity_kg, QUANTITY_INTEGER_DIGITS) {
        return Err("Quantity must have at most 9 digits before the decimal point");
    }
    if too_many_decimal_places(quantity_kg, QUANTITY_DECIMAL_PLACES) {
        return Err("Quantity must have at most 3 decimal places");
    }
    Ok(())
}

/// Validate cost per kilogram is not negative and fits its column
pub fn validate_cost_per_kg(cost_per_kg: Decimal) -> Result<(), &'static str> {
    if cost_per_kg < Decimal::ZERO {
        return Err("Cost per kg cannot be negative");
    }
    if too_many_integer_digits(cost_per_kg, COST_INTEGER_DIGITS) {
        return Err("Cost per kg must have at most 8 digits before the decimal point");
    }
    if too_many_decimal_places(cost_per_kg, COST_DECIMAL_PLACES) {
        return Err("Cost per kg must have at most 2 decimal places");
    }
    Ok(())
}

/// Validate the expiry date does not precede the purchase date
pub fn validate_expiry_date(
    purchase_date: NaiveDate,
    expiry_date: Option<NaiveDate>,
) -> Result<(), &'static str> {
    match expiry_date {
        Some(expiry) if expiry < purchase_date => {
            Err("Expiry date cannot be before the purchase date")
        }
        _ => Ok(()),
    }
}
