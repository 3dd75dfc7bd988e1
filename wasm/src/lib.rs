//! WebAssembly module for the feed purchase service
//!
//! Provides client-side computation for:
//! - Total cost preview on the purchase form
//! - Offline purchase summaries
//! - Query flag interpretation

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::summary::*;
pub use shared::types::*;
pub use shared::validation::*;

fn js_error(message: String) -> JsValue {
    web_sys::console::error_1(&JsValue::from_str(&message));
    js_sys::Error::new(&message).into()
}

fn purchase_total(quantity_kg: &str, cost_per_kg: &str) -> Result<String, String> {
    let quantity: Decimal = quantity_kg
        .trim()
        .parse()
        .map_err(|e| format!("Invalid quantity_kg '{}': {}", quantity_kg, e))?;
    let cost: Decimal = cost_per_kg
        .trim()
        .parse()
        .map_err(|e| format!("Invalid cost_per_kg '{}': {}", cost_per_kg, e))?;

    let total = quantity
        .checked_mul(cost)
        .ok_or_else(|| "Total cost is out of range".to_string())?;

    Ok(format!("{:.2}", round_half_up(total)))
}

fn summary_json(records_json: &str, options: SummaryOptions) -> Result<String, String> {
    let records: Vec<PurchaseRecord> = serde_json::from_str(records_json)
        .map_err(|e| format!("Invalid purchases JSON: {}", e))?;

    let summary = summarize_purchases(&records, options).map_err(|e| e.to_string())?;
    serde_json::to_string(&summary).map_err(|e| format!("Failed to encode summary: {}", e))
}

/// Total cost of a purchase, rounded half-up to two places.
///
/// Takes decimal strings so no precision is lost crossing into JavaScript.
#[wasm_bindgen]
pub fn calculate_purchase_total(quantity_kg: &str, cost_per_kg: &str) -> Result<String, JsValue> {
    purchase_total(quantity_kg, cost_per_kg).map_err(js_error)
}

/// Summarize a JSON array of purchases.
///
/// Rows returned by the list endpoint are accepted as-is; fields the summary
/// does not use are ignored.
#[wasm_bindgen]
pub fn summarize_purchases_json(
    records_json: &str,
    include_supplier: bool,
    include_feed: bool,
) -> Result<String, JsValue> {
    let options = SummaryOptions {
        include_supplier_breakdown: include_supplier,
        include_feed_breakdown: include_feed,
    };
    summary_json(records_json, options).map_err(js_error)
}

/// Interpret a query-string style flag, defaulting to false
#[wasm_bindgen]
pub fn parse_flag(value: &str) -> bool {
    parse_bool_flag(Some(value), false)
}
