//! Audit trail models for feed purchases

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of change captured by a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryType {
    #[serde(rename = "+")]
    Created,
    #[serde(rename = "~")]
    Changed,
    #[serde(rename = "-")]
    Deleted,
}

impl HistoryType {
    /// Single-character marker stored in the history table
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryType::Created => "+",
            HistoryType::Changed => "~",
            HistoryType::Deleted => "-",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "+" => Some(HistoryType::Created),
            "~" => Some(HistoryType::Changed),
            "-" => Some(HistoryType::Deleted),
            _ => None,
        }
    }

    fn verb(&self) -> &'static str {
        match self {
            HistoryType::Created => "created",
            HistoryType::Changed => "updated",
            HistoryType::Deleted => "deleted",
        }
    }
}

/// Resolve the change reason for a history entry.
///
/// An explicit, non-blank reason wins; otherwise a reason is derived from the
/// kind of change.
pub fn change_reason(history_type: HistoryType, explicit: Option<&str>) -> String {
    match explicit.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => reason.to_string(),
        None => format!("{} feed purchase via API", history_type.verb()),
    }
}

/// Snapshot of a feed purchase at the time of a change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPurchaseHistory {
    pub history_id: i64,
    pub purchase_id: i64,
    pub feed_id: i64,
    pub supplier: String,
    pub batch_number: Option<String>,
    pub quantity_kg: Decimal,
    pub cost_per_kg: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub history_type: HistoryType,
    pub history_date: DateTime<Utc>,
    pub history_change_reason: String,
}
