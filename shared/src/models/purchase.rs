//! Feed purchase models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A recorded purchase of feed from a supplier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedPurchase {
    pub id: i64,
    pub feed_id: i64,
    /// Name of the purchased feed, joined from the feed catalogue
    pub feed_name: String,
    pub supplier: String,
    pub batch_number: Option<String>,
    pub quantity_kg: Decimal,
    pub cost_per_kg: Decimal,
    /// `quantity_kg * cost_per_kg`, unrounded
    pub total_cost: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedPurchase {
    /// Reduce the purchase to the fields the summary computation needs
    pub fn to_record(&self) -> PurchaseRecord {
        PurchaseRecord {
            supplier: self.supplier.clone(),
            feed_id: self.feed_id,
            feed_name: self.feed_name.clone(),
            quantity_kg: self.quantity_kg,
            cost_per_kg: self.cost_per_kg,
            purchase_date: self.purchase_date,
        }
    }
}

/// The slice of a purchase that aggregation operates on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    pub supplier: String,
    pub feed_id: i64,
    pub feed_name: String,
    pub quantity_kg: Decimal,
    pub cost_per_kg: Decimal,
    pub purchase_date: NaiveDate,
}

impl PurchaseRecord {
    /// Exact spend for this purchase, `None` if it exceeds the decimal range
    pub fn spend(&self) -> Option<Decimal> {
        self.quantity_kg.checked_mul(self.cost_per_kg)
    }
}

/// Sortable purchase columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseSortField {
    PurchaseDate,
    QuantityKg,
    CostPerKg,
}

impl PurchaseSortField {
    pub fn column(&self) -> &'static str {
        match self {
            PurchaseSortField::PurchaseDate => "purchase_date",
            PurchaseSortField::QuantityKg => "quantity_kg",
            PurchaseSortField::CostPerKg => "cost_per_kg",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "purchase_date" => Some(PurchaseSortField::PurchaseDate),
            "quantity_kg" => Some(PurchaseSortField::QuantityKg),
            "cost_per_kg" => Some(PurchaseSortField::CostPerKg),
            _ => None,
        }
    }
}

/// One `ORDER BY` term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseSort {
    pub field: PurchaseSortField,
    pub descending: bool,
}

/// Ordering for purchase listings, e.g. `-purchase_date,quantity_kg`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrdering(Vec<PurchaseSort>);

impl Default for PurchaseOrdering {
    /// Newest purchases first
    fn default() -> Self {
        Self(vec![PurchaseSort {
            field: PurchaseSortField::PurchaseDate,
            descending: true,
        }])
    }
}

impl PurchaseOrdering {
    /// Parse a comma separated ordering parameter.
    ///
    /// Unknown fields are skipped. If nothing usable remains the default
    /// ordering applies.
    pub fn parse(value: Option<&str>) -> Self {
        let terms: Vec<PurchaseSort> = value
            .unwrap_or_default()
            .split(',')
            .filter_map(|term| {
                let term = term.trim();
                let (descending, name) = match term.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, term),
                };
                PurchaseSortField::from_name(name).map(|field| PurchaseSort { field, descending })
            })
            .collect();

        if terms.is_empty() {
            Self::default()
        } else {
            Self(terms)
        }
    }

    pub fn terms(&self) -> &[PurchaseSort] {
        &self.0
    }
}
