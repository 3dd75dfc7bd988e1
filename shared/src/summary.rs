//! Feed purchase aggregation
//!
//! Totals, average cost and optional supplier/feed breakdowns over a filtered
//! set of purchases. Sums are kept as exact decimals and only rounded, half
//! away from zero to two places, when the result is built.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PurchaseRecord;
use crate::types::parse_bool_flag;

/// Decimal places of every figure in a summary
pub const SUMMARY_DECIMAL_PLACES: u32 = 2;

/// Round half away from zero to [`SUMMARY_DECIMAL_PLACES`]
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(SUMMARY_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// A purchase whose figures cannot be added to the running totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SummaryError {
    #[error("purchase totals exceed the supported decimal range")]
    Overflow,
}

/// Which breakdowns to include in a summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SummaryOptions {
    pub include_supplier_breakdown: bool,
    pub include_feed_breakdown: bool,
}

impl SummaryOptions {
    /// Build options from raw query parameter values
    pub fn from_flags(supplier: Option<&str>, feed: Option<&str>) -> Self {
        Self {
            include_supplier_breakdown: parse_bool_flag(supplier, false),
            include_feed_breakdown: parse_bool_flag(feed, false),
        }
    }
}

/// Running, unrounded totals for a group of purchases
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurchaseTotals {
    pub quantity_kg: Decimal,
    pub spend: Decimal,
}

impl PurchaseTotals {
    /// Totals with one more purchase included, leaving `self` untouched
    fn plus(&self, quantity_kg: Decimal, spend: Decimal) -> Result<Self, SummaryError> {
        Ok(Self {
            quantity_kg: self
                .quantity_kg
                .checked_add(quantity_kg)
                .ok_or(SummaryError::Overflow)?,
            spend: self.spend.checked_add(spend).ok_or(SummaryError::Overflow)?,
        })
    }

    pub fn add(&mut self, record: &PurchaseRecord) -> Result<(), SummaryError> {
        let spend = record.spend().ok_or(SummaryError::Overflow)?;
        *self = self.plus(record.quantity_kg, spend)?;
        Ok(())
    }

    /// Unrounded spend per kilogram, `None` when nothing was bought
    pub fn average_cost_per_kg(&self) -> Option<Decimal> {
        if self.quantity_kg.is_zero() {
            return None;
        }
        self.spend.checked_div(self.quantity_kg)
    }

    fn figures(&self) -> SummaryFigures {
        SummaryFigures {
            total_quantity_kg: round_half_up(self.quantity_kg),
            total_spend: round_half_up(self.spend),
            average_cost_per_kg: self.average_cost_per_kg().map(round_half_up),
        }
    }
}

/// Rounded figures shared by the overall summary and each breakdown row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryFigures {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_quantity_kg: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_spend: Decimal,
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub average_cost_per_kg: Option<Decimal>,
}

/// Totals for a single supplier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierBreakdown {
    pub supplier: String,
    #[serde(flatten)]
    pub figures: SummaryFigures,
}

/// Totals for a single feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedBreakdown {
    pub feed_id: i64,
    pub feed_name: String,
    #[serde(flatten)]
    pub figures: SummaryFigures,
}

/// Aggregated purchase figures returned by the summary endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseSummary {
    #[serde(flatten)]
    pub figures: SummaryFigures,
    pub supplier_breakdown: Vec<SupplierBreakdown>,
    pub feed_breakdown: Vec<FeedBreakdown>,
}

#[derive(Debug, Clone)]
struct FeedGroup {
    feed_name: String,
    totals: PurchaseTotals,
}

/// Single pass accumulator over purchase records
#[derive(Debug, Default)]
pub struct PurchaseAggregator {
    options: SummaryOptions,
    overall: PurchaseTotals,
    record_count: usize,
    by_supplier: BTreeMap<String, PurchaseTotals>,
    by_feed: BTreeMap<i64, FeedGroup>,
}

impl PurchaseAggregator {
    pub fn new(options: SummaryOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Add a purchase to the overall and group totals.
    ///
    /// Nothing is updated when any of the affected totals would overflow.
    pub fn push(&mut self, record: &PurchaseRecord) -> Result<(), SummaryError> {
        let spend = record.spend().ok_or(SummaryError::Overflow)?;
        let overall = self.overall.plus(record.quantity_kg, spend)?;

        let supplier = if self.options.include_supplier_breakdown {
            let current = self
                .by_supplier
                .get(&record.supplier)
                .copied()
                .unwrap_or_default();
            Some(current.plus(record.quantity_kg, spend)?)
        } else {
            None
        };

        let feed = if self.options.include_feed_breakdown {
            let current = self
                .by_feed
                .get(&record.feed_id)
                .map(|group| group.totals)
                .unwrap_or_default();
            Some(current.plus(record.quantity_kg, spend)?)
        } else {
            None
        };

        self.overall = overall;
        self.record_count += 1;

        if let Some(totals) = supplier {
            match self.by_supplier.get_mut(&record.supplier) {
                Some(existing) => *existing = totals,
                None => {
                    self.by_supplier.insert(record.supplier.clone(), totals);
                }
            }
        }

        if let Some(totals) = feed {
            self.by_feed
                .entry(record.feed_id)
                .or_insert_with(|| FeedGroup {
                    feed_name: record.feed_name.clone(),
                    totals: PurchaseTotals::default(),
                })
                .totals = totals;
        }

        Ok(())
    }

    /// Overall unrounded totals so far
    pub fn totals(&self) -> PurchaseTotals {
        self.overall
    }

    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Unrounded per-supplier totals, ordered by supplier
    pub fn supplier_totals(&self) -> impl Iterator<Item = (&str, &PurchaseTotals)> {
        self.by_supplier.iter().map(|(s, t)| (s.as_str(), t))
    }

    /// Unrounded per-feed totals, ordered by feed id
    pub fn feed_totals(&self) -> impl Iterator<Item = (i64, &PurchaseTotals)> {
        self.by_feed.iter().map(|(id, g)| (*id, &g.totals))
    }

    /// Round everything and produce the summary
    pub fn finish(self) -> PurchaseSummary {
        // BTreeMap iteration already yields suppliers in ascending order
        let supplier_breakdown = self
            .by_supplier
            .into_iter()
            .map(|(supplier, totals)| SupplierBreakdown {
                supplier,
                figures: totals.figures(),
            })
            .collect();

        let mut feed_breakdown: Vec<FeedBreakdown> = self
            .by_feed
            .into_iter()
            .map(|(feed_id, group)| FeedBreakdown {
                feed_id,
                feed_name: group.feed_name,
                figures: group.totals.figures(),
            })
            .collect();
        // Stable sort keeps feed id order for equal names
        feed_breakdown.sort_by(|a, b| a.feed_name.cmp(&b.feed_name));

        PurchaseSummary {
            figures: self.overall.figures(),
            supplier_breakdown,
            feed_breakdown,
        }
    }
}

/// Summarize a filtered set of purchases
pub fn summarize_purchases<'a, I>(
    records: I,
    options: SummaryOptions,
) -> Result<PurchaseSummary, SummaryError>
where
    I: IntoIterator<Item = &'a PurchaseRecord>,
{
    let mut aggregator = PurchaseAggregator::new(options);
    for record in records {
        aggregator.push(record)?;
    }
    Ok(aggregator.finish())
}
