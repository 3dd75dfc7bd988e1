//! Feed purchase summary tests
//!
//! Tests for purchase aggregation including:
//! - Half-up rounding of totals and averages
//! - Empty result sets and the zero quantity guard
//! - Supplier and feed breakdown partitioning and ordering
//! - Lenient boolean flag parsing

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    parse_bool_flag, round_half_up, summarize_purchases, PurchaseAggregator, PurchaseRecord,
    SummaryError, SummaryOptions,
};
use std::str::FromStr;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const FEEDS: [(i64, &str); 4] = [
    (1, "Trout Starter"),
    (2, "Salmon Grower"),
    (3, "Tilapia Floating"),
    (4, "Shrimp Pellet"),
];

fn record(supplier: &str, feed: (i64, &str), qty: &str, cost: &str) -> PurchaseRecord {
    PurchaseRecord {
        supplier: supplier.to_string(),
        feed_id: feed.0,
        feed_name: feed.1.to_string(),
        quantity_kg: dec(qty),
        cost_per_kg: dec(cost),
        purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
    }
}

fn all_breakdowns() -> SummaryOptions {
    SummaryOptions {
        include_supplier_breakdown: true,
        include_feed_breakdown: true,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Ties round away from zero
    #[test]
    fn test_half_up_rounding() {
        assert_eq!(round_half_up(dec("2.675")), dec("2.68"));
        assert_eq!(round_half_up(dec("2.665")), dec("2.67"));
        assert_eq!(round_half_up(dec("1.005")), dec("1.01"));
        assert_eq!(round_half_up(dec("2.674999")), dec("2.67"));
        assert_eq!(round_half_up(dec("-2.675")), dec("-2.68"));
    }

    #[test]
    fn test_empty_purchases() {
        let records: Vec<PurchaseRecord> = Vec::new();
        let summary = summarize_purchases(&records, all_breakdowns()).unwrap();

        assert_eq!(summary.figures.total_quantity_kg, Decimal::ZERO);
        assert_eq!(summary.figures.total_spend, Decimal::ZERO);
        assert_eq!(summary.figures.average_cost_per_kg, None);
        assert!(summary.supplier_breakdown.is_empty());
        assert!(summary.feed_breakdown.is_empty());
    }

    /// Two suppliers at the same price
    #[test]
    fn test_two_supplier_scenario() {
        let records = vec![
            record("Ocean Feeders Ltd", FEEDS[0], "1200", "2.70"),
            record("Biomar Norway AS", FEEDS[1], "2000", "2.70"),
        ];
        let summary = summarize_purchases(
            &records,
            SummaryOptions {
                include_supplier_breakdown: true,
                include_feed_breakdown: false,
            },
        )
        .unwrap();

        assert_eq!(summary.figures.total_quantity_kg, dec("3200"));
        assert_eq!(summary.figures.total_spend, dec("8640"));
        assert_eq!(summary.figures.average_cost_per_kg, Some(dec("2.7")));
        assert!(summary.feed_breakdown.is_empty());

        let ocean = summary
            .supplier_breakdown
            .iter()
            .find(|s| s.supplier == "Ocean Feeders Ltd")
            .unwrap();
        assert_eq!(ocean.figures.total_quantity_kg, dec("1200"));
        assert_eq!(ocean.figures.total_spend, dec("3240"));
        assert_eq!(ocean.figures.average_cost_per_kg, Some(dec("2.7")));
    }

    /// Rounding happens once on the sum, not per record
    #[test]
    fn test_spend_rounded_after_summing() {
        let records = vec![
            record("A", FEEDS[0], "1", "0.005"),
            record("A", FEEDS[0], "1", "0.005"),
            record("A", FEEDS[0], "1", "0.005"),
        ];
        let summary = summarize_purchases(&records, SummaryOptions::default()).unwrap();
        assert_eq!(summary.figures.total_spend, dec("0.02"));
    }

    /// Average is spend over quantity, not the mean of unit prices
    #[test]
    fn test_average_is_weighted() {
        let records = vec![
            record("A", FEEDS[0], "100", "2.00"),
            record("B", FEEDS[0], "300", "4.00"),
        ];
        let summary = summarize_purchases(&records, SummaryOptions::default()).unwrap();
        assert_eq!(summary.figures.average_cost_per_kg, Some(dec("3.5")));
    }

    #[test]
    fn test_free_feed_has_zero_average() {
        let records = vec![record("Sample Co", FEEDS[3], "25", "0")];
        let summary = summarize_purchases(&records, SummaryOptions::default()).unwrap();
        assert_eq!(summary.figures.average_cost_per_kg, Some(Decimal::ZERO));
    }

    #[test]
    fn test_feed_breakdown_ordered_by_name() {
        let records = vec![
            record("A", FEEDS[0], "10", "1"),
            record("A", FEEDS[1], "10", "1"),
            record("A", FEEDS[2], "10", "1"),
            record("A", FEEDS[3], "10", "1"),
        ];
        let summary = summarize_purchases(&records, all_breakdowns()).unwrap();
        let names: Vec<&str> = summary
            .feed_breakdown
            .iter()
            .map(|f| f.feed_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Salmon Grower", "Shrimp Pellet", "Tilapia Floating", "Trout Starter"]
        );
    }

    #[test]
    fn test_feeds_with_equal_names_ordered_by_id() {
        let records = vec![
            record("A", (9, "Grower"), "10", "1"),
            record("A", (3, "Grower"), "10", "1"),
        ];
        let summary = summarize_purchases(&records, all_breakdowns()).unwrap();
        let ids: Vec<i64> = summary.feed_breakdown.iter().map(|f| f.feed_id).collect();
        assert_eq!(ids, vec![3, 9]);
    }

    #[test]
    fn test_supplier_grouping_is_exact() {
        let records = vec![
            record("Biomar", FEEDS[0], "10", "1"),
            record("biomar", FEEDS[0], "10", "1"),
        ];
        let summary = summarize_purchases(&records, all_breakdowns()).unwrap();
        assert_eq!(summary.supplier_breakdown.len(), 2);
        // Uppercase sorts first
        assert_eq!(summary.supplier_breakdown[0].supplier, "Biomar");
    }

    #[test]
    fn test_summary_json_shape() {
        let records = vec![record("Ocean Feeders Ltd", FEEDS[0], "1200", "2.70")];
        let summary = summarize_purchases(&records, all_breakdowns()).unwrap();
        let value = serde_json::to_value(&summary).unwrap();

        assert_eq!(value["total_quantity_kg"], 1200.0);
        assert_eq!(value["total_spend"], 3240.0);
        assert_eq!(value["average_cost_per_kg"], 2.7);
        assert_eq!(value["supplier_breakdown"][0]["supplier"], "Ocean Feeders Ltd");
        assert_eq!(value["feed_breakdown"][0]["feed_id"], 1);
        assert_eq!(value["feed_breakdown"][0]["feed_name"], "Trout Starter");
    }

    /// Out-of-range figures are reported instead of panicking
    #[test]
    fn test_overflow_is_an_error() {
        let records = vec![
            record("A", FEEDS[0], "79228162514264337593543950335", "1"),
            record("B", FEEDS[1], "1", "1"),
        ];
        assert_eq!(
            summarize_purchases(&records, all_breakdowns()),
            Err(SummaryError::Overflow)
        );
    }

    #[test]
    fn test_breakdowns_serialize_as_empty_arrays() {
        let records = vec![record("A", FEEDS[0], "1", "1")];
        let summary = summarize_purchases(&records, SummaryOptions::default()).unwrap();
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["supplier_breakdown"], serde_json::json!([]));
        assert_eq!(value["feed_breakdown"], serde_json::json!([]));
    }

    #[test]
    fn test_options_from_flags() {
        let options = SummaryOptions::from_flags(Some("Yes"), Some("0"));
        assert!(options.include_supplier_breakdown);
        assert!(!options.include_feed_breakdown);

        let options = SummaryOptions::from_flags(Some("garbage"), None);
        assert_eq!(options, SummaryOptions::default());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    // Strategy for quantities in kg with 3 decimal places
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..100_000_000i64).prop_map(|n| Decimal::new(n, 3))
    }

    // Strategy for prices per kg with 2 decimal places
    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..100_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn supplier_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec![
            "Biomar Norway AS",
            "Skretting",
            "Ocean Feeders Ltd",
            "Cargill Aqua",
        ])
        .prop_map(str::to_string)
    }

    fn record_strategy() -> impl Strategy<Value = PurchaseRecord> {
        (
            supplier_strategy(),
            prop::sample::select(FEEDS.to_vec()),
            quantity_strategy(),
            price_strategy(),
        )
            .prop_map(|(supplier, (feed_id, feed_name), quantity_kg, cost_per_kg)| {
                PurchaseRecord {
                    supplier,
                    feed_id,
                    feed_name: feed_name.to_string(),
                    quantity_kg,
                    cost_per_kg,
                    purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                }
            })
    }

    fn records_strategy() -> impl Strategy<Value = Vec<PurchaseRecord>> {
        prop::collection::vec(record_strategy(), 0..30)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Totals are the rounded exact sums
        #[test]
        fn prop_totals_match_exact_sums(records in records_strategy()) {
            let summary = summarize_purchases(&records, SummaryOptions::default()).unwrap();

            let quantity: Decimal = records.iter().map(|r| r.quantity_kg).sum();
            let spend: Decimal = records.iter().map(|r| r.quantity_kg * r.cost_per_kg).sum();

            prop_assert_eq!(summary.figures.total_quantity_kg, round_half_up(quantity));
            prop_assert_eq!(summary.figures.total_spend, round_half_up(spend));
        }

        /// Average is null exactly when nothing was bought
        #[test]
        fn prop_average_matches_ratio(records in records_strategy()) {
            let mut aggregator = PurchaseAggregator::new(SummaryOptions::default());
            for r in &records {
                aggregator.push(r).unwrap();
            }
            let totals = aggregator.totals();
            let summary = aggregator.finish();

            if records.is_empty() {
                prop_assert_eq!(summary.figures.average_cost_per_kg, None);
            } else {
                let expected = round_half_up(totals.spend / totals.quantity_kg);
                prop_assert_eq!(summary.figures.average_cost_per_kg, Some(expected));
            }
        }

        /// Input order does not change the result
        #[test]
        fn prop_order_independent(
            (records, shuffled) in records_strategy()
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let a = summarize_purchases(&records, all_breakdowns()).unwrap();
            let b = summarize_purchases(&shuffled, all_breakdowns()).unwrap();
            prop_assert_eq!(a, b);
        }

        /// Breakdowns partition the filtered set exactly
        #[test]
        fn prop_breakdowns_partition_totals(records in records_strategy()) {
            let mut aggregator = PurchaseAggregator::new(all_breakdowns());
            for r in &records {
                aggregator.push(r).unwrap();
            }
            let totals = aggregator.totals();

            let supplier_qty: Decimal = aggregator.supplier_totals().map(|(_, t)| t.quantity_kg).sum();
            let supplier_spend: Decimal = aggregator.supplier_totals().map(|(_, t)| t.spend).sum();
            let feed_qty: Decimal = aggregator.feed_totals().map(|(_, t)| t.quantity_kg).sum();
            let feed_spend: Decimal = aggregator.feed_totals().map(|(_, t)| t.spend).sum();

            prop_assert_eq!(supplier_qty, totals.quantity_kg);
            prop_assert_eq!(supplier_spend, totals.spend);
            prop_assert_eq!(feed_qty, totals.quantity_kg);
            prop_assert_eq!(feed_spend, totals.spend);
            prop_assert_eq!(aggregator.record_count(), records.len());
        }

        /// Breakdown rows are sorted and contain only groups that occur
        #[test]
        fn prop_breakdowns_sorted(records in records_strategy()) {
            let summary = summarize_purchases(&records, all_breakdowns()).unwrap();

            let suppliers: Vec<&str> = summary.supplier_breakdown.iter().map(|s| s.supplier.as_str()).collect();
            let mut sorted = suppliers.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(&suppliers, &sorted);

            let names: Vec<&str> = summary.feed_breakdown.iter().map(|f| f.feed_name.as_str()).collect();
            prop_assert!(names.windows(2).all(|w| w[0] <= w[1]));

            for feed in &summary.feed_breakdown {
                prop_assert!(records.iter().any(|r| r.feed_id == feed.feed_id));
            }
        }

        /// Flags only toggle breakdowns, never the overall figures
        #[test]
        fn prop_flags_do_not_change_totals(records in records_strategy()) {
            let plain = summarize_purchases(&records, SummaryOptions::default()).unwrap();
            let full = summarize_purchases(&records, all_breakdowns()).unwrap();

            prop_assert_eq!(plain.figures, full.figures);
            prop_assert!(plain.supplier_breakdown.is_empty());
            prop_assert!(plain.feed_breakdown.is_empty());
        }

        /// Unrecognized flag values fall back to the default
        #[test]
        fn prop_unknown_flags_use_default(value in "[a-z]{4,8}", default in any::<bool>()) {
            prop_assume!(!matches!(value.as_str(), "true" | "false" | "yes"));
            prop_assert_eq!(parse_bool_flag(Some(&value), default), default);
        }
    }
}
