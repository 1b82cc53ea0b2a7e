//! Wide Moments sheet normalization against realistic fixtures

mod common;

use common::{moments_csv, wide_header, wide_row};
use partner_price_core::models::{Currency, ThresholdTable, TierPlan, TierRate};
use partner_price_core::parsers::RawTable;
use partner_price_core::{normalize, PriceError};

fn normalized(text: &str) -> ThresholdTable {
    normalize(&RawTable::from_csv_str("moments", text).unwrap()).unwrap()
}

#[test]
fn test_each_plan_takes_only_its_own_group() {
    let table = normalized(&moments_csv());

    assert_eq!(table.len(), 3);
    assert_eq!(table.currencies(), &Currency::ALL);

    let plans: Vec<&str> = table.rows().iter().map(|r| r.plan.as_str()).collect();
    assert_eq!(plans, vec!["Start", "Grow", "Scale"]);

    let grow = &table.rows()[1];
    assert_eq!(grow.threshold, Some(1000.0));
    assert_eq!(
        grow.rates[&Currency::Eur],
        TierRate {
            price: Some(400.0),
            overage: Some(0.04)
        }
    );
    assert_eq!(
        grow.rates[&Currency::Krw],
        TierRate {
            price: Some(500000.0),
            overage: Some(50.0)
        }
    );
    assert_eq!(grow.rates[&Currency::PartnerKrw].overage, Some(45.0));

    // Filler values from other groups must never appear
    for row in table.rows() {
        for rate in row.rates.values() {
            for value in [rate.price, rate.overage].into_iter().flatten() {
                assert!(![777.0, 888.0, 999.0].contains(&value), "leaked {}", value);
            }
        }
    }
}

#[test]
fn test_plan_without_row_contributes_nothing() {
    let text = [
        wide_header(),
        wide_row(TierPlan::Scale, ["5000", "1", "1", "1", "1", "1", "1"], ""),
    ]
    .join("\n");

    let table = normalized(&text);
    assert_eq!(table.len(), 1);
    assert_eq!(table.plans(), vec!["Scale"]);
    assert!(table.thresholds_for("Start").is_empty());
}

#[test]
fn test_missing_group_column_fails_even_without_rows() {
    // Scale group lacks a column and no Scale row exists
    let header = wide_header().replace("overage_partner_krw_scale", "overage_partner_krw_scl");
    let text = [
        header,
        wide_row(TierPlan::Start, ["500", "1", "1", "1", "1", "1", "1"], ""),
    ]
    .join("\n");

    match normalize(&RawTable::from_csv_str("moments", &text).unwrap()) {
        Err(PriceError::Schema { table, column }) => {
            assert_eq!(table, "moments");
            assert_eq!(column, "overage_partner_krw_scale");
        }
        other => panic!("Expected Schema error, got {:?}", other),
    }
}

#[test]
fn test_unparseable_cells_become_missing() {
    let text = [
        wide_header(),
        wide_row(TierPlan::Grow, ["1000", "n/a", "", "500000", "-", "450000", "45"], ""),
    ]
    .join("\n");

    let table = normalized(&text);
    let rates = &table.rows()[0].rates;
    assert_eq!(rates[&Currency::Eur], TierRate::default());
    assert_eq!(rates[&Currency::Krw].overage, None);
    assert_eq!(rates[&Currency::PartnerKrw].overage, Some(45.0));
}

#[test]
fn test_normalized_table_is_stable_through_canonical_layout() {
    let table = normalized(&moments_csv());

    let raw = table.to_raw("moments");
    let reread = ThresholdTable::from_raw(&raw).unwrap();
    assert_eq!(reread, table);

    // Second pass changes nothing either
    let again = ThresholdTable::from_raw(&reread.to_raw("moments")).unwrap();
    assert_eq!(again, table);
}

#[test]
fn test_headers_match_case_insensitively() {
    let text = moments_csv().replacen("plan,threshold_start", "PLAN, Threshold_Start", 1);
    let table = normalized(&text);
    assert_eq!(table.thresholds_for("Start"), vec![500.0]);
}

#[test]
fn test_plan_cells_are_trimmed() {
    let text = [
        wide_header(),
        wide_row(TierPlan::Grow, ["1000", "1", "1", "1", "1", "1", "1"], "").replacen("Grow", " Grow ", 1),
    ]
    .join("\n");
    assert_eq!(normalized(&text).plans(), vec!["Grow"]);
}

#[test]
fn test_plan_with_several_rows_projects_all_in_order() {
    let text = [
        wide_header(),
        wide_row(TierPlan::Grow, ["1000", "400", "0.04", "500000", "50", "450000", "45"], "888"),
        wide_row(TierPlan::Start, ["500", "10", "0.01", "15000", "15", "12000", "12"], "777"),
        wide_row(TierPlan::Grow, ["3000", "1100", "0.03", "1400000", "42", "1250000", "38"], "888"),
    ]
    .join("\n");
    let table = normalized(&text);

    let rows: Vec<(&str, Option<f64>)> = table
        .rows()
        .iter()
        .map(|r| (r.plan.as_str(), r.threshold))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Start", Some(500.0)),
            ("Grow", Some(1000.0)),
            ("Grow", Some(3000.0)),
        ]
    );
    assert_eq!(table.rows()[2].rates[&Currency::Krw].price, Some(1400000.0));
    assert_eq!(table.thresholds_for("Grow"), vec![1000.0, 3000.0]);
}
