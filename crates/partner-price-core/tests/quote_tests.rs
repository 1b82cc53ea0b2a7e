//! End-to-end quoting over parsed sheets

mod common;

use common::{moments_csv, ANSWERS_CSV, CONVERSATIONS_CSV};
use partner_price_core::models::{Currency, Overage, PriceTable, Product, QuoteKey};
use partner_price_core::parsers::RawTable;
use partner_price_core::{build_table, quote, LoadReport, PriceError, UsageKey};

fn load(product: Product, text: &str) -> PriceTable {
    let raw = RawTable::from_csv_str(product.key(), text).unwrap();
    let mut report = LoadReport::new();
    build_table(product, &raw, &mut report).unwrap()
}

fn usage(threshold: f64, quantity: u64) -> UsageKey {
    UsageKey::Threshold {
        threshold,
        quantity,
    }
}

#[test]
fn test_grow_example() {
    let table = load(Product::Answers, ANSWERS_CSV);
    let quote = quote(&table, "Grow", &usage(1000.0, 20)).unwrap();

    let krw = quote.line(Currency::Krw).unwrap();
    assert_eq!(krw.base_price, Some(500000.0));
    assert_eq!(krw.overage.cost(), Some(1000.0));
    assert_eq!(krw.total, Some(501000.0));
    assert_eq!(quote.key, QuoteKey::Threshold { threshold: 1000.0 });
}

#[test]
fn test_zero_usage_total_is_base_price() {
    for (product, text) in [
        (Product::Answers, ANSWERS_CSV.to_string()),
        (Product::Moments, moments_csv()),
    ] {
        let table = load(product, &text);
        for plan in table.plans() {
            let PriceTable::ThresholdKeyed(t) = &table else {
                panic!("expected threshold table");
            };
            for threshold in t.thresholds_for(&plan) {
                let quote = quote(&table, &plan, &usage(threshold, 0)).unwrap();
                for line in &quote.lines {
                    if line.base_price.is_some() {
                        assert_eq!(line.total, line.base_price, "{} {} {}", product, plan, threshold);
                    }
                }
            }
        }
    }
}

#[test]
fn test_total_formula_holds_for_every_currency() {
    let table = load(Product::Moments, &moments_csv());
    let quote = quote(&table, "Scale", &usage(5000.0, 1234)).unwrap();

    assert_eq!(quote.lines.len(), Currency::ALL.len());
    for line in &quote.lines {
        let Overage::Charged {
            rate,
            quantity,
            cost,
        } = line.overage
        else {
            panic!("threshold quotes always charge overage");
        };
        let rate = rate.unwrap();
        assert_eq!(quantity, 1234);
        assert_eq!(cost, Some(1234.0 * rate));
        assert_eq!(line.total, Some(line.base_price.unwrap() + 1234.0 * rate));
    }
}

#[test]
fn test_missing_price_leaves_total_missing() {
    let table = load(Product::Answers, ANSWERS_CSV);
    let quote = quote(&table, "Scale", &usage(10000.0, 5)).unwrap();

    let eur = quote.line(Currency::Eur).unwrap();
    assert_eq!(eur.base_price, None);
    assert_eq!(eur.total, None);
    assert_eq!(quote.line(Currency::Krw).unwrap().total, Some(5000200.0));
}

#[test]
fn test_threshold_not_listed_is_recoverable_not_found() {
    let table = load(Product::Answers, ANSWERS_CSV);

    let err = quote(&table, "Grow", &usage(2000.0, 0)).unwrap_err();
    assert!(matches!(err, PriceError::NotFound { .. }));
    assert!(err.is_recoverable());

    let err = quote(&table, "Enterprise", &usage(1000.0, 0)).unwrap_err();
    assert!(matches!(err, PriceError::NotFound { .. }));
}

#[test]
fn test_start_bracket_ignores_agent_count() {
    let table = load(Product::Conversations, CONVERSATIONS_CSV);

    let quotes: Vec<_> = [1, 50, 100_000]
        .into_iter()
        .map(|agents| quote(&table, "Start", &UsageKey::Agents(agents)).unwrap())
        .collect();

    for q in &quotes {
        assert_eq!(q.line(Currency::PartnerKrw).unwrap().total, Some(60000.0));
        assert!(!q.has_overage_pricing());
    }
}

#[test]
fn test_bracket_upper_bound_is_inclusive() {
    let table = load(Product::Conversations, CONVERSATIONS_CSV);
    let price = |agents: u32| {
        quote(&table, "Grow", &UsageKey::Agents(agents))
            .unwrap()
            .line(Currency::Krw)
            .unwrap()
            .base_price
    };

    assert_eq!(price(1), Some(140000.0));
    assert_eq!(price(10), Some(140000.0));
    assert_eq!(price(11), Some(126000.0));
    assert_eq!(price(50), Some(126000.0));
    assert_eq!(price(51), Some(112000.0));
    assert_eq!(price(1_000_000), Some(112000.0));
}

#[test]
fn test_bracket_quote_has_no_overage() {
    let table = load(Product::Conversations, CONVERSATIONS_CSV);
    let quote = quote(&table, "Scale", &UsageKey::Agents(21)).unwrap();

    assert_eq!(
        quote.key,
        QuoteKey::AgentBracket {
            agents: 21,
            agent_min: Some(21),
            agent_max: None
        }
    );
    for line in &quote.lines {
        assert_eq!(line.overage, Overage::NotApplicable);
        assert_eq!(line.total, line.base_price);
    }
}

#[test]
fn test_unknown_bracket_plan_is_not_found() {
    let table = load(Product::Conversations, CONVERSATIONS_CSV);
    let err = quote(&table, "Enterprise", &UsageKey::Agents(3)).unwrap_err();
    assert!(err.is_recoverable());
}

#[test]
fn test_quote_serializes_for_json_output() {
    let table = load(Product::Answers, ANSWERS_CSV);
    let quote = quote(&table, "Grow", &usage(1000.0, 20)).unwrap();

    let value = serde_json::to_value(&quote).unwrap();
    assert_eq!(value["plan"], "Grow");
    assert_eq!(value["key"]["kind"], "threshold");
    assert_eq!(value["lines"][1]["currency"], "krw");
    assert_eq!(value["lines"][1]["overage"]["kind"], "charged");
    assert_eq!(value["lines"][1]["total"], 501000.0);
}

#[test]
fn test_duplicate_threshold_quotes_first_row() {
    let text = "\
plan,threshold,price_krw,overage_krw
Grow,1000,500000,50
Grow,5000,2600000,65
Grow,1000,900000,90
";
    let table = load(Product::Answers, text);
    let quote = quote(&table, "Grow", &usage(1000.0, 10)).unwrap();

    let krw = quote.line(Currency::Krw).unwrap();
    assert_eq!(krw.base_price, Some(500000.0));
    assert_eq!(krw.overage.cost(), Some(500.0));
    assert_eq!(krw.total, Some(500500.0));
}

#[test]
fn test_catch_all_plan_with_several_rows_quotes_first() {
    let text = "\
plan,agent_min,agent_max,price_krw
Start,ALL,ALL,70000
Grow,1,,140000
Start,ALL,ALL,99000
";
    let table = load(Product::Conversations, text);

    for agents in [1, 500] {
        let quote = quote(&table, "Start", &UsageKey::Agents(agents)).unwrap();
        assert_eq!(quote.line(Currency::Krw).unwrap().total, Some(70000.0));
    }
}
