//! Output formatting for the partner-price commands
//!
//! Every formatter renders either a human table (comfy-table) or pretty JSON.
//! Amounts are rounded to whole units for display only.

use comfy_table::{Cell, Color, ContentArrangement, Table};
use partner_price_core::models::{
    BracketRow, Currency, Overage, PriceQuote, PriceTable, Product, QuoteKey, CATCH_ALL_PLAN,
};
use partner_price_core::{ErrorSeverity, LoadReport, PriceBook};
use serde_json::json;

// ============================================================================
// Formatters
// ============================================================================

/// Format a quote as table (human) or JSON
pub fn format_quote(product: Product, quote: &PriceQuote, json: bool, no_color: bool) -> String {
    if json {
        return to_json(&json!({ "product": product, "quote": quote }));
    }

    let mut lines = vec![format!("{} · {} · {}", product, quote.plan, describe_key(&quote.key))];

    let mut table = new_table();
    if quote.has_overage_pricing() {
        set_header(
            &mut table,
            &["Currency", "Base price", "Overage rate", "Overage units", "Overage cost", "Total"],
            no_color,
        );
        for line in &quote.lines {
            let (rate, units, cost) = match line.overage {
                Overage::Charged {
                    rate,
                    quantity,
                    cost,
                } => (format_rate(rate), group_digits(quantity), format_amount(cost)),
                Overage::NotApplicable => ("-".to_string(), "-".to_string(), "-".to_string()),
            };
            table.add_row(vec![
                line.currency.label().to_string(),
                format_amount(line.base_price),
                rate,
                units,
                cost,
                format_amount(line.total),
            ]);
        }
    } else {
        set_header(&mut table, &["Currency", "Base price", "Total"], no_color);
        for line in &quote.lines {
            table.add_row(vec![
                line.currency.label().to_string(),
                format_amount(line.base_price),
                format_amount(line.total),
            ]);
        }
    }
    lines.push(table.to_string());

    if !quote.has_overage_pricing() {
        lines.push(format!(
            "Note: {} has no overage pricing; the total is the base price.",
            product
        ));
    }
    if quote.lines.iter().any(|l| l.total.is_none()) {
        lines.push("Note: '-' marks a price missing from the sheet.".to_string());
    }

    lines.join("\n")
}

/// Format the plan names of a product
pub fn format_plans(product: Product, plans: &[String], json: bool) -> String {
    if json {
        return to_json(&json!({ "product": product, "plans": plans }));
    }
    if plans.is_empty() {
        return format!("No plans found for {}.", product);
    }
    plans.join("\n")
}

/// Format the selectable thresholds of a plan
pub fn format_thresholds(plan: &str, thresholds: &[f64], json: bool) -> String {
    if json {
        return to_json(&json!({ "plan": plan, "thresholds": thresholds }));
    }
    if thresholds.is_empty() {
        return format!("No thresholds found for plan '{}'.", plan);
    }
    thresholds
        .iter()
        .map(|t| format_number(*t))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the agent brackets of a plan
pub fn format_brackets(
    plan: &str,
    currencies: &[Currency],
    brackets: &[&BracketRow],
    json: bool,
    no_color: bool,
) -> String {
    if json {
        return to_json(&json!({ "plan": plan, "brackets": brackets }));
    }
    if brackets.is_empty() {
        return format!("No agent brackets found for plan '{}'.", plan);
    }

    let mut table = new_table();
    let mut header = vec!["Agents".to_string()];
    header.extend(currencies.iter().map(|c| c.label().to_string()));
    set_header(&mut table, &header, no_color);

    for row in brackets {
        let mut cells = vec![bracket_label(row)];
        cells.extend(
            currencies
                .iter()
                .map(|c| format_amount(row.prices.get(c).copied().flatten())),
        );
        table.add_row(cells);
    }
    table.to_string()
}

/// Format a whole loaded table
pub fn format_price_table(product: Product, table: &PriceTable, json: bool, no_color: bool) -> String {
    if json {
        return to_json(&json!({ "product": product, "table": table }));
    }
    if table.is_empty() {
        return format!("{} sheet has no rows.", product);
    }

    let mut out = new_table();
    match table {
        PriceTable::ThresholdKeyed(t) => {
            let mut header = vec!["Plan".to_string(), "Threshold".to_string()];
            for currency in t.currencies() {
                header.push(format!("Price {}", currency.label()));
                header.push(format!("Overage {}", currency.label()));
            }
            set_header(&mut out, &header, no_color);

            for row in t.rows() {
                let mut cells = vec![row.plan.clone(), format_optional_number(row.threshold)];
                for currency in t.currencies() {
                    let rate = row.rates.get(currency).copied().unwrap_or_default();
                    cells.push(format_amount(rate.price));
                    cells.push(format_rate(rate.overage));
                }
                out.add_row(cells);
            }
        }
        PriceTable::BracketKeyed(t) => {
            let mut header = vec!["Plan".to_string(), "Agents".to_string()];
            header.extend(t.currencies().iter().map(|c| c.label().to_string()));
            set_header(&mut out, &header, no_color);

            for row in t.rows() {
                let mut cells = vec![row.plan.clone(), bracket_label(row)];
                cells.extend(
                    t.currencies()
                        .iter()
                        .map(|c| format_amount(row.prices.get(c).copied().flatten())),
                );
                out.add_row(cells);
            }
        }
    }
    out.to_string()
}

/// Valid selections to show after a quote matched no row
pub fn format_choices(table: &PriceTable, plan: &str) -> String {
    let plans = table.plans();
    if !plans.iter().any(|p| p == plan) {
        return format!("Valid plans: {}", plans.join(", "));
    }

    match table {
        PriceTable::ThresholdKeyed(t) => format!(
            "Valid thresholds for {}: {}",
            plan,
            t.thresholds_for(plan)
                .into_iter()
                .map(format_number)
                .collect::<Vec<_>>()
                .join(", ")
        ),
        PriceTable::BracketKeyed(t) => format!(
            "Valid agent counts for {}: {}",
            plan,
            t.brackets_for(plan)
                .into_iter()
                .map(bracket_label)
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// Format a load report; `fetched` lists when each cached sheet was fetched
pub fn format_report(report: &LoadReport, book: &PriceBook, json: bool) -> String {
    let (warnings, errors, _) = report.error_count();

    if json {
        let entries: Vec<_> = report
            .errors
            .iter()
            .map(|e| {
                json!({
                    "source": e.source,
                    "severity": severity_label(e.severity),
                    "message": e.message,
                    "suggestion": e.suggestion,
                })
            })
            .collect();
        let sheets: Vec<_> = Product::ALL
            .into_iter()
            .map(|product| {
                let info = book.sheet_info(product);
                json!({
                    "product": product,
                    "loaded": info.is_some(),
                    "fetched_at": info.map(|i| i.fetched_at),
                    "source": info.map(|i| i.source.as_str()),
                })
            })
            .collect();
        return to_json(&json!({
            "products_loaded": report.products_loaded,
            "products_failed": report.products_failed,
            "warnings": warnings,
            "fatal": report.has_fatal_errors(),
            "sheets": sheets,
            "errors": entries,
        }));
    }

    let mut lines = vec![format!(
        "{} loaded, {} failed ({} warnings, {} errors)",
        report.products_loaded, report.products_failed, warnings, errors
    )];
    for product in Product::ALL {
        lines.push(match book.sheet_info(product) {
            Some(info) => format!(
                "  {:<14} fetched {} from {}",
                product.name(),
                info.fetched_at.format("%Y-%m-%d %H:%M UTC"),
                info.source
            ),
            None => format!("  {:<14} failed", product.name()),
        });
    }
    if report.has_errors() {
        lines.push(String::new());
        lines.extend(format_problems(report));
    }
    lines.join("\n")
}

/// One line per report entry, with suggestions indented below
pub fn format_problems(report: &LoadReport) -> Vec<String> {
    let mut lines = Vec::new();
    for error in &report.errors {
        lines.push(format!(
            "{}: {}: {}",
            severity_label(error.severity),
            error.source,
            error.message
        ));
        if let Some(suggestion) = &error.suggestion {
            lines.push(format!("  hint: {}", suggestion));
        }
    }
    lines
}

// ============================================================================
// Utilities
// ============================================================================

/// Round to whole units and group thousands; `-` for a missing value
pub fn format_amount(value: Option<f64>) -> String {
    let Some(value) = value else {
        return "-".to_string();
    };
    let rounded = value.round();
    let grouped = group_digits(rounded.abs() as u64);
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Overage rates keep their decimals
pub fn format_rate(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Whole numbers grouped, fractional ones as is
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < u64::MAX as f64 {
        let grouped = group_digits(value.abs() as u64);
        if value < 0.0 {
            format!("-{}", grouped)
        } else {
            grouped
        }
    } else {
        value.to_string()
    }
}

fn format_optional_number(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| "-".to_string())
}

fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn bracket_label(row: &BracketRow) -> String {
    match (row.agent_min, row.agent_max) {
        (Some(min), Some(max)) if min == max => min.to_string(),
        (Some(min), Some(max)) => format!("{}-{}", min, max),
        (Some(min), None) => format!("{}+", min),
        (None, _) if row.plan == CATCH_ALL_PLAN => "any".to_string(),
        (None, _) => "-".to_string(),
    }
}

fn describe_key(key: &QuoteKey) -> String {
    match key {
        QuoteKey::Threshold { threshold } => format!("threshold {}", format_number(*threshold)),
        QuoteKey::AgentBracket { agents, .. } => format!("{} agents", group_digits(*agents as u64)),
    }
}

fn severity_label(severity: ErrorSeverity) -> &'static str {
    match severity {
        ErrorSeverity::Warning => "warning",
        ErrorSeverity::Error => "error",
        ErrorSeverity::Fatal => "fatal",
    }
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn set_header<S: AsRef<str>>(table: &mut Table, columns: &[S], no_color: bool) {
    if no_color {
        table.set_header(columns.iter().map(|c| c.as_ref().to_string()).collect::<Vec<_>>());
    } else {
        table.set_header(
            columns
                .iter()
                .map(|c| Cell::new(c.as_ref()).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    }
}

fn to_json(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use partner_price_core::models::CurrencyQuote;
    use std::collections::BTreeMap;

    fn grow_quote() -> PriceQuote {
        PriceQuote {
            plan: "Grow".to_string(),
            key: QuoteKey::Threshold { threshold: 1000.0 },
            lines: vec![CurrencyQuote {
                currency: Currency::Krw,
                base_price: Some(500000.0),
                overage: Overage::Charged {
                    rate: Some(50.0),
                    quantity: 20,
                    cost: Some(1000.0),
                },
                total: Some(501000.0),
            }],
        }
    }

    fn bracket_quote() -> PriceQuote {
        PriceQuote {
            plan: "Grow".to_string(),
            key: QuoteKey::AgentBracket {
                agents: 12,
                agent_min: Some(11),
                agent_max: Some(50),
            },
            lines: vec![CurrencyQuote {
                currency: Currency::PartnerKrw,
                base_price: Some(108000.0),
                overage: Overage::NotApplicable,
                total: Some(108000.0),
            }],
        }
    }

    #[test]
    fn test_format_amount_groups_and_rounds() {
        assert_eq!(format_amount(Some(501000.0)), "501,000");
        assert_eq!(format_amount(Some(1234567.6)), "1,234,568");
        assert_eq!(format_amount(Some(999.4)), "999");
        assert_eq!(format_amount(Some(0.0)), "0");
        assert_eq!(format_amount(Some(-1500.0)), "-1,500");
        assert_eq!(format_amount(None), "-");
    }

    #[test]
    fn test_format_number_keeps_fractions() {
        assert_eq!(format_number(10000.0), "10,000");
        assert_eq!(format_number(2.5), "2.5");
    }

    #[test]
    fn test_format_quote_threshold() {
        let output = format_quote(Product::Answers, &grow_quote(), false, true);
        assert!(output.contains("Answers · Grow · threshold 1,000"));
        assert!(output.contains("501,000"));
        assert!(output.contains("Overage cost"));
        assert!(!output.contains("no overage pricing"));
    }

    #[test]
    fn test_format_quote_bracket_has_notice() {
        let output = format_quote(Product::Conversations, &bracket_quote(), false, true);
        assert!(output.contains("12 agents"));
        assert!(output.contains("108,000"));
        assert!(!output.contains("Overage cost"));
        assert!(output.contains("Conversations has no overage pricing"));
    }

    #[test]
    fn test_format_quote_json() {
        let output = format_quote(Product::Answers, &grow_quote(), true, false);
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["product"], "answers");
        assert_eq!(value["quote"]["lines"][0]["total"], 501000.0);
    }

    #[test]
    fn test_bracket_labels() {
        let row = |plan: &str, min, max| BracketRow {
            plan: plan.to_string(),
            agent_min: min,
            agent_max: max,
            prices: BTreeMap::new(),
        };
        assert_eq!(bracket_label(&row("Grow", Some(1), Some(10))), "1-10");
        assert_eq!(bracket_label(&row("Grow", Some(51), None)), "51+");
        assert_eq!(bracket_label(&row("Start", None, None)), "any");
        assert_eq!(bracket_label(&row("Grow", Some(5), Some(5))), "5");
    }

    #[test]
    fn test_format_choices() {
        use partner_price_core::models::BracketTable;

        let row = |plan: &str, min, max| BracketRow {
            plan: plan.to_string(),
            agent_min: min,
            agent_max: max,
            prices: BTreeMap::from([(Currency::Krw, Some(1.0))]),
        };
        let table = PriceTable::BracketKeyed(BracketTable::new(
            vec![Currency::Krw],
            vec![row("Grow", Some(11), None), row("Grow", Some(1), Some(10)), row("Start", None, None)],
        ));

        assert_eq!(format_choices(&table, "Enterprise"), "Valid plans: Grow, Start");
        assert_eq!(format_choices(&table, "Grow"), "Valid agent counts for Grow: 1-10, 11+");
    }

    #[test]
    fn test_format_plans_empty() {
        assert!(format_plans(Product::Moments, &[], false).contains("No plans found"));
        let output = format_plans(Product::Moments, &["Grow".to_string()], true);
        assert!(output.contains("\"Grow\""));
    }

    #[test]
    fn test_format_report_lists_hints() {
        let mut report = LoadReport::new();
        report.products_loaded = 2;
        report.products_failed = 1;
        report.add_error(
            partner_price_core::LoadError::error("conversations", "Invalid agent brackets")
                .with_suggestion("Fix agent_min/agent_max rows"),
        );

        let output = format_report(&report, &PriceBook::default(), false);
        assert!(output.starts_with("2 loaded, 1 failed (0 warnings, 1 errors)"));
        assert!(output.contains("error: conversations: Invalid agent brackets"));
        assert!(output.contains("hint: Fix agent_min/agent_max rows"));
    }

    #[test]
    fn test_format_report_shows_fetch_time_of_loaded_sheets() {
        use chrono::TimeZone;
        use partner_price_core::models::BracketTable;
        use partner_price_core::SheetInfo;
        use std::sync::Arc;

        let mut book = PriceBook::default();
        book.insert(
            Product::Conversations,
            Arc::new(PriceTable::BracketKeyed(BracketTable::new(vec![Currency::Krw], vec![]))),
            SheetInfo {
                fetched_at: chrono::Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
                source: "/srv/prices/conversations_price.csv".to_string(),
            },
        );
        let mut report = LoadReport::new();
        report.products_loaded = 1;
        report.products_failed = 2;

        let output = format_report(&report, &book, false);
        assert!(output.contains("fetched 2024-03-01 09:30 UTC from /srv/prices/conversations_price.csv"));
        assert!(output.contains("Moments") && output.contains("failed"));

        let value: serde_json::Value = serde_json::from_str(&format_report(&report, &book, true)).unwrap();
        assert_eq!(value["sheets"][1]["loaded"], true);
        assert_eq!(value["sheets"][0]["loaded"], false);
        assert!(value["sheets"][0]["fetched_at"].is_null());
    }
}
