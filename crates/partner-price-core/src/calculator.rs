//! Tiered lookup and overage calculation
//!
//! Threshold-keyed sheets (Moments, Answers):
//!
//! ```text
//! overage_cost = quantity × overage_rate
//! total        = base_price + overage_cost
//! ```
//!
//! computed independently for every currency of the sheet. Bracket-keyed sheets
//! (Conversations) have no overage concept: the quote carries
//! `Overage::NotApplicable` and the total equals the base price.
//!
//! No rounding happens here; formatting for display is the caller's concern.

use crate::error::PriceError;
use crate::models::price_table::{BracketRow, BracketTable, ThresholdRow, ThresholdTable};
use crate::models::{CurrencyQuote, Overage, PriceQuote, PriceTable, QuoteKey, CATCH_ALL_PLAN};
use std::fmt;
use tracing::{debug, warn};

/// Selection the user made for a quote
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UsageKey {
    /// Capacity threshold plus expected usage beyond it
    Threshold { threshold: f64, quantity: u64 },
    /// Expected number of agents
    Agents(u32),
}

impl fmt::Display for UsageKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UsageKey::Threshold { threshold, .. } => write!(f, "threshold {}", threshold),
            UsageKey::Agents(agents) => write!(f, "{} agents", agents),
        }
    }
}

/// Quote a plan selection against a loaded sheet
///
/// # Errors
///
/// * `PriceError::NotFound` if no row matches the plan and key (recoverable)
/// * `PriceError::InvalidInput` for a zero agent count or a key that does not
///   fit the sheet's shape
pub fn quote(table: &PriceTable, plan: &str, key: &UsageKey) -> Result<PriceQuote, PriceError> {
    match (table, key) {
        (PriceTable::ThresholdKeyed(t), UsageKey::Threshold { threshold, quantity }) => {
            quote_threshold(t, plan, *threshold, *quantity)
        }
        (PriceTable::BracketKeyed(t), UsageKey::Agents(agents)) => quote_bracket(t, plan, *agents),
        (PriceTable::ThresholdKeyed(_), UsageKey::Agents(_)) => Err(PriceError::invalid_input(
            "this product is priced by threshold and usage, not by agent count",
        )),
        (PriceTable::BracketKeyed(_), UsageKey::Threshold { .. }) => Err(PriceError::invalid_input(
            "this product is priced by agent count, not by threshold",
        )),
    }
}

/// Look up the row of a plan at an exact threshold
///
/// The threshold must be one of `table.thresholds_for(plan)`.
pub fn find_threshold_row<'a>(
    table: &'a ThresholdTable,
    plan: &str,
    threshold: f64,
) -> Result<&'a ThresholdRow, PriceError> {
    let not_found = || PriceError::not_found(plan, format!("threshold {}", threshold));

    let mut plan_rows = table.rows_for(plan).peekable();
    if plan_rows.peek().is_none() {
        return Err(not_found());
    }

    let mut matches = plan_rows.filter(|row| row.threshold == Some(threshold));
    let row = matches.next().ok_or_else(not_found)?;
    if matches.next().is_some() {
        warn!(plan, threshold, "Several rows share this threshold, using the first");
    }
    Ok(row)
}

/// Quote a threshold-keyed plan for `quantity` units beyond the threshold
pub fn quote_threshold(
    table: &ThresholdTable,
    plan: &str,
    threshold: f64,
    quantity: u64,
) -> Result<PriceQuote, PriceError> {
    let row = find_threshold_row(table, plan, threshold)?;

    let lines = table
        .currencies()
        .iter()
        .map(|&currency| {
            let rate = row.rates.get(&currency).copied().unwrap_or_default();
            let cost = rate.overage.map(|r| quantity as f64 * r);
            let total = match (rate.price, cost) {
                (Some(base), Some(cost)) => Some(base + cost),
                _ => None,
            };
            CurrencyQuote {
                currency,
                base_price: rate.price,
                overage: Overage::Charged {
                    rate: rate.overage,
                    quantity,
                    cost,
                },
                total,
            }
        })
        .collect();

    debug!(plan, threshold, quantity, "Computed threshold quote");
    Ok(PriceQuote {
        plan: row.plan.clone(),
        key: QuoteKey::Threshold { threshold },
        lines,
    })
}

/// Look up the bracket row of a plan for an agent count
///
/// The catch-all plan matches its first row whatever the count.
pub fn find_bracket_row<'a>(
    table: &'a BracketTable,
    plan: &str,
    agents: u32,
) -> Result<&'a BracketRow, PriceError> {
    if agents == 0 {
        return Err(PriceError::invalid_input("agent count must be at least 1"));
    }

    let mut rows = table.rows_for(plan);
    let row = if plan == CATCH_ALL_PLAN {
        rows.next()
    } else {
        rows.find(|row| row.contains(agents))
    };
    row.ok_or_else(|| PriceError::not_found(plan, format!("{} agents", agents)))
}

/// Quote a bracket-keyed plan; base price only
pub fn quote_bracket(
    table: &BracketTable,
    plan: &str,
    agents: u32,
) -> Result<PriceQuote, PriceError> {
    let row = find_bracket_row(table, plan, agents)?;

    let lines = table
        .currencies()
        .iter()
        .map(|&currency| {
            let base = row.prices.get(&currency).copied().flatten();
            CurrencyQuote {
                currency,
                base_price: base,
                overage: Overage::NotApplicable,
                total: base,
            }
        })
        .collect();

    debug!(plan, agents, "Computed bracket quote");
    Ok(PriceQuote {
        plan: row.plan.clone(),
        key: QuoteKey::AgentBracket {
            agents,
            agent_min: row.agent_min,
            agent_max: row.agent_max,
        },
        lines,
    })
}
