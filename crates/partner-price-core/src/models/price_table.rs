//! Typed price tables
//!
//! Two shapes exist. Moments and Answers are keyed by a capacity threshold and
//! carry an overage rate per currency; Conversations is keyed by an agent-count
//! bracket and carries a base price only. Column names are resolved once, when a
//! `RawTable` is converted; lookups afterwards work on typed rows.

use crate::error::{LoadReport, PriceError};
use crate::models::currency::Currency;
use crate::models::product::{TableShape, CATCH_ALL_PLAN};
use crate::parsers::csv::{parse_numeric, RawTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Column holding the plan name in every layout
pub const PLAN_COLUMN: &str = "plan";
/// Column holding the capacity threshold in canonical threshold sheets
pub const THRESHOLD_COLUMN: &str = "threshold";
pub const AGENT_MIN_COLUMN: &str = "agent_min";
pub const AGENT_MAX_COLUMN: &str = "agent_max";

/// Base price and overage rate of one currency; `None` marks a missing value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierRate {
    pub price: Option<f64>,
    /// Cost per unit above the threshold
    pub overage: Option<f64>,
}

/// One (plan, threshold) row of a canonical sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRow {
    pub plan: String,
    pub threshold: Option<f64>,
    pub rates: BTreeMap<Currency, TierRate>,
}

/// Canonical long-format sheet keyed by (plan, threshold)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable {
    currencies: Vec<Currency>,
    rows: Vec<ThresholdRow>,
}

impl ThresholdTable {
    pub fn new(currencies: Vec<Currency>, rows: Vec<ThresholdRow>) -> Self {
        Self { currencies, rows }
    }

    /// Read a sheet already in canonical layout (`plan, threshold, price_<cur>, overage_<cur>`)
    ///
    /// Every currency with a price column must also have its overage column.
    pub fn from_raw(raw: &RawTable) -> Result<Self, PriceError> {
        let plan_col = raw.column(PLAN_COLUMN)?;
        let threshold_col = raw.column(THRESHOLD_COLUMN)?;

        let mut columns = Vec::new();
        for currency in Currency::ALL {
            let price = raw.find_column(&currency.price_column());
            let overage = raw.find_column(&currency.overage_column());
            match (price, overage) {
                (Some(p), Some(o)) => columns.push((currency, p, o)),
                (Some(_), None) => return Err(PriceError::schema(raw.name(), currency.overage_column())),
                (None, Some(_)) => return Err(PriceError::schema(raw.name(), currency.price_column())),
                (None, None) => {}
            }
        }
        if columns.is_empty() {
            return Err(PriceError::schema(raw.name(), "price_<currency>"));
        }

        let rows = (0..raw.len())
            .map(|r| ThresholdRow {
                plan: raw.cell(r, plan_col).trim().to_string(),
                threshold: parse_numeric(raw.cell(r, threshold_col)),
                rates: columns
                    .iter()
                    .map(|&(currency, p, o)| {
                        (
                            currency,
                            TierRate {
                                price: parse_numeric(raw.cell(r, p)),
                                overage: parse_numeric(raw.cell(r, o)),
                            },
                        )
                    })
                    .collect(),
            })
            .collect();

        Ok(Self {
            currencies: columns.iter().map(|&(c, _, _)| c).collect(),
            rows,
        })
    }

    /// Render back to canonical layout; missing values become empty cells
    pub fn to_raw(&self, name: impl Into<String>) -> RawTable {
        let mut headers = vec![PLAN_COLUMN.to_string(), THRESHOLD_COLUMN.to_string()];
        for currency in &self.currencies {
            headers.push(currency.price_column());
            headers.push(currency.overage_column());
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![row.plan.clone(), format_cell(row.threshold)];
                for currency in &self.currencies {
                    let rate = row.rates.get(currency);
                    cells.push(format_cell(rate.and_then(|r| r.price)));
                    cells.push(format_cell(rate.and_then(|r| r.overage)));
                }
                cells
            })
            .collect();

        RawTable::new(name, headers, rows)
    }

    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    pub fn rows(&self) -> &[ThresholdRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows_for<'a, 'p>(&'a self, plan: &'p str) -> impl Iterator<Item = &'a ThresholdRow> + 'p
    where
        'a: 'p,
    {
        self.rows.iter().filter(move |row| row.plan == plan)
    }

    /// Distinct plan names, sorted ascending
    pub fn plans(&self) -> Vec<String> {
        distinct_plans(self.rows.iter().map(|r| r.plan.as_str()))
    }

    /// Distinct non-missing thresholds of a plan, sorted ascending
    ///
    /// A threshold is a valid selection only if it is in this list.
    pub fn thresholds_for(&self, plan: &str) -> Vec<f64> {
        let mut thresholds: Vec<f64> = self.rows_for(plan).filter_map(|r| r.threshold).collect();
        thresholds.sort_by(f64::total_cmp);
        thresholds.dedup();
        thresholds
    }

    /// Record data-quality problems that do not prevent quoting
    pub fn check(&self, source: &str, report: &mut LoadReport) {
        for plan in self.plans() {
            let mut seen = Vec::new();
            for row in self.rows_for(&plan) {
                match row.threshold {
                    None => report.add_warning(
                        source,
                        format!("plan '{}' has a row without a numeric threshold", plan),
                    ),
                    Some(t) if seen.contains(&t) => report.add_warning(
                        source,
                        format!("plan '{}' lists threshold {} more than once", plan, t),
                    ),
                    Some(t) => seen.push(t),
                }
            }
        }
    }
}

/// One agent-count bracket of the Conversations sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketRow {
    pub plan: String,
    pub agent_min: Option<u32>,
    /// `None` on the last bracket means no upper bound
    pub agent_max: Option<u32>,
    pub prices: BTreeMap<Currency, Option<f64>>,
}

impl BracketRow {
    /// Inclusive on both bounds; rows without `agent_min` never match
    pub fn contains(&self, agents: u32) -> bool {
        match self.agent_min {
            Some(min) => agents >= min && self.agent_max.is_none_or(|max| agents <= max),
            None => false,
        }
    }
}

/// Conversations sheet keyed by (plan, agent bracket)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketTable {
    currencies: Vec<Currency>,
    rows: Vec<BracketRow>,
}

impl BracketTable {
    pub fn new(currencies: Vec<Currency>, rows: Vec<BracketRow>) -> Self {
        Self { currencies, rows }
    }

    /// Read a sheet with `plan, agent_min, agent_max, price_<cur>` columns
    pub fn from_raw(raw: &RawTable) -> Result<Self, PriceError> {
        let plan_col = raw.column(PLAN_COLUMN)?;
        let min_col = raw.column(AGENT_MIN_COLUMN)?;
        let max_col = raw.column(AGENT_MAX_COLUMN)?;

        let columns: Vec<(Currency, usize)> = Currency::ALL
            .into_iter()
            .filter_map(|c| raw.find_column(&c.price_column()).map(|idx| (c, idx)))
            .collect();
        if columns.is_empty() {
            return Err(PriceError::schema(raw.name(), "price_<currency>"));
        }

        let rows = (0..raw.len())
            .map(|r| BracketRow {
                plan: raw.cell(r, plan_col).trim().to_string(),
                agent_min: parse_agent_count(raw.cell(r, min_col)),
                agent_max: parse_agent_count(raw.cell(r, max_col)),
                prices: columns
                    .iter()
                    .map(|&(currency, idx)| (currency, parse_numeric(raw.cell(r, idx))))
                    .collect(),
            })
            .collect();

        Ok(Self {
            currencies: columns.iter().map(|&(c, _)| c).collect(),
            rows,
        })
    }

    /// Render back to `plan, agent_min, agent_max, price_<cur>` layout
    pub fn to_raw(&self, name: impl Into<String>) -> RawTable {
        let mut headers = vec![
            PLAN_COLUMN.to_string(),
            AGENT_MIN_COLUMN.to_string(),
            AGENT_MAX_COLUMN.to_string(),
        ];
        headers.extend(self.currencies.iter().map(Currency::price_column));

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut cells = vec![
                    row.plan.clone(),
                    row.agent_min.map(|v| v.to_string()).unwrap_or_default(),
                    row.agent_max.map(|v| v.to_string()).unwrap_or_default(),
                ];
                for currency in &self.currencies {
                    cells.push(format_cell(row.prices.get(currency).copied().flatten()));
                }
                cells
            })
            .collect();

        RawTable::new(name, headers, rows)
    }

    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    pub fn rows(&self) -> &[BracketRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows_for<'a, 'p>(&'a self, plan: &'p str) -> impl Iterator<Item = &'a BracketRow> + 'p
    where
        'a: 'p,
    {
        self.rows.iter().filter(move |row| row.plan == plan)
    }

    /// Distinct plan names, sorted ascending
    pub fn plans(&self) -> Vec<String> {
        distinct_plans(self.rows.iter().map(|r| r.plan.as_str()))
    }

    /// Brackets of a plan ordered by lower bound
    pub fn brackets_for(&self, plan: &str) -> Vec<&BracketRow> {
        let mut rows: Vec<&BracketRow> = self.rows_for(plan).collect();
        rows.sort_by_key(|r| r.agent_min);
        rows
    }

    /// Check that each bracketed plan partitions `1..` without gaps or overlaps
    ///
    /// The catch-all plan is exempt. Only the highest bracket may leave
    /// `agent_max` open.
    pub fn validate_partition(&self) -> Result<(), PriceError> {
        for plan in self.plans() {
            if plan == CATCH_ALL_PLAN {
                continue;
            }
            let invalid = |message: String| PriceError::InvalidBrackets {
                plan: plan.clone(),
                message,
            };

            let brackets = self.brackets_for(&plan);
            // `None` once a bracket has closed at u32::MAX
            let mut next_min: Option<u32> = Some(1);
            for (idx, row) in brackets.iter().enumerate() {
                let min = row
                    .agent_min
                    .ok_or_else(|| invalid("bracket without numeric agent_min".to_string()))?;
                let Some(expected_min) = next_min else {
                    return Err(invalid(format!(
                        "bracket starting at {} overlaps the previous one",
                        min
                    )));
                };
                if min != expected_min {
                    return Err(invalid(if min > expected_min {
                        format!("agent counts {}..{} are not covered", expected_min, min - 1)
                    } else {
                        format!("bracket starting at {} overlaps the previous one", min)
                    }));
                }

                match row.agent_max {
                    Some(max) if max < min => {
                        return Err(invalid(format!(
                            "bracket {}-{} has agent_max below agent_min",
                            min, max
                        )))
                    }
                    Some(max) => next_min = max.checked_add(1),
                    None if idx + 1 < brackets.len() => {
                        return Err(invalid(format!(
                            "open-ended bracket starting at {} is not the last one",
                            min
                        )))
                    }
                    None => {}
                }
            }
        }
        Ok(())
    }

    /// Record data-quality problems that do not prevent quoting
    pub fn check(&self, source: &str, report: &mut LoadReport) {
        let catch_all = self.rows_for(CATCH_ALL_PLAN).count();
        if catch_all > 1 {
            report.add_warning(
                source,
                format!(
                    "plan '{}' has {} rows, only the first one is used",
                    CATCH_ALL_PLAN, catch_all
                ),
            );
        }
    }
}

/// A loaded sheet of either shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum PriceTable {
    ThresholdKeyed(ThresholdTable),
    BracketKeyed(BracketTable),
}

impl PriceTable {
    pub fn shape(&self) -> TableShape {
        match self {
            PriceTable::ThresholdKeyed(_) => TableShape::ThresholdKeyed,
            PriceTable::BracketKeyed(_) => TableShape::BracketKeyed,
        }
    }

    pub fn plans(&self) -> Vec<String> {
        match self {
            PriceTable::ThresholdKeyed(t) => t.plans(),
            PriceTable::BracketKeyed(t) => t.plans(),
        }
    }

    pub fn currencies(&self) -> &[Currency] {
        match self {
            PriceTable::ThresholdKeyed(t) => t.currencies(),
            PriceTable::BracketKeyed(t) => t.currencies(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PriceTable::ThresholdKeyed(t) => t.len(),
            PriceTable::BracketKeyed(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_raw(&self, name: impl Into<String>) -> RawTable {
        match self {
            PriceTable::ThresholdKeyed(t) => t.to_raw(name),
            PriceTable::BracketKeyed(t) => t.to_raw(name),
        }
    }
}

fn distinct_plans<'a>(plans: impl Iterator<Item = &'a str>) -> Vec<String> {
    plans
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn parse_agent_count(cell: &str) -> Option<u32> {
    parse_numeric(cell)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
}

fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
