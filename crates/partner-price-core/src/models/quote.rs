//! Quote produced by the calculator

use crate::models::currency::Currency;
use serde::{Deserialize, Serialize};

/// Overage part of a quote for one currency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Overage {
    /// Usage beyond the threshold was priced at `rate` per unit
    Charged {
        rate: Option<f64>,
        quantity: u64,
        cost: Option<f64>,
    },
    /// The product has no overage pricing; only the base price applies
    NotApplicable,
}

impl Overage {
    pub fn cost(&self) -> Option<f64> {
        match self {
            Overage::Charged { cost, .. } => *cost,
            Overage::NotApplicable => None,
        }
    }

    pub fn is_applicable(&self) -> bool {
        matches!(self, Overage::Charged { .. })
    }
}

/// Quote amounts in a single currency; `None` means an input price was missing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrencyQuote {
    pub currency: Currency,
    pub base_price: Option<f64>,
    pub overage: Overage,
    pub total: Option<f64>,
}

/// Row that was matched for the quote
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuoteKey {
    Threshold {
        threshold: f64,
    },
    AgentBracket {
        agents: u32,
        agent_min: Option<u32>,
        agent_max: Option<u32>,
    },
}

/// Estimated purchase cost for one plan selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub plan: String,
    pub key: QuoteKey,
    pub lines: Vec<CurrencyQuote>,
}

impl PriceQuote {
    pub fn line(&self, currency: Currency) -> Option<&CurrencyQuote> {
        self.lines.iter().find(|l| l.currency == currency)
    }

    /// False for bracket-keyed products, which are priced on base price alone
    pub fn has_overage_pricing(&self) -> bool {
        self.lines.iter().any(|l| l.overage.is_applicable())
    }
}
