//! Currency columns carried by the price sheets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A precomputed currency column
///
/// Sheets carry one price (and, for tiered products, one overage rate) per
/// currency. Values are never converted between currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// EUR list price
    Eur,
    /// KRW list price
    Krw,
    /// KRW partner purchase price
    PartnerKrw,
}

impl Currency {
    /// All supported currencies, in column order
    pub const ALL: [Currency; 3] = [Currency::Eur, Currency::Krw, Currency::PartnerKrw];

    /// Column-name fragment (`price_<key>`, `overage_<key>`)
    pub fn key(&self) -> &'static str {
        match self {
            Currency::Eur => "eur",
            Currency::Krw => "krw",
            Currency::PartnerKrw => "partner_krw",
        }
    }

    /// Human label distinguishing list and partner prices
    pub fn label(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Krw => "KRW",
            Currency::PartnerKrw => "KRW (partner)",
        }
    }

    pub fn price_column(&self) -> String {
        format!("price_{}", self.key())
    }

    pub fn overage_column(&self) -> String {
        format!("overage_{}", self.key())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Currency::ALL
            .into_iter()
            .find(|c| c.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown currency '{}' (expected eur, krw, partner_krw)", s))
    }
}
