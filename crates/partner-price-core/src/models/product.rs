//! Products and plan tiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plan name whose Conversations row covers every agent count
pub const CATCH_ALL_PLAN: &str = "Start";

/// How a product's price sheet is keyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableShape {
    /// One row per (plan, capacity threshold), with overage rates
    ThresholdKeyed,
    /// One row per (plan, agent-count bracket), base price only
    BracketKeyed,
}

/// Product whose price sheet can be quoted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Product {
    Moments,
    Conversations,
    Answers,
}

impl Product {
    pub const ALL: [Product; 3] = [Product::Moments, Product::Conversations, Product::Answers];

    pub fn name(&self) -> &'static str {
        match self {
            Product::Moments => "Moments",
            Product::Conversations => "Conversations",
            Product::Answers => "Answers",
        }
    }

    /// Lower-case identifier used for cache entries and CLI arguments
    pub fn key(&self) -> &'static str {
        match self {
            Product::Moments => "moments",
            Product::Conversations => "conversations",
            Product::Answers => "answers",
        }
    }

    pub fn shape(&self) -> TableShape {
        match self {
            Product::Moments | Product::Answers => TableShape::ThresholdKeyed,
            Product::Conversations => TableShape::BracketKeyed,
        }
    }

    /// Moments is published in the wide per-plan layout and must be normalized
    pub fn is_wide(&self) -> bool {
        matches!(self, Product::Moments)
    }

    /// File name of the published sheet
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Product::Moments => "moments_price.csv",
            Product::Conversations => "conversations_price.csv",
            Product::Answers => "answers_price.csv",
        }
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Product {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Product::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "unknown product '{}' (expected moments, conversations, answers)",
                    s
                )
            })
    }
}

/// Plan tier of the wide Moments sheet
///
/// Each tier owns one column group (`threshold_<suffix>`, `price_<cur>_<suffix>`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierPlan {
    Start,
    Grow,
    Scale,
}

impl TierPlan {
    /// Concatenation order of the normalized table
    pub const ALL: [TierPlan; 3] = [TierPlan::Start, TierPlan::Grow, TierPlan::Scale];

    /// Value of the `plan` cell selecting this tier's row
    pub fn name(&self) -> &'static str {
        match self {
            TierPlan::Start => "Start",
            TierPlan::Grow => "Grow",
            TierPlan::Scale => "Scale",
        }
    }

    /// Column-name suffix of this tier's group
    pub fn suffix(&self) -> &'static str {
        match self {
            TierPlan::Start => "start",
            TierPlan::Grow => "grow",
            TierPlan::Scale => "scale",
        }
    }
}
