//! Sheet fixtures shared by the integration tests

#![allow(dead_code)]

use partner_price_core::models::{Currency, TierPlan};
use partner_price_core::normalize::wide_column;

/// Header of a wide Moments sheet with every plan group
pub fn wide_header() -> String {
    let mut cols = vec!["plan".to_string()];
    for tier in TierPlan::ALL {
        cols.push(wide_column("threshold", tier));
        for currency in Currency::ALL {
            cols.push(wide_column(&currency.price_column(), tier));
            cols.push(wide_column(&currency.overage_column(), tier));
        }
    }
    cols.join(",")
}

/// Wide row for `tier` whose own group holds `group`
/// (`threshold, price_eur, overage_eur, price_krw, overage_krw, price_partner_krw, overage_partner_krw`);
/// the other groups hold `filler`
pub fn wide_row(tier: TierPlan, group: [&str; 7], filler: &str) -> String {
    let mut cells = vec![tier.name().to_string()];
    for other in TierPlan::ALL {
        if other == tier {
            cells.extend(group.iter().map(|c| c.to_string()));
        } else {
            cells.extend(std::iter::repeat_n(filler.to_string(), 7));
        }
    }
    cells.join(",")
}

/// A three-plan Moments sheet; filler cells are junk that must never leak
pub fn moments_csv() -> String {
    [
        wide_header(),
        wide_row(TierPlan::Start, ["500", "10", "0.01", "15000", "15", "12000", "12"], "777"),
        wide_row(TierPlan::Grow, ["1000", "400", "0.04", "500000", "50", "450000", "45"], "888"),
        wide_row(TierPlan::Scale, ["5000", "900", "0.03", "1200000", "40", "1000000", "35"], "999"),
    ]
    .join("\n")
        + "\n"
}

pub const ANSWERS_CSV: &str = "\
plan,threshold,price_eur,overage_eur,price_krw,overage_krw,price_partner_krw,overage_partner_krw
Start,1000,100,0.1,150000,150,120000,120
Grow,1000,500000,50,500000,50,450000,45
Grow,5000,2000,0.05,2600000,65,2300000,58
Scale,10000,,,5000000,40,4500000,36
";

pub const CONVERSATIONS_CSV: &str = "\
plan,agent_min,agent_max,price_eur,price_krw,price_partner_krw
Start,ALL,ALL,50,70000,60000
Grow,1,10,100,140000,120000
Grow,11,50,90,126000,108000
Grow,51,,80,112000,96000
Scale,1,20,150,210000,180000
Scale,21,,130,182000,156000
";
