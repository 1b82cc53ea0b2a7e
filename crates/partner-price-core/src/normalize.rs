//! Wide-to-long normalization of the Moments sheet
//!
//! The published Moments sheet has one row per plan and one column group per
//! plan:
//!
//! ```text
//! plan, threshold_start, price_eur_start, overage_eur_start, ..., threshold_grow, price_eur_grow, ...
//! ```
//!
//! Each plan's row only carries meaningful values in its own group. The
//! normalizer projects every plan's group out of that plan's rows, renames it to
//! the canonical `threshold, price_<cur>, overage_<cur>` columns and
//! concatenates the results in Start, Grow, Scale order.

use crate::error::PriceError;
use crate::models::price_table::{ThresholdRow, ThresholdTable, TierRate, PLAN_COLUMN};
use crate::models::{Currency, TierPlan};
use crate::parsers::csv::{parse_numeric, RawTable};
use tracing::{debug, warn};

/// Name of a wide-layout column: `<base>_<plan suffix>`
pub fn wide_column(base: &str, tier: TierPlan) -> String {
    format!("{}_{}", base, tier.suffix())
}

/// Column positions of one plan's group
struct TierColumns {
    tier: TierPlan,
    threshold: usize,
    rates: Vec<(Currency, usize, usize)>,
}

impl TierColumns {
    fn resolve(raw: &RawTable, tier: TierPlan) -> Result<Self, PriceError> {
        let threshold = raw.column(&wide_column("threshold", tier))?;
        let rates = Currency::ALL
            .into_iter()
            .map(|currency| {
                let price = raw.column(&wide_column(&currency.price_column(), tier))?;
                let overage = raw.column(&wide_column(&currency.overage_column(), tier))?;
                Ok((currency, price, overage))
            })
            .collect::<Result<Vec<_>, PriceError>>()?;

        Ok(Self {
            tier,
            threshold,
            rates,
        })
    }

    fn project(&self, raw: &RawTable, row: usize) -> ThresholdRow {
        ThresholdRow {
            plan: self.tier.name().to_string(),
            threshold: parse_numeric(raw.cell(row, self.threshold)),
            rates: self
                .rates
                .iter()
                .map(|&(currency, price, overage)| {
                    (
                        currency,
                        TierRate {
                            price: parse_numeric(raw.cell(row, price)),
                            overage: parse_numeric(raw.cell(row, overage)),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Normalize a wide Moments sheet into the canonical long layout
///
/// Every plan's column group is resolved before any row is selected, so a
/// missing column fails with `PriceError::Schema` even when that plan has no
/// row. A plan without a row contributes zero rows. Unparseable cells become
/// missing values.
pub fn normalize(raw: &RawTable) -> Result<ThresholdTable, PriceError> {
    let plan_col = raw.column(PLAN_COLUMN)?;
    let groups = TierPlan::ALL
        .into_iter()
        .map(|tier| TierColumns::resolve(raw, tier))
        .collect::<Result<Vec<_>, PriceError>>()?;

    let mut rows = Vec::with_capacity(raw.len());
    for group in &groups {
        let before = rows.len();
        rows.extend(
            (0..raw.len())
                .filter(|&r| raw.cell(r, plan_col).trim() == group.tier.name())
                .map(|r| group.project(raw, r)),
        );

        match rows.len() - before {
            0 => warn!(table = %raw.name(), plan = group.tier.name(), "Plan has no row in wide sheet"),
            1 => {}
            n => warn!(
                table = %raw.name(),
                plan = group.tier.name(),
                rows = n,
                "Plan has more than one row in wide sheet"
            ),
        }
    }

    debug!(table = %raw.name(), rows = rows.len(), "Normalized wide sheet");
    Ok(ThresholdTable::new(Currency::ALL.to_vec(), rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> String {
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

    #[test]
    fn test_wide_column_names() {
        assert_eq!(wide_column("threshold", TierPlan::Grow), "threshold_grow");
        assert_eq!(
            wide_column(&Currency::PartnerKrw.overage_column(), TierPlan::Scale),
            "overage_partner_krw_scale"
        );
    }

    #[test]
    fn test_other_groups_are_ignored() {
        // Grow row carries junk in the Start group; only its own group counts
        let mut cells = vec!["Grow".to_string()];
        cells.extend(std::iter::repeat_n("999".to_string(), 7));
        cells.extend(["1000", "10", "1", "500", "5", "400", "4"].map(String::from));
        cells.extend(std::iter::repeat_n(String::new(), 7));
        let text = format!("{}\n{}\n", header(), cells.join(","));

        let table = normalize(&RawTable::from_csv_str("moments", &text).unwrap()).unwrap();
        assert_eq!(table.len(), 1);
        let row = &table.rows()[0];
        assert_eq!(row.plan, "Grow");
        assert_eq!(row.threshold, Some(1000.0));
        assert_eq!(row.rates[&Currency::Krw].price, Some(500.0));
        assert_eq!(row.rates[&Currency::PartnerKrw].overage, Some(4.0));
    }

    #[test]
    fn test_missing_plan_column() {
        let raw = RawTable::from_csv_str("moments", "name\nGrow\n").unwrap();
        match normalize(&raw) {
            Err(PriceError::Schema { column, .. }) => assert_eq!(column, "plan"),
            other => panic!("Expected Schema error, got {:?}", other),
        }
    }
}
