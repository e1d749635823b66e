//! The fixed set of explanatory factors for sales diagnostics
//!
//! Declaration order is canonical: correlation output, contribution
//! summation, and tie-breaking all iterate `Factor::ALL` in this order so
//! results are deterministic run to run.

use serde::Serialize;
use std::fmt;

/// One of the five explanatory variables related to sales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Factor {
    /// Mean unit price charged by a store in a month
    AvgPrice,
    /// Promotional pressure from competitors
    CompetitionPromotions,
    /// Staff absences during the month
    StaffAbsences,
    /// Marketing spend for the month
    MarketingInvestment,
    /// Leftover stock as a percentage of units
    StockPercent,
}

impl Factor {
    /// Canonical declaration order for all factor iteration
    pub const ALL: [Factor; 5] = [
        Factor::AvgPrice,
        Factor::CompetitionPromotions,
        Factor::StaffAbsences,
        Factor::MarketingInvestment,
        Factor::StockPercent,
    ];

    /// Canonical field name in normalized output
    pub fn name(&self) -> &'static str {
        match self {
            Factor::AvgPrice => "avg_price",
            Factor::CompetitionPromotions => "competition_promotions",
            Factor::StaffAbsences => "staff_absences",
            Factor::MarketingInvestment => "marketing_investment",
            Factor::StockPercent => "stock_percent",
        }
    }

    /// Position in `Factor::ALL`
    pub fn index(&self) -> usize {
        match self {
            Factor::AvgPrice => 0,
            Factor::CompetitionPromotions => 1,
            Factor::StaffAbsences => 2,
            Factor::MarketingInvestment => 3,
            Factor::StockPercent => 4,
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
