//! Creator earnings aggregation.
//!
//! Revenue is the sum of purchase amounts for a creator's packs. The platform
//! keeps [`PLATFORM_FEE_PERCENT`], rounded down to the cent; the creator gets
//! the rest, so the two parts always add up to the total.

use serde::{Deserialize, Serialize};

/// Share of revenue kept by the platform.
pub const PLATFORM_FEE_PERCENT: i64 = 10;

/// Summary of a creator's catalog performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreatorEarnings {
    pub total_packs: u64,
    pub total_sales: u64,
    pub total_downloads: u64,
    pub total_revenue_cents: i64,
    pub creator_earnings_cents: i64,
    pub platform_fee_cents: i64,
}

impl CreatorEarnings {
    /// Builds the summary from raw counts and sale amounts.
    pub fn compute(total_packs: u64, sale_amounts_cents: &[i64], total_downloads: u64) -> Self {
        let total_revenue_cents: i64 = sale_amounts_cents.iter().sum();
        let platform_fee_cents = total_revenue_cents * PLATFORM_FEE_PERCENT / 100;

        Self {
            total_packs,
            total_sales: sale_amounts_cents.len() as u64,
            total_downloads,
            total_revenue_cents,
            creator_earnings_cents: total_revenue_cents - platform_fee_cents,
            platform_fee_cents,
        }
    }
}
