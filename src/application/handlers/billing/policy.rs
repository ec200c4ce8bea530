//! Pricing and period settings shared by the billing handlers.

/// Fixed billing parameters, taken from `PaymentConfig` at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingPolicy {
    /// Lowercase ISO currency for every checkout.
    pub currency: String,
    pub subscription_price_cents: i64,
    /// Length of one paid subscription period.
    pub subscription_period_days: i64,
}

impl Default for BillingPolicy {
    fn default() -> Self {
        Self {
            currency: "usd".to_string(),
            subscription_price_cents: 500,
            subscription_period_days: 30,
        }
    }
}
