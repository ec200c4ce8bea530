//! Payment configuration (Stripe + pricing)

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::stripe::StripeConfig;
use crate::application::handlers::billing::BillingPolicy;

use super::error::ValidationError;

/// Gateway credentials and the prices the service charges.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    pub stripe_api_key: SecretString,

    pub stripe_webhook_secret: SecretString,

    /// Override for the Stripe API host (stripe-mock, proxies)
    pub api_base_url: Option<String>,

    #[serde(default = "default_currency")]
    pub currency: String,

    #[serde(default = "default_subscription_price")]
    pub subscription_price_cents: i64,

    #[serde(default = "default_subscription_period")]
    pub subscription_period_days: i64,

    #[serde(default = "default_gateway_timeout")]
    pub gateway_timeout_secs: u64,

    /// Maximum age of a signed webhook
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Settings for the Stripe adapter.
    pub fn stripe_config(&self) -> StripeConfig {
        let config = StripeConfig::new(
            self.stripe_api_key.clone(),
            self.stripe_webhook_secret.clone(),
        )
        .with_timeout(Duration::from_secs(self.gateway_timeout_secs))
        .with_tolerance_secs(self.webhook_tolerance_secs);

        match &self.api_base_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        }
    }

    /// Pricing rules for the checkout and reconcile handlers.
    pub fn billing_policy(&self) -> BillingPolicy {
        BillingPolicy {
            currency: self.currency.to_lowercase(),
            subscription_price_cents: self.subscription_price_cents,
            subscription_period_days: self.subscription_period_days,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();

        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_API_KEY"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__STRIPE_WEBHOOK_SECRET"));
        }
        if !(api_key.starts_with("sk_") || api_key.starts_with("rk_")) {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency);
        }
        if self.subscription_price_cents <= 0 {
            return Err(ValidationError::InvalidSubscriptionPrice);
        }
        if !(1..=366).contains(&self.subscription_period_days) {
            return Err(ValidationError::InvalidSubscriptionPeriod);
        }
        if !(1..=60).contains(&self.gateway_timeout_secs) {
            return Err(ValidationError::InvalidGatewayTimeout);
        }
        Ok(())
    }
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_subscription_price() -> i64 {
    500
}

fn default_subscription_period() -> i64 {
    30
}

fn default_gateway_timeout() -> u64 {
    10
}

fn default_webhook_tolerance() -> i64 {
    300
}
