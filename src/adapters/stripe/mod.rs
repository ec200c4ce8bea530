//! Stripe payment gateway adapter.
//!
//! - `StripePaymentGateway` - Stripe Checkout over HTTPS
//! - `MockPaymentGateway` - In-process gateway for tests and local runs
//!
//! # Configuration
//!
//! Keys come from `SOUNDDROPS__PAYMENT__STRIPE_API_KEY` and
//! `SOUNDDROPS__PAYMENT__STRIPE_WEBHOOK_SECRET` (see `config::PaymentConfig`).

mod mock_gateway;
mod stripe_gateway;
mod webhook_types;

pub use mock_gateway::{MethodCall, MockPaymentGateway};
pub use stripe_gateway::{StripeConfig, StripePaymentGateway};
pub use webhook_types::{SignatureHeader, SignatureParseError, StripeCheckoutSession, StripeWebhookEvent};
