//! Billing handlers.
//!
//! ## Commands
//! - Starting a purchase or subscription checkout
//! - Applying an observed payment status (shared by poll and webhook)
//! - Processing gateway webhooks
//! - Cancelling a subscription
//!
//! ## Queries
//! - Polling a checkout session
//! - Subscription status, purchase history, creator earnings
//! - Access decisions and content downloads

mod authorize_content;
mod cancel_subscription;
mod download_content;
mod get_creator_earnings;
mod get_payment_status;
mod get_subscription_status;
mod handle_payment_webhook;
mod list_purchases;
mod policy;
mod reconcile_payment;
mod start_checkout;
mod subscription_lifecycle;

#[cfg(test)]
mod fixtures;

pub use policy::BillingPolicy;
pub use subscription_lifecycle::SubscriptionLifecycle;

// Commands
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, WebhookDisposition,
};
pub use reconcile_payment::{
    ApplyObservedStatusCommand, ApplyObservedStatusHandler, ApplyObservedStatusResult,
};
pub use start_checkout::{
    CheckoutIntent, StartCheckoutCommand, StartCheckoutHandler, StartCheckoutResult,
};

// Queries
pub use authorize_content::{AuthorizeContentHandler, AuthorizeContentQuery, AuthorizeContentResult};
pub use download_content::{DownloadContentHandler, DownloadContentQuery, DownloadContentResult};
pub use get_creator_earnings::{GetCreatorEarningsHandler, GetCreatorEarningsQuery};
pub use get_payment_status::{GetPaymentStatusHandler, GetPaymentStatusQuery, GetPaymentStatusResult};
pub use get_subscription_status::{
    GetSubscriptionStatusHandler, GetSubscriptionStatusQuery, GetSubscriptionStatusResult,
};
pub use list_purchases::{ListPurchasesHandler, ListPurchasesQuery, ListPurchasesResult};
