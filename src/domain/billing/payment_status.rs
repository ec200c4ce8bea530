//! Payment status state machine.
//!
//! Status only ever moves forward out of `Pending`; every other state is
//! terminal. Reconciliation relies on this to make repeated or reordered
//! observations harmless.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{StateMachine, ValidationError};

/// Local payment status of a checkout transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Checkout created, payment outcome not yet known.
    Pending,

    /// Gateway confirmed payment. Entitlement has been granted.
    Paid,

    /// Gateway reported the payment as failed.
    Failed,

    /// Checkout session lapsed without payment.
    Expired,
}

impl PaymentStatus {
    /// Returns the storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }

    /// Returns true once the outcome is final.
    pub fn is_settled(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Paid) | (Pending, Failed) | (Pending, Expired)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Paid, Failed, Expired],
            Paid | Failed | Expired => vec![],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "expired" => Ok(PaymentStatus::Expired),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown status '{}'", other),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_moves_to_every_outcome() {
        for target in [PaymentStatus::Paid, PaymentStatus::Failed, PaymentStatus::Expired] {
            assert_eq!(PaymentStatus::Pending.transition_to(target), Ok(target));
        }
    }

    #[test]
    fn paid_never_regresses() {
        assert!(PaymentStatus::Paid.transition_to(PaymentStatus::Pending).is_err());
        assert!(PaymentStatus::Paid.transition_to(PaymentStatus::Failed).is_err());
        assert!(PaymentStatus::Paid.is_terminal());
    }

    #[test]
    fn failed_and_expired_are_terminal() {
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Expired.is_terminal());
        assert!(!PaymentStatus::Failed.can_transition_to(&PaymentStatus::Paid));
    }

    #[test]
    fn pending_to_pending_is_not_a_transition() {
        assert!(!PaymentStatus::Pending.can_transition_to(&PaymentStatus::Pending));
    }

    #[test]
    fn status_parses_its_own_storage_form() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
            PaymentStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
        }
        assert!("refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&PaymentStatus::Paid).unwrap(), "\"paid\"");
    }
}
