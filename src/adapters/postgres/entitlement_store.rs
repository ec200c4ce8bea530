//! PostgreSQL implementation of the entitlement store ports.
//!
//! A reconciliation commit is one database transaction:
//!
//! 1. `UPDATE transactions ... WHERE session_id = $1 AND payment_status = $previous`
//!    (zero rows means another observer got there first: `Stale`)
//! 2. `INSERT INTO purchases ... ON CONFLICT (user_id, content_id) DO NOTHING`
//! 3. For subscriptions, a per-user advisory lock serialises the read of the
//!    active row with the grant that follows it
//!
//! The partial unique index `subscriptions_one_active_per_user` backs up the
//! lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::domain::billing::{
    plan_subscription_grant, EntitlementCommand, PaymentStatus, Purchase, Reconciliation,
    Subscription, SubscriptionGrant, SubscriptionStatus, Transaction, TransactionKind,
};
use crate::domain::foundation::{
    CheckoutSessionId, ContentId, DomainError, ErrorCode, PurchaseId, SubscriptionId, Timestamp,
    TransactionId, UserId,
};
use crate::ports::{CommitResult, PurchaseRepository, SubscriptionRepository, TransactionRepository};

type PgTransaction<'c> = sqlx::Transaction<'c, Postgres>;

/// PostgreSQL-backed transactions, purchases and subscriptions.
#[derive(Clone)]
pub struct PostgresEntitlementStore {
    pool: PgPool,
}

impl PostgresEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Rows
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    session_id: String,
    user_id: String,
    amount_cents: i64,
    currency: String,
    payment_status: String,
    kind: String,
    target_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            session_id: CheckoutSessionId::new(row.session_id).map_err(corrupt)?,
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            amount_cents: row.amount_cents,
            currency: row.currency,
            payment_status: row.payment_status.parse::<PaymentStatus>().map_err(corrupt)?,
            kind: row.kind.parse::<TransactionKind>().map_err(corrupt)?,
            target_ref: row.target_ref.map(ContentId::new).transpose().map_err(corrupt)?,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    user_id: String,
    content_id: String,
    amount_cents: i64,
    session_id: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = DomainError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        Ok(Purchase {
            id: PurchaseId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            content_id: ContentId::new(row.content_id).map_err(corrupt)?,
            amount_cents: row.amount_cents,
            session_id: CheckoutSessionId::new(row.session_id).map_err(corrupt)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    gateway_subscription_ref: String,
    status: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            gateway_subscription_ref: CheckoutSessionId::new(row.gateway_subscription_ref)
                .map_err(corrupt)?,
            status: row.status.parse::<SubscriptionStatus>().map_err(corrupt)?,
            created_at: Timestamp::from_datetime(row.created_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn corrupt(e: impl std::fmt::Display) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Corrupt row: {}", e))
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Failed to {}: {}", action, e))
}

fn id_strings(ids: &[ContentId]) -> Vec<String> {
    ids.iter().map(|id| id.as_str().to_string()).collect()
}

const TRANSACTION_COLUMNS: &str = "id, session_id, user_id, amount_cents, currency, \
     payment_status, kind, target_ref, created_at, updated_at";

const SUBSCRIPTION_COLUMNS: &str =
    "id, user_id, gateway_subscription_ref, status, created_at, expires_at, updated_at";

// ════════════════════════════════════════════════════════════════════════════════
// Reconciliation commands
// ════════════════════════════════════════════════════════════════════════════════

async fn apply_command(
    tx: &mut PgTransaction<'_>,
    command: &EntitlementCommand,
) -> Result<(), DomainError> {
    match command {
        EntitlementCommand::GrantPurchase(purchase) => {
            sqlx::query(
                r#"
                INSERT INTO purchases (id, user_id, content_id, amount_cents, session_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (user_id, content_id) DO NOTHING
                "#,
            )
            .bind(purchase.id.as_uuid())
            .bind(purchase.user_id.as_str())
            .bind(purchase.content_id.as_str())
            .bind(purchase.amount_cents)
            .bind(purchase.session_id.as_str())
            .bind(purchase.created_at.as_datetime())
            .execute(&mut **tx)
            .await
            .map_err(|e| db_error("insert purchase", e))?;
            Ok(())
        }
        EntitlementCommand::GrantSubscription {
            user_id,
            gateway_subscription_ref,
            period_days,
            granted_at,
        } => {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(user_id.as_str())
                .execute(&mut **tx)
                .await
                .map_err(|e| db_error("lock subscriptions", e))?;

            let existing = sqlx::query_as::<_, SubscriptionRow>(&format!(
                "SELECT {} FROM subscriptions WHERE user_id = $1 AND status = 'active' FOR UPDATE",
                SUBSCRIPTION_COLUMNS
            ))
            .bind(user_id.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| db_error("read active subscription", e))?
            .map(Subscription::try_from)
            .transpose()?;

            let grant = plan_subscription_grant(
                existing.as_ref(),
                user_id,
                gateway_subscription_ref,
                *granted_at,
                *period_days,
            );
            apply_grant(tx, grant, *granted_at).await
        }
    }
}

async fn apply_grant(
    tx: &mut PgTransaction<'_>,
    grant: SubscriptionGrant,
    now: Timestamp,
) -> Result<(), DomainError> {
    match grant {
        SubscriptionGrant::Insert(subscription) => insert_subscription(tx, &subscription).await,
        SubscriptionGrant::Extend {
            id,
            expires_at,
            gateway_subscription_ref,
        } => {
            sqlx::query(
                r#"
                UPDATE subscriptions
                SET expires_at = $2, gateway_subscription_ref = $3, updated_at = $4
                WHERE id = $1
                "#,
            )
            .bind(id.as_uuid())
            .bind(expires_at.as_datetime())
            .bind(gateway_subscription_ref.as_str())
            .bind(now.as_datetime())
            .execute(&mut **tx)
            .await
            .map_err(|e| db_error("extend subscription", e))?;
            Ok(())
        }
        SubscriptionGrant::ExpireAndInsert {
            expired,
            replacement,
        } => {
            sqlx::query("UPDATE subscriptions SET status = 'expired', updated_at = $2 WHERE id = $1")
                .bind(expired.as_uuid())
                .bind(now.as_datetime())
                .execute(&mut **tx)
                .await
                .map_err(|e| db_error("expire subscription", e))?;
            insert_subscription(tx, &replacement).await
        }
    }
}

async fn insert_subscription(
    tx: &mut PgTransaction<'_>,
    subscription: &Subscription,
) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (
            id, user_id, gateway_subscription_ref, status, created_at, expires_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(subscription.id.as_uuid())
    .bind(subscription.user_id.as_str())
    .bind(subscription.gateway_subscription_ref.as_str())
    .bind(subscription.status.as_str())
    .bind(subscription.created_at.as_datetime())
    .bind(subscription.expires_at.as_datetime())
    .bind(subscription.updated_at.as_datetime())
    .execute(&mut **tx)
    .await
    .map_err(|e| db_error("insert subscription", e))?;
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════════
// Ports
// ════════════════════════════════════════════════════════════════════════════════

#[async_trait]
impl TransactionRepository for PostgresEntitlementStore {
    async fn save(&self, transaction: &Transaction) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, session_id, user_id, amount_cents, currency, payment_status,
                kind, target_ref, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.session_id.as_str())
        .bind(transaction.user_id.as_str())
        .bind(transaction.amount_cents)
        .bind(&transaction.currency)
        .bind(transaction.payment_status.as_str())
        .bind(transaction.kind.as_str())
        .bind(transaction.target_ref.as_ref().map(|c| c.as_str()))
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("transactions_session_id_key") {
                    return DomainError::validation(
                        "session_id",
                        format!("Transaction already exists for session {}", transaction.session_id),
                    );
                }
            }
            db_error("save transaction", e)
        })?;

        Ok(())
    }

    async fn find_by_session_id(
        &self,
        session_id: &CheckoutSessionId,
    ) -> Result<Option<Transaction>, DomainError> {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE session_id = $1",
            TRANSACTION_COLUMNS
        ))
        .bind(session_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find transaction", e))?
        .map(Transaction::try_from)
        .transpose()
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, DomainError> {
        sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list transactions", e))?
        .into_iter()
        .map(Transaction::try_from)
        .collect()
    }

    async fn commit_reconciliation(
        &self,
        reconciliation: &Reconciliation,
    ) -> Result<CommitResult, DomainError> {
        if reconciliation.is_noop() {
            return Ok(CommitResult::Applied);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        let updated = sqlx::query(
            r#"
            UPDATE transactions
            SET payment_status = $3, updated_at = $4
            WHERE session_id = $1 AND payment_status = $2
            "#,
        )
        .bind(reconciliation.session_id.as_str())
        .bind(reconciliation.previous.as_str())
        .bind(reconciliation.next.as_str())
        .bind(reconciliation.decided_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("update payment status", e))?;

        if updated.rows_affected() == 0 {
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT payment_status FROM transactions WHERE session_id = $1")
                    .bind(reconciliation.session_id.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| db_error("read payment status", e))?;
            tx.rollback()
                .await
                .map_err(|e| db_error("roll back", e))?;

            return match exists {
                Some(_) => Ok(CommitResult::Stale),
                None => Err(DomainError::new(
                    ErrorCode::UnknownSession,
                    format!("No transaction for session {}", reconciliation.session_id),
                )),
            };
        }

        for command in &reconciliation.commands {
            apply_command(&mut tx, command).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("commit reconciliation", e))?;

        Ok(CommitResult::Applied)
    }
}

#[async_trait]
impl PurchaseRepository for PostgresEntitlementStore {
    async fn find(
        &self,
        user_id: &UserId,
        content_id: &ContentId,
    ) -> Result<Option<Purchase>, DomainError> {
        sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, user_id, content_id, amount_cents, session_id, created_at
            FROM purchases
            WHERE user_id = $1 AND content_id = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(content_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find purchase", e))?
        .map(Purchase::try_from)
        .transpose()
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Purchase>, DomainError> {
        sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, user_id, content_id, amount_cents, session_id, created_at
            FROM purchases
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list purchases", e))?
        .into_iter()
        .map(Purchase::try_from)
        .collect()
    }

    async fn list_by_content(
        &self,
        content_ids: &[ContentId],
    ) -> Result<Vec<Purchase>, DomainError> {
        sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, user_id, content_id, amount_cents, session_id, created_at
            FROM purchases
            WHERE content_id = ANY($1)
            "#,
        )
        .bind(id_strings(content_ids))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list purchases by content", e))?
        .into_iter()
        .map(Purchase::try_from)
        .collect()
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresEntitlementStore {
    async fn find_active_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, DomainError> {
        sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 AND status = 'active'",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find active subscription", e))?
        .map(Subscription::try_from)
        .transpose()
    }

    async fn mark_expired(&self, id: &SubscriptionId, now: Timestamp) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'expired', updated_at = $2 WHERE id = $1 AND status = 'active' AND expires_at <= $2",
        )
        .bind(id.as_uuid())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("expire subscription", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_cancelled(
        &self,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'cancelled', updated_at = $2 WHERE id = $1 AND status = 'active'",
        )
        .bind(id.as_uuid())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("cancel subscription", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn expire_due(&self, now: Timestamp) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET status = 'expired', updated_at = $1
            WHERE status = 'active' AND expires_at <= $1
            "#,
        )
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("sweep subscriptions", e))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction_row(status: &str, kind: &str, target_ref: Option<&str>) -> TransactionRow {
        TransactionRow {
            id: Uuid::new_v4(),
            session_id: "cs_1".to_string(),
            user_id: "user_1".to_string(),
            amount_cents: 499,
            currency: "usd".to_string(),
            payment_status: status.to_string(),
            kind: kind.to_string(),
            target_ref: target_ref.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn transaction_row_converts() {
        let tx = Transaction::try_from(transaction_row("paid", "pack_purchase", Some("pack_1"))).unwrap();
        assert_eq!(tx.payment_status, PaymentStatus::Paid);
        assert_eq!(tx.kind, TransactionKind::PackPurchase);
        assert_eq!(tx.target_ref, Some(ContentId::new("pack_1").unwrap()));
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let err = Transaction::try_from(transaction_row("refunded", "pack_purchase", None)).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn subscription_row_converts() {
        let row = SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: "user_1".to_string(),
            gateway_subscription_ref: "cs_sub".to_string(),
            status: "cancelled".to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let sub = Subscription::try_from(row).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
    }

    #[test]
    fn blank_user_in_purchase_row_is_corrupt() {
        let row = PurchaseRow {
            id: Uuid::new_v4(),
            user_id: "  ".to_string(),
            content_id: "pack_1".to_string(),
            amount_cents: 100,
            session_id: "cs_1".to_string(),
            created_at: Utc::now(),
        };
        assert!(Purchase::try_from(row).is_err());
    }
}
