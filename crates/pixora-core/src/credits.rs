//! Credit transaction types.
//!
//! Every balance change appends a `CreditTransaction`; the running invariant
//! is that the sum of all transaction amounts for a customer equals the
//! customer's current balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CustomerId, TransactionId};

/// A single entry in a customer's append-only credit history.
///
/// Transactions use ULIDs so that binary key order is chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditTransaction {
    /// Unique transaction id (ULID, time-ordered).
    pub id: TransactionId,

    /// The customer whose balance changed.
    pub customer_id: CustomerId,

    /// Signed amount: positive adds credits, negative subtracts them.
    pub amount: i64,

    /// Whether this entry added or subtracted credits.
    pub kind: TransactionKind,

    /// Human-readable description for audit and display.
    pub description: String,

    /// External order/event reference, set on provider-driven credits.
    ///
    /// When present, the ledger uses it as an idempotency key: a second
    /// credit carrying the same reference for the same customer is a no-op.
    pub external_ref: Option<String>,

    /// When the transaction was recorded.
    pub created_at: DateTime<Utc>,
}

impl CreditTransaction {
    /// Create a credit (add) transaction, optionally carrying an external
    /// reference used for idempotent replay of provider events.
    #[must_use]
    pub fn grant(
        customer_id: CustomerId,
        amount: i64,
        description: String,
        external_ref: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            customer_id,
            amount: amount.abs(),
            kind: TransactionKind::Add,
            description,
            external_ref,
            created_at: Utc::now(),
        }
    }

    /// Create a usage (subtract) transaction. The stored amount is always
    /// negative.
    #[must_use]
    pub fn usage(customer_id: CustomerId, amount: i64, description: String) -> Self {
        Self {
            id: TransactionId::generate(),
            customer_id,
            amount: -amount.abs(),
            kind: TransactionKind::Subtract,
            description,
            external_ref: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this transaction is a refund.
    ///
    /// Refunds are not a distinct kind: they are `add` transactions whose
    /// description carries the refund tag, so every balance increase flows
    /// through the same auditable shape.
    #[must_use]
    pub fn is_refund(&self) -> bool {
        self.kind == TransactionKind::Add && self.description.starts_with("Refund:")
    }
}

/// Direction of a credit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Credits added (purchase, renewal grant, refund).
    Add,

    /// Credits subtracted (generation usage).
    Subtract,
}

impl TransactionKind {
    /// Check if this kind increases the balance.
    #[must_use]
    pub const fn is_credit(self) -> bool {
        matches!(self, Self::Add)
    }

    /// Check if this kind decreases the balance.
    #[must_use]
    pub const fn is_debit(self) -> bool {
        matches!(self, Self::Subtract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_is_positive() {
        let customer_id = CustomerId::generate();
        let tx = CreditTransaction::grant(
            customer_id,
            1000,
            "Purchased 1000 credits".into(),
            Some("ord_123".into()),
        );

        assert_eq!(tx.amount, 1000);
        assert_eq!(tx.kind, TransactionKind::Add);
        assert_eq!(tx.external_ref.as_deref(), Some("ord_123"));
    }

    #[test]
    fn usage_is_negative() {
        let tx = CreditTransaction::usage(CustomerId::generate(), 10, "Generation".into());

        assert_eq!(tx.amount, -10);
        assert_eq!(tx.kind, TransactionKind::Subtract);
        assert!(tx.external_ref.is_none());
    }

    #[test]
    fn refund_is_a_tagged_grant() {
        let tx = CreditTransaction::grant(
            CustomerId::generate(),
            10,
            "Refund: generation failed".into(),
            None,
        );

        assert_eq!(tx.kind, TransactionKind::Add);
        assert!(tx.is_refund());

        let usage = CreditTransaction::usage(CustomerId::generate(), 10, "Generation".into());
        assert!(!usage.is_refund());
    }

    #[test]
    fn kind_direction() {
        assert!(TransactionKind::Add.is_credit());
        assert!(!TransactionKind::Add.is_debit());
        assert!(TransactionKind::Subtract.is_debit());
        assert!(!TransactionKind::Subtract.is_credit());
    }
}
