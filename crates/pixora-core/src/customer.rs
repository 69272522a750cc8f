//! Customer types for the Pixora service.
//!
//! A `Customer` is the billing-side counterpart of an authenticated user and
//! the sole holder of the spendable credit balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CustomerId, UserId};

/// A billing customer, created lazily on first generation request or first
/// payment-related event.
///
/// `credits` is authoritative and never negative. Every change to it is
/// mediated by the ledger, which records a matching `CreditTransaction` in
/// the same unit of work - nothing else writes this field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Internal customer id.
    pub id: CustomerId,

    /// The authenticated user this customer belongs to (1:1).
    pub user_id: UserId,

    /// Payment-provider customer id, unset until the first purchase.
    pub provider_customer_id: Option<String>,

    /// Customer email as reported by the payment provider.
    pub email: Option<String>,

    /// Customer display name as reported by the payment provider.
    pub name: Option<String>,

    /// ISO country code as reported by the payment provider.
    pub country: Option<String>,

    /// Current spendable credit balance. Never negative.
    pub credits: i64,

    /// When the customer was created.
    pub created_at: DateTime<Utc>,

    /// When the customer was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Create a new customer with zero balance.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: CustomerId::generate(),
            user_id,
            provider_customer_id: None,
            email: None,
            name: None,
            country: None,
            credits: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the balance covers a debit of `amount`.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.credits >= amount
    }
}
