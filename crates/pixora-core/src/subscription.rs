//! Subscription types.
//!
//! Subscriptions mirror the payment provider's view of recurring contracts.
//! The provider is the source of truth: status transitions are last-write-wins
//! on whatever the provider reports, never inferred locally. Records are kept
//! forever for audit; there is no delete.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CustomerId;

/// A subscription as mirrored from the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    /// Provider subscription id (unique, the upsert key).
    pub provider_subscription_id: String,

    /// The customer this subscription belongs to.
    pub customer_id: CustomerId,

    /// Provider product id.
    pub provider_product_id: Option<String>,

    /// Current status as last reported by the provider.
    pub status: SubscriptionStatus,

    /// Start of the current billing period.
    pub current_period_start: Option<DateTime<Utc>>,

    /// End of the current billing period.
    pub current_period_end: Option<DateTime<Utc>>,

    /// When the subscription was canceled, if it was.
    pub canceled_at: Option<DateTime<Utc>>,

    /// Provider metadata blob, stored verbatim for audit.
    pub metadata: serde_json::Value,

    /// When this record was first created.
    pub created_at: DateTime<Utc>,

    /// When this record was last updated from a provider event.
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the subscription currently entitles the customer to service.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trialing
        )
    }
}

/// Subscription status, mirroring the provider's state set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// In a trial period.
    Trialing,

    /// Active and paid.
    Active,

    /// Renewal payment failed; the provider is retrying.
    PastDue,

    /// Canceled by the customer (may still run to period end).
    Canceled,

    /// Provider gave up collecting payment.
    Unpaid,

    /// The subscription ran out and was not renewed.
    Expired,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(status: SubscriptionStatus) -> Subscription {
        let now = Utc::now();
        Subscription {
            provider_subscription_id: "sub_123".into(),
            customer_id: CustomerId::generate(),
            provider_product_id: Some("prod_abc".into()),
            status,
            current_period_start: Some(now),
            current_period_end: None,
            canceled_at: None,
            metadata: serde_json::Value::Null,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_and_trialing_are_active() {
        assert!(subscription(SubscriptionStatus::Active).is_active());
        assert!(subscription(SubscriptionStatus::Trialing).is_active());
        assert!(!subscription(SubscriptionStatus::Canceled).is_active());
        assert!(!subscription(SubscriptionStatus::Expired).is_active());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&SubscriptionStatus::PastDue).unwrap();
        assert_eq!(json, "\"past_due\"");

        let parsed: SubscriptionStatus = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(parsed, SubscriptionStatus::Canceled);
    }
}
