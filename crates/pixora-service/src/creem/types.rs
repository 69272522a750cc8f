//! Creem webhook and API payload types.
//!
//! Webhook deliveries are a JSON envelope `{ "eventType": "...", "object":
//! {...} }` where the object shape depends on the event type. Each variant
//! is deserialized into a typed struct before any state mutation, so field
//! validation happens up front; unknown event types never get that far and
//! are ignored.

use chrono::{DateTime, Utc};
use pixora_core::SubscriptionStatus;
use serde::{Deserialize, Serialize};

/// The webhook envelope. `object` stays raw until the event type is known.
#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    /// Event type, e.g. "checkout.completed".
    #[serde(rename = "eventType")]
    pub event_type: String,

    /// Event payload, shape keyed by `event_type`.
    pub object: serde_json::Value,
}

/// A Creem customer object.
#[derive(Debug, Clone, Deserialize)]
pub struct CreemCustomer {
    /// Provider customer id.
    pub id: String,
    /// Customer email.
    #[serde(default)]
    pub email: Option<String>,
    /// Customer name.
    #[serde(default)]
    pub name: Option<String>,
    /// ISO country code.
    #[serde(default)]
    pub country: Option<String>,
}

/// A customer reference that may arrive as a bare id or a full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CustomerRef {
    /// Full customer object.
    Object(CreemCustomer),
    /// Bare provider customer id.
    Id(String),
}

impl CustomerRef {
    /// Normalize into a customer object (contact fields empty for bare ids).
    #[must_use]
    pub fn into_customer(self) -> CreemCustomer {
        match self {
            Self::Object(customer) => customer,
            Self::Id(id) => CreemCustomer {
                id,
                email: None,
                name: None,
                country: None,
            },
        }
    }
}

/// A product reference that may arrive as a bare id or a full object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ProductRef {
    /// Full product object.
    Object {
        /// Provider product id.
        id: String,
    },
    /// Bare provider product id.
    Id(String),
}

impl ProductRef {
    /// The provider product id.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Object { id } | Self::Id(id) => id,
        }
    }
}

/// Checkout/subscription metadata set when the session was created.
///
/// `credits` arrives as either a JSON number or a numeric string depending
/// on how the session was created; both are accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventMetadata {
    /// Our internal user id, set at checkout creation.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Credits granted by this purchase/renewal.
    #[serde(default)]
    pub credits: Option<CreditsValue>,
    /// Product kind label ("credits", "subscription", ...).
    #[serde(default)]
    pub product_type: Option<String>,
}

/// A credits amount as a number or numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CreditsValue {
    /// JSON number.
    Number(i64),
    /// Numeric string.
    Text(String),
}

impl CreditsValue {
    /// The amount as an integer, when parseable.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// The `object` of a `checkout.completed` event.
#[derive(Debug, Deserialize)]
pub struct CreemCheckout {
    /// Checkout session id.
    pub id: String,
    /// The purchasing customer.
    pub customer: CustomerRef,
    /// Subscription attached to this checkout, if the product is recurring.
    #[serde(default)]
    pub subscription: Option<CreemSubscription>,
    /// The order created by this checkout.
    #[serde(default)]
    pub order: Option<CreemOrder>,
    /// Session metadata.
    #[serde(default)]
    pub metadata: Option<EventMetadata>,
}

/// An order attached to a checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CreemOrder {
    /// Provider order id - the idempotency key for checkout credits.
    pub id: String,
}

/// The `object` of a `subscription.*` event (also nested inside checkouts).
#[derive(Debug, Deserialize)]
pub struct CreemSubscription {
    /// Provider subscription id.
    pub id: String,
    /// The subscribed customer.
    #[serde(default)]
    pub customer: Option<CustomerRef>,
    /// The subscribed product.
    #[serde(default)]
    pub product: Option<ProductRef>,
    /// Provider-reported status string.
    #[serde(default)]
    pub status: Option<String>,
    /// Start of the current billing period.
    #[serde(default)]
    pub current_period_start_date: Option<DateTime<Utc>>,
    /// End of the current billing period.
    #[serde(default)]
    pub current_period_end_date: Option<DateTime<Utc>>,
    /// When the subscription was canceled.
    #[serde(default)]
    pub canceled_at: Option<DateTime<Utc>>,
    /// Subscription metadata.
    #[serde(default)]
    pub metadata: Option<EventMetadata>,
}

/// Map a provider status string onto our mirrored status set.
///
/// The provider's states are a closed contract; an unrecognized string is a
/// payload-integrity problem, not something to guess around.
pub fn parse_subscription_status(status: &str) -> Option<SubscriptionStatus> {
    match status {
        "trialing" => Some(SubscriptionStatus::Trialing),
        "active" => Some(SubscriptionStatus::Active),
        "past_due" => Some(SubscriptionStatus::PastDue),
        "canceled" => Some(SubscriptionStatus::Canceled),
        "unpaid" => Some(SubscriptionStatus::Unpaid),
        "expired" => Some(SubscriptionStatus::Expired),
        _ => None,
    }
}

// ============================================================================
// Outbound API types
// ============================================================================

/// Request body for creating a checkout session.
#[derive(Debug, Serialize)]
pub struct CreateCheckoutRequest {
    /// Provider product id to purchase.
    pub product_id: String,
    /// Redirect target after payment.
    pub success_url: String,
    /// Metadata echoed back on the `checkout.completed` webhook.
    pub metadata: serde_json::Value,
}

/// Response from creating a checkout session.
#[derive(Debug, Deserialize)]
pub struct CheckoutSessionResponse {
    /// Checkout session id.
    pub id: String,
    /// Hosted checkout URL to send the user to.
    pub checkout_url: String,
}

/// Request body for a customer-portal link.
#[derive(Debug, Serialize)]
pub struct PortalRequest {
    /// Provider customer id.
    pub customer_id: String,
}

/// Response carrying the hosted portal link.
#[derive(Debug, Deserialize)]
pub struct PortalResponse {
    /// Hosted billing-portal URL.
    pub customer_portal_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credits_value_accepts_number_and_string() {
        let meta: EventMetadata =
            serde_json::from_value(serde_json::json!({ "user_id": "u", "credits": 1000 })).unwrap();
        assert_eq!(meta.credits.unwrap().as_i64(), Some(1000));

        let meta: EventMetadata =
            serde_json::from_value(serde_json::json!({ "credits": "4000" })).unwrap();
        assert_eq!(meta.credits.unwrap().as_i64(), Some(4000));

        let meta: EventMetadata =
            serde_json::from_value(serde_json::json!({ "credits": "lots" })).unwrap();
        assert_eq!(meta.credits.unwrap().as_i64(), None);
    }

    #[test]
    fn customer_ref_accepts_bare_id() {
        let reference: CustomerRef = serde_json::from_value(serde_json::json!("cus_1")).unwrap();
        let customer = reference.into_customer();
        assert_eq!(customer.id, "cus_1");
        assert!(customer.email.is_none());
    }

    #[test]
    fn product_ref_accepts_both_shapes() {
        let reference: ProductRef = serde_json::from_value(serde_json::json!("prod_1")).unwrap();
        assert_eq!(reference.id(), "prod_1");

        let reference: ProductRef =
            serde_json::from_value(serde_json::json!({ "id": "prod_2" })).unwrap();
        assert_eq!(reference.id(), "prod_2");
    }

    #[test]
    fn unknown_status_is_none() {
        assert_eq!(parse_subscription_status("active"), Some(SubscriptionStatus::Active));
        assert_eq!(parse_subscription_status("paused"), None);
    }
}
