//! Creem webhook handler: the payment event reconciler.
//!
//! Deliveries are at-least-once and unordered. Every handler is therefore
//! idempotent: customer and subscription upserts are last-write-wins on
//! provider state, and ledger credits carry an external reference the
//! ledger deduplicates on. A failed handler returns non-2xx so the provider
//! redelivers; partial application is safe for the same reason.
//!
//! Per-event policy (who touches the ledger is deliberate, not emergent):
//!
//! | event                   | customer | subscription | ledger credit        |
//! |-------------------------|----------|--------------|----------------------|
//! | `checkout.completed`    | upsert   | upsert       | yes, keyed by order  |
//! | `subscription.active`   | upsert   | upsert       | no (checkout grants) |
//! | `subscription.paid`     | upsert   | upsert       | yes, keyed by period |
//! | `subscription.canceled` | upsert   | upsert       | no                   |
//! | `subscription.expired`  | upsert   | upsert       | no                   |
//! | `subscription.trialing` | upsert   | upsert       | no                   |

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use pixora_core::{Customer, CustomerId, Subscription, UserId};
use pixora_store::Store;

use crate::creem::types::{
    parse_subscription_status, CreditsValue, CreemCheckout, CreemCustomer, CreemSubscription,
    CustomerRef, WebhookEnvelope,
};
use crate::crypto::verify_signature;
use crate::error::ApiError;
use crate::state::AppState;

/// Webhook acknowledgement.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the event was accepted.
    pub received: bool,
}

/// Handle Creem webhooks.
///
/// The signature over the raw body is the only admission check; an event
/// that fails it is rejected before any state is touched.
pub async fn creem_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let secret = state
        .config
        .creem_webhook_secret
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Creem webhook secret not configured".into()))?;

    let signature = headers
        .get("creem-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::InvalidSignature)?;

    if !verify_signature(&body, signature, secret) {
        tracing::warn!("Rejected Creem webhook with invalid signature");
        return Err(ApiError::InvalidSignature);
    }

    let envelope: WebhookEnvelope = serde_json::from_str(&body)
        .map_err(|e| ApiError::BadRequest(format!("malformed webhook body: {e}")))?;

    tracing::info!(event_type = %envelope.event_type, "Received Creem webhook");

    match envelope.event_type.as_str() {
        "checkout.completed" => handle_checkout_completed(&state, envelope.object)?,
        "subscription.paid" => handle_subscription_event(&state, envelope.object, true)?,
        "subscription.active"
        | "subscription.canceled"
        | "subscription.expired"
        | "subscription.trialing" => handle_subscription_event(&state, envelope.object, false)?,
        other => {
            // Unknown types are acknowledged, not errored: failing would
            // make the provider retry events we will never handle.
            tracing::debug!(event_type = %other, "Ignoring unhandled Creem event");
        }
    }

    Ok(Json(WebhookResponse { received: true }))
}

/// `checkout.completed`: upsert customer (+ subscription when attached) and
/// grant purchased credits, keyed by the order id.
fn handle_checkout_completed(
    state: &AppState,
    object: serde_json::Value,
) -> Result<(), ApiError> {
    let checkout: CreemCheckout = serde_json::from_value(object)
        .map_err(|e| ApiError::BadRequest(format!("malformed checkout object: {e}")))?;

    let metadata = checkout.metadata.unwrap_or_default();

    // A checkout we cannot correlate to a user is a data-integrity problem
    // upstream (the session was created without our metadata), not a
    // recoverable condition.
    let Some(user_id_str) = metadata.user_id.as_deref() else {
        tracing::error!(
            checkout_id = %checkout.id,
            "checkout.completed without user_id metadata - cannot correlate purchase"
        );
        return Err(ApiError::BadRequest(
            "user_id is required in checkout metadata".into(),
        ));
    };
    let user_id = parse_user_id(user_id_str)?;

    let provider_customer = checkout.customer.into_customer();
    let customer = upsert_customer(state, Some(user_id), Some(&provider_customer))?;

    if let Some(subscription) = &checkout.subscription {
        upsert_subscription(state, customer.id, subscription)?;
    }

    if let Some(credits) = metadata.credits.as_ref().and_then(credits_amount) {
        // The order id is the idempotency key; a purchase event without one
        // cannot be granted safely.
        let Some(order) = &checkout.order else {
            tracing::error!(
                checkout_id = %checkout.id,
                "checkout.completed declares credits but carries no order id"
            );
            return Err(ApiError::BadRequest(
                "order id is required to grant checkout credits".into(),
            ));
        };

        let product_type = metadata.product_type.as_deref().unwrap_or("unknown");
        let new_balance = state.store.credit_credits(
            &customer.id,
            credits,
            &format!("Purchased {credits} credits ({product_type})"),
            Some(&order.id),
        )?;

        tracing::info!(
            customer_id = %customer.id,
            order_id = %order.id,
            credits = %credits,
            new_balance = %new_balance,
            "Checkout credits granted"
        );
    }

    Ok(())
}

/// `subscription.*`: upsert customer and subscription; grant renewal
/// credits only for `subscription.paid`.
fn handle_subscription_event(
    state: &AppState,
    object: serde_json::Value,
    grant_renewal: bool,
) -> Result<(), ApiError> {
    let subscription: CreemSubscription = serde_json::from_value(object)
        .map_err(|e| ApiError::BadRequest(format!("malformed subscription object: {e}")))?;

    let metadata = subscription.metadata.clone().unwrap_or_default();
    let user_id = metadata
        .user_id
        .as_deref()
        .map(parse_user_id)
        .transpose()?;

    let provider_customer = subscription.customer.clone().map(CustomerRef::into_customer);
    let customer = upsert_customer(state, user_id, provider_customer.as_ref())?;

    upsert_subscription(state, customer.id, &subscription)?;

    if !grant_renewal {
        return Ok(());
    }

    let Some(credits) = metadata.credits.as_ref().and_then(credits_amount) else {
        return Ok(());
    };

    // Renewal events carry no order id. The billing period disambiguates
    // legitimate sequential renewals from redelivery of the same event; a
    // renewal without a period start falls back to the subscription id
    // alone, preferring under-crediting a malformed event over
    // double-crediting.
    let external_ref = match subscription.current_period_start_date {
        Some(period_start) => format!(
            "renewal:{}:{}",
            subscription.id,
            period_start.timestamp()
        ),
        None => {
            tracing::warn!(
                subscription_id = %subscription.id,
                "Renewal event without period start - idempotency key degrades to subscription id"
            );
            format!("renewal:{}", subscription.id)
        }
    };

    let product_type = metadata.product_type.as_deref().unwrap_or("subscription");
    let new_balance = state.store.credit_credits(
        &customer.id,
        credits,
        &format!("Subscription renewal credits ({product_type})"),
        Some(&external_ref),
    )?;

    tracing::info!(
        customer_id = %customer.id,
        subscription_id = %subscription.id,
        external_ref = %external_ref,
        credits = %credits,
        new_balance = %new_balance,
        "Renewal credits granted"
    );

    Ok(())
}

/// Create or update the customer for an event.
///
/// Matching order is load-bearing: the internal user identity first (it
/// preserves a balance seeded before any payment, e.g. a sign-up bonus),
/// then the provider customer id, else create. Matching by provider id
/// first would fork a user's balance history whenever their first
/// transaction created the record under a different key.
fn upsert_customer(
    state: &AppState,
    user_id: Option<UserId>,
    provider: Option<&CreemCustomer>,
) -> Result<Customer, ApiError> {
    if let Some(user_id) = user_id {
        if let Some(mut customer) = state.store.find_customer_by_user(&user_id)? {
            if let Some(provider) = provider {
                apply_provider_profile(&mut customer, provider);
            }
            customer.updated_at = chrono::Utc::now();
            state.store.put_customer(&customer)?;
            return state.store.get_customer(&customer.id)?.ok_or_else(|| {
                ApiError::Internal("customer vanished during upsert".into())
            });
        }
    }

    if let Some(provider) = provider {
        if let Some(mut customer) = state.store.find_customer_by_provider(&provider.id)? {
            apply_provider_profile(&mut customer, provider);
            customer.updated_at = chrono::Utc::now();
            state.store.put_customer(&customer)?;
            return state.store.get_customer(&customer.id)?.ok_or_else(|| {
                ApiError::Internal("customer vanished during upsert".into())
            });
        }
    }

    // Creating a fresh record needs the internal identity; without it the
    // event cannot be tied to a user at all.
    let Some(user_id) = user_id else {
        tracing::error!("Payment event matches no customer and carries no user_id metadata");
        return Err(ApiError::BadRequest(
            "event cannot be correlated to a customer".into(),
        ));
    };

    let mut customer = Customer::new(user_id);
    if let Some(provider) = provider {
        apply_provider_profile(&mut customer, provider);
    }
    state.store.put_customer(&customer)?;

    tracing::info!(
        user_id = %user_id,
        customer_id = %customer.id,
        "Created customer from payment event"
    );

    Ok(customer)
}

fn apply_provider_profile(customer: &mut Customer, provider: &CreemCustomer) {
    customer.provider_customer_id = Some(provider.id.clone());
    if provider.email.is_some() {
        customer.email = provider.email.clone();
    }
    if provider.name.is_some() {
        customer.name = provider.name.clone();
    }
    if provider.country.is_some() {
        customer.country = provider.country.clone();
    }
}

/// Upsert a subscription record from a provider event.
///
/// Keyed by provider subscription id; status and periods are mirrored
/// last-write-wins - this service never infers subscription state.
fn upsert_subscription(
    state: &AppState,
    customer_id: CustomerId,
    event: &CreemSubscription,
) -> Result<(), ApiError> {
    let status_str = event.status.as_deref().unwrap_or("active");
    let Some(status) = parse_subscription_status(status_str) else {
        tracing::error!(
            subscription_id = %event.id,
            status = %status_str,
            "Unknown subscription status from provider"
        );
        return Err(ApiError::BadRequest(format!(
            "unknown subscription status: {status_str}"
        )));
    };

    let existing = state.store.get_subscription(&event.id)?;
    let now = chrono::Utc::now();

    let record = Subscription {
        provider_subscription_id: event.id.clone(),
        customer_id,
        provider_product_id: event.product.as_ref().map(|p| p.id().to_string()),
        status,
        current_period_start: event.current_period_start_date,
        current_period_end: event.current_period_end_date,
        canceled_at: event.canceled_at,
        metadata: event
            .metadata
            .as_ref()
            .map_or(serde_json::Value::Null, |m| {
                serde_json::to_value(SubscriptionMetadataView {
                    user_id: m.user_id.clone(),
                    product_type: m.product_type.clone(),
                })
                .unwrap_or(serde_json::Value::Null)
            }),
        created_at: existing.as_ref().map_or(now, |s| s.created_at),
        updated_at: now,
    };

    state.store.put_subscription(&record)?;

    tracing::info!(
        subscription_id = %event.id,
        customer_id = %customer_id,
        status = ?status,
        "Subscription upserted"
    );

    Ok(())
}

/// The slice of provider metadata worth retaining on the record.
#[derive(Debug, Serialize)]
struct SubscriptionMetadataView {
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_type: Option<String>,
}

fn parse_user_id(value: &str) -> Result<UserId, ApiError> {
    value.parse::<UserId>().map_err(|_| {
        tracing::error!(user_id = %value, "Unparseable user_id in event metadata");
        ApiError::BadRequest(format!("invalid user_id in event metadata: {value}"))
    })
}

/// Positive credit amount from metadata, when declared and parseable.
fn credits_amount(value: &CreditsValue) -> Option<i64> {
    value.as_i64().filter(|credits| *credits > 0)
}
