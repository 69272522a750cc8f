//! Billing handlers: checkout initiation, customer portal, subscription view.
//!
//! These endpoints only talk to the payment provider and read mirrored
//! state; credits are granted exclusively by the webhook reconciler once the
//! provider confirms payment.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use pixora_core::SubscriptionStatus;
use pixora_store::Store;

use crate::auth::AuthUser;
use crate::creem::types::CreateCheckoutRequest;
use crate::creem::CreemClient;
use crate::error::ApiError;
use crate::state::AppState;

/// Checkout request.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// Provider product id to purchase.
    pub product_id: String,
    /// Credits this product grants, echoed back on the webhook.
    pub credits: Option<i64>,
    /// Product kind label ("credits" or "subscription").
    pub product_type: Option<String>,
}

/// Checkout response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Hosted checkout URL to redirect the user to.
    pub checkout_url: String,
    /// Checkout session id, for tracking.
    pub session_id: String,
}

/// Create a Creem checkout session.
///
/// `user_id` (and the credit amount, when given) ride along as session
/// metadata so the `checkout.completed` webhook can correlate the purchase.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    if body.product_id.trim().is_empty() {
        return Err(ApiError::BadRequest("product_id must not be empty".into()));
    }
    if let Some(credits) = body.credits {
        if credits <= 0 {
            return Err(ApiError::BadRequest("credits must be positive".into()));
        }
    }

    let payments = payments_client(&state)?;

    let mut metadata = serde_json::json!({ "user_id": auth.user_id.to_string() });
    if let Some(credits) = body.credits {
        metadata["credits"] = serde_json::json!(credits);
    }
    if let Some(product_type) = &body.product_type {
        metadata["product_type"] = serde_json::json!(product_type);
    }

    let session = payments
        .create_checkout(&CreateCheckoutRequest {
            product_id: body.product_id.clone(),
            success_url: format!("{}/dashboard?checkout=success", state.config.frontend_url),
            metadata,
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create Creem checkout session");
            ApiError::ExternalService(format!("Failed to create checkout session: {e}"))
        })?;

    tracing::info!(
        user_id = %auth.user_id,
        session_id = %session.id,
        product_id = %body.product_id,
        "Checkout session created"
    );

    Ok(Json(CheckoutResponse {
        checkout_url: session.checkout_url,
        session_id: session.id,
    }))
}

/// Portal response.
#[derive(Debug, Serialize)]
pub struct PortalLinkResponse {
    /// Hosted billing-portal URL.
    pub portal_url: String,
}

/// Get a customer-portal link for managing payment methods and
/// subscriptions.
pub async fn customer_portal(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<PortalLinkResponse>, ApiError> {
    let payments = payments_client(&state)?;

    let customer = state
        .store
        .find_customer_by_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("No billing profile for this user".into()))?;

    let provider_customer_id = customer
        .provider_customer_id
        .ok_or_else(|| ApiError::NotFound("No payment provider customer linked yet".into()))?;

    let portal = payments
        .customer_portal(&provider_customer_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create customer portal link");
            ApiError::ExternalService(format!("Failed to create portal link: {e}"))
        })?;

    Ok(Json(PortalLinkResponse {
        portal_url: portal.customer_portal_link,
    }))
}

/// Subscription view for the dashboard.
#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    /// Provider subscription id.
    pub id: String,
    /// Provider product id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Current status.
    pub status: SubscriptionStatus,
    /// Start of the current billing period (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_start: Option<String>,
    /// End of the current billing period (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<String>,
}

/// Subscription response.
#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    /// The active subscription, or null when there is none.
    pub subscription: Option<SubscriptionView>,
}

/// Get the caller's active subscription, if any.
pub async fn get_subscription(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<SubscriptionResponse>, ApiError> {
    let Some(customer) = state.store.find_customer_by_user(&auth.user_id)? else {
        return Ok(Json(SubscriptionResponse { subscription: None }));
    };

    let subscription = state
        .store
        .list_subscriptions(&customer.id)?
        .into_iter()
        .filter(pixora_core::Subscription::is_active)
        .max_by_key(|s| s.updated_at)
        .map(|s| SubscriptionView {
            id: s.provider_subscription_id,
            product_id: s.provider_product_id,
            status: s.status,
            current_period_start: s.current_period_start.map(|t| t.to_rfc3339()),
            current_period_end: s.current_period_end.map(|t| t.to_rfc3339()),
        });

    Ok(Json(SubscriptionResponse { subscription }))
}

fn payments_client(state: &AppState) -> Result<&Arc<CreemClient>, ApiError> {
    state
        .payments
        .as_ref()
        .ok_or_else(|| ApiError::ExternalService("Payments not configured".into()))
}
