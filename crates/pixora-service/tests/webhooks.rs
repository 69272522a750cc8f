//! Payment event reconciler integration tests: authenticity, idempotency,
//! and customer/subscription upsert semantics under redelivery.

mod common;

use common::TestHarness;
use serde_json::json;

use pixora_core::{SubscriptionStatus, UserId};
use pixora_store::Store;

fn checkout_completed(user_id: &UserId, credits: i64, order_id: &str) -> serde_json::Value {
    json!({
        "eventType": "checkout.completed",
        "object": {
            "id": "ch_1",
            "customer": {
                "id": "cus_1",
                "email": "buyer@example.com",
                "name": "Buyer",
                "country": "DE"
            },
            "order": { "id": order_id },
            "metadata": {
                "user_id": user_id.to_string(),
                "credits": credits,
                "product_type": "credits"
            }
        }
    })
}

fn subscription_event(
    event_type: &str,
    user_id: &UserId,
    subscription_id: &str,
    status: &str,
    period_start: &str,
    credits: Option<&str>,
) -> serde_json::Value {
    let mut metadata = json!({ "user_id": user_id.to_string(), "product_type": "subscription" });
    if let Some(credits) = credits {
        metadata["credits"] = json!(credits);
    }

    json!({
        "eventType": event_type,
        "object": {
            "id": subscription_id,
            "customer": { "id": "cus_1", "email": "buyer@example.com" },
            "product": { "id": "prod_sub" },
            "status": status,
            "current_period_start_date": period_start,
            "current_period_end_date": "2026-09-01T00:00:00Z",
            "metadata": metadata
        }
    })
}

// ============================================================================
// Authenticity
// ============================================================================

#[tokio::test]
async fn missing_signature_rejected() {
    let harness = TestHarness::new().await;
    let body = checkout_completed(&harness.test_user_id, 1000, "ORD-1").to_string();

    let response = harness
        .server
        .post("/webhooks/creem")
        .add_header("content-type", "application/json")
        .text(body)
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn invalid_signature_rejected_without_mutation() {
    let harness = TestHarness::new().await;
    let body = checkout_completed(&harness.test_user_id, 1000, "ORD-1").to_string();

    let response = harness
        .server
        .post("/webhooks/creem")
        .add_header("creem-signature", "0".repeat(64))
        .add_header("content-type", "application/json")
        .text(body)
        .await;

    response.assert_status_unauthorized();
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_signature");

    // No customer was created from the tampered event.
    assert!(harness
        .store
        .find_customer_by_user(&harness.test_user_id)
        .unwrap()
        .is_none());
}

// ============================================================================
// checkout.completed
// ============================================================================

#[tokio::test]
async fn checkout_grants_credits_and_creates_customer() {
    let harness = TestHarness::new().await;

    let response = harness
        .deliver_webhook(&checkout_completed(&harness.test_user_id, 1000, "ORD-1"))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], true);

    let customer = harness
        .store
        .find_customer_by_user(&harness.test_user_id)
        .unwrap()
        .unwrap();
    assert_eq!(customer.credits, 1000);
    assert_eq!(customer.provider_customer_id.as_deref(), Some("cus_1"));
    assert_eq!(customer.email.as_deref(), Some("buyer@example.com"));
}

#[tokio::test]
async fn duplicate_checkout_delivery_credits_once() {
    let harness = TestHarness::new().await;
    let event = checkout_completed(&harness.test_user_id, 1000, "ORD-1");

    harness.deliver_webhook(&event).await.assert_status_ok();
    // Redelivery of the identical event is acknowledged but is a no-op.
    harness.deliver_webhook(&event).await.assert_status_ok();

    let customer = harness
        .store
        .find_customer_by_user(&harness.test_user_id)
        .unwrap()
        .unwrap();
    assert_eq!(customer.credits, 1000);

    let history = harness.store.list_transactions(&customer.id, 10, 0).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].external_ref.as_deref(), Some("ORD-1"));
}

#[tokio::test]
async fn distinct_orders_credit_separately() {
    let harness = TestHarness::new().await;

    harness
        .deliver_webhook(&checkout_completed(&harness.test_user_id, 1000, "ORD-1"))
        .await
        .assert_status_ok();
    harness
        .deliver_webhook(&checkout_completed(&harness.test_user_id, 500, "ORD-2"))
        .await
        .assert_status_ok();

    let customer = harness
        .store
        .find_customer_by_user(&harness.test_user_id)
        .unwrap()
        .unwrap();
    assert_eq!(customer.credits, 1500);
}

#[tokio::test]
async fn checkout_without_user_id_is_fatal() {
    let harness = TestHarness::new().await;
    let event = json!({
        "eventType": "checkout.completed",
        "object": {
            "id": "ch_1",
            "customer": { "id": "cus_1" },
            "order": { "id": "ORD-1" },
            "metadata": { "credits": 1000 }
        }
    });

    let response = harness.deliver_webhook(&event).await;

    // Non-2xx so the provider retries and the gap gets investigated.
    response.assert_status_bad_request();
}

#[tokio::test]
async fn checkout_credits_without_order_id_is_fatal() {
    let harness = TestHarness::new().await;
    let event = json!({
        "eventType": "checkout.completed",
        "object": {
            "id": "ch_1",
            "customer": { "id": "cus_1" },
            "metadata": { "user_id": harness.test_user_id.to_string(), "credits": 1000 }
        }
    });

    harness.deliver_webhook(&event).await.assert_status_bad_request();
}

#[tokio::test]
async fn checkout_preserves_preseeded_balance() {
    let harness = TestHarness::new().await;
    // Balance seeded before any payment, e.g. a sign-up bonus.
    let seeded = harness.seed_customer(&harness.test_user_id, 100);

    harness
        .deliver_webhook(&checkout_completed(&harness.test_user_id, 1000, "ORD-1"))
        .await
        .assert_status_ok();

    // The purchase must land on the existing customer, not fork a new one.
    let customer = harness
        .store
        .find_customer_by_user(&harness.test_user_id)
        .unwrap()
        .unwrap();
    assert_eq!(customer.id, seeded.id);
    assert_eq!(customer.credits, 1100);
    assert_eq!(customer.provider_customer_id.as_deref(), Some("cus_1"));
}

#[tokio::test]
async fn checkout_with_attached_subscription_upserts_it() {
    let harness = TestHarness::new().await;
    let event = json!({
        "eventType": "checkout.completed",
        "object": {
            "id": "ch_1",
            "customer": { "id": "cus_1" },
            "order": { "id": "ORD-1" },
            "subscription": {
                "id": "sub_1",
                "product": "prod_sub",
                "status": "active",
                "current_period_start_date": "2026-08-01T00:00:00Z",
                "current_period_end_date": "2026-09-01T00:00:00Z"
            },
            "metadata": {
                "user_id": harness.test_user_id.to_string(),
                "credits": "4000",
                "product_type": "subscription"
            }
        }
    });

    harness.deliver_webhook(&event).await.assert_status_ok();

    let subscription = harness.store.get_subscription("sub_1").unwrap().unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert_eq!(subscription.provider_product_id.as_deref(), Some("prod_sub"));

    // String-typed credits metadata still grants.
    let customer = harness
        .store
        .find_customer_by_user(&harness.test_user_id)
        .unwrap()
        .unwrap();
    assert_eq!(customer.credits, 4000);
}

// ============================================================================
// subscription.* lifecycle
// ============================================================================

#[tokio::test]
async fn subscription_active_does_not_credit() {
    let harness = TestHarness::new().await;
    let event = subscription_event(
        "subscription.active",
        &harness.test_user_id,
        "sub_1",
        "active",
        "2026-08-01T00:00:00Z",
        Some("4000"),
    );

    harness.deliver_webhook(&event).await.assert_status_ok();

    // Initial credits are granted by checkout.completed only; granting here
    // too would double-pay the same purchase.
    let customer = harness
        .store
        .find_customer_by_user(&harness.test_user_id)
        .unwrap()
        .unwrap();
    assert_eq!(customer.credits, 0);

    let subscription = harness.store.get_subscription("sub_1").unwrap().unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn subscription_paid_credits_once_per_period() {
    let harness = TestHarness::new().await;

    let period1 = subscription_event(
        "subscription.paid",
        &harness.test_user_id,
        "SUB-1",
        "active",
        "2026-08-01T00:00:00Z",
        Some("4000"),
    );
    let period2 = subscription_event(
        "subscription.paid",
        &harness.test_user_id,
        "SUB-1",
        "active",
        "2026-09-01T00:00:00Z",
        Some("4000"),
    );

    // Period 1 delivered twice (redelivery), then period 2.
    harness.deliver_webhook(&period1).await.assert_status_ok();
    harness.deliver_webhook(&period1).await.assert_status_ok();
    harness.deliver_webhook(&period2).await.assert_status_ok();

    // One grant per distinct period: 4000 + 4000, not 12000.
    let customer = harness
        .store
        .find_customer_by_user(&harness.test_user_id)
        .unwrap()
        .unwrap();
    assert_eq!(customer.credits, 8000);

    let history = harness.store.list_transactions(&customer.id, 10, 0).unwrap();
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn subscription_status_mirrors_provider() {
    let harness = TestHarness::new().await;

    for (event_type, status) in [
        ("subscription.trialing", "trialing"),
        ("subscription.active", "active"),
        ("subscription.canceled", "canceled"),
        ("subscription.expired", "expired"),
    ] {
        let event = subscription_event(
            event_type,
            &harness.test_user_id,
            "sub_1",
            status,
            "2026-08-01T00:00:00Z",
            None,
        );
        harness.deliver_webhook(&event).await.assert_status_ok();
    }

    // Last write wins; no local inference.
    let subscription = harness.store.get_subscription("sub_1").unwrap().unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Expired);

    // Lifecycle events never touched the ledger.
    let customer = harness
        .store
        .find_customer_by_user(&harness.test_user_id)
        .unwrap()
        .unwrap();
    assert_eq!(customer.credits, 0);
}

#[tokio::test]
async fn out_of_order_cancel_then_active_keeps_provider_order() {
    let harness = TestHarness::new().await;

    let canceled = subscription_event(
        "subscription.canceled",
        &harness.test_user_id,
        "sub_1",
        "canceled",
        "2026-08-01T00:00:00Z",
        None,
    );
    let active = subscription_event(
        "subscription.active",
        &harness.test_user_id,
        "sub_1",
        "active",
        "2026-08-01T00:00:00Z",
        None,
    );

    harness.deliver_webhook(&canceled).await.assert_status_ok();
    harness.deliver_webhook(&active).await.assert_status_ok();

    // The reconciler mirrors whatever arrived last.
    let subscription = harness.store.get_subscription("sub_1").unwrap().unwrap();
    assert_eq!(subscription.status, SubscriptionStatus::Active);
}

// ============================================================================
// Unknown events
// ============================================================================

#[tokio::test]
async fn unknown_event_type_acknowledged_without_mutation() {
    let harness = TestHarness::new().await;
    let event = json!({
        "eventType": "dispute.created",
        "object": { "id": "dp_1" }
    });

    let response = harness.deliver_webhook(&event).await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["received"], true);
}
