//! Generation gateway integration tests: pay before work, refund on failure.

mod common;

use common::TestHarness;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

use pixora_core::TransactionKind;
use pixora_store::Store;

fn image_ok(url: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "url": url }] }))
}

async fn mount_image_ok(harness: &TestHarness, url: &str) {
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(image_ok(url))
        .mount(&harness.upstream)
        .await;
}

// ============================================================================
// Success path
// ============================================================================

#[tokio::test]
async fn generation_debits_and_returns_url() {
    let harness = TestHarness::new().await;
    let customer = harness.seed_customer(&harness.test_user_id, 15);
    mount_image_ok(&harness, "https://img.example/cat.png").await;

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a cat in the snow", "enhance": false }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["url"], "https://img.example/cat.png");
    assert_eq!(body["was_enhanced"], false);

    // Balance 15 - 10, with exactly one subtract transaction recorded.
    assert_eq!(harness.store.balance(&customer.id).unwrap(), 5);
    let history = harness.store.list_transactions(&customer.id, 10, 0).unwrap();
    assert_eq!(history[0].amount, -10);
    assert_eq!(history[0].kind, TransactionKind::Subtract);
}

#[tokio::test]
async fn generation_records_succeeded_history() {
    let harness = TestHarness::new().await;
    harness.seed_customer(&harness.test_user_id, 20);
    mount_image_ok(&harness, "https://img.example/dog.png").await;

    harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a dog", "enhance": false }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let generations = body["generations"].as_array().unwrap();
    assert_eq!(generations.len(), 1);
    assert_eq!(generations[0]["status"], "succeeded");
    assert_eq!(generations[0]["prompt"], "a dog");
    assert_eq!(generations[0]["image_url"], "https://img.example/dog.png");
    assert_eq!(generations[0]["credits_cost"], 10);
}

// ============================================================================
// Insufficient funds
// ============================================================================

#[tokio::test]
async fn insufficient_credits_blocks_upstream_call() {
    let harness = TestHarness::new().await;
    let customer = harness.seed_customer(&harness.test_user_id, 5);

    // The upstream must never be called when the debit fails.
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(image_ok("https://img.example/never.png"))
        .expect(0)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a cat", "enhance": false }))
        .await;

    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["required"], 10);
    assert_eq!(body["error"]["details"]["balance"], 5);

    assert_eq!(harness.store.balance(&customer.id).unwrap(), 5);
}

// ============================================================================
// Failure and refund
// ============================================================================

#[tokio::test]
async fn upstream_error_refunds_credits() {
    let harness = TestHarness::new().await;
    let customer = harness.seed_customer(&harness.test_user_id, 20);

    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "error": { "message": "model overloaded" }
        })))
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a cat", "enhance": false }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "generation_failed");
    assert_eq!(body["error"]["details"]["refunded"], true);

    assert_eq!(harness.store.balance(&customer.id).unwrap(), 20);
}

#[tokio::test]
async fn upstream_timeout_refunds_and_records_failure() {
    let harness = TestHarness::new().await;
    let customer = harness.seed_customer(&harness.test_user_id, 20);

    // Responds after the client's 1s timeout.
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(
            image_ok("https://img.example/late.png")
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a slow cat", "enhance": false }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["details"]["refunded"], true);

    // Balance restored to 20; generation recorded as failed.
    assert_eq!(harness.store.balance(&customer.id).unwrap(), 20);
    let records = harness.store.list_generations(&customer.id, 10, 0).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, pixora_core::GenerationStatus::Failed);
    assert!(records[0].image_url.is_none());
}

#[tokio::test]
async fn malformed_upstream_result_is_a_failure() {
    let harness = TestHarness::new().await;
    let customer = harness.seed_customer(&harness.test_user_id, 20);

    // 200 with an empty URL must not be treated as success.
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [{ "url": "" }] })))
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a cat", "enhance": false }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
    assert_eq!(harness.store.balance(&customer.id).unwrap(), 20);
}

#[tokio::test]
async fn failed_generation_leaves_matching_refund_transaction() {
    let harness = TestHarness::new().await;
    let customer = harness.seed_customer(&harness.test_user_id, 20);

    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&harness.upstream)
        .await;

    harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a cat", "enhance": false }))
        .await
        .assert_status(axum::http::StatusCode::BAD_GATEWAY);

    // Exactly one refund add-transaction, same amount as the debit.
    let history = harness.store.list_transactions(&customer.id, 10, 0).unwrap();
    let refunds: Vec<_> = history.iter().filter(|tx| tx.is_refund()).collect();
    assert_eq!(refunds.len(), 1);
    assert_eq!(refunds[0].amount, 10);

    let debits: Vec<_> = history
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Subtract)
        .collect();
    assert_eq!(debits.len(), 1);
    assert_eq!(debits[0].amount, -10);
}

// ============================================================================
// Prompt enhancement
// ============================================================================

#[tokio::test]
async fn enhancement_result_is_sent_upstream() {
    let harness = TestHarness::new().await;
    harness.seed_customer(&harness.test_user_id, 20);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "content": "a majestic cat, dramatic lighting, 8K" } }]
        })))
        .mount(&harness.upstream)
        .await;

    // The image request must carry the enhanced prompt, not the original.
    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(body_partial_json(json!({
            "prompt": "a majestic cat, dramatic lighting, 8K"
        })))
        .respond_with(image_ok("https://img.example/cat.png"))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a cat", "style": "cinematic" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["was_enhanced"], true);
    assert_eq!(body["enhanced_prompt"], "a majestic cat, dramatic lighting, 8K");
}

#[tokio::test]
async fn enhancement_failure_falls_back_to_original_prompt() {
    let harness = TestHarness::new().await;
    let customer = harness.seed_customer(&harness.test_user_id, 20);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&harness.upstream)
        .await;

    Mock::given(method("POST"))
        .and(path("/images/generations"))
        .and(body_partial_json(json!({ "prompt": "a cat" })))
        .respond_with(image_ok("https://img.example/cat.png"))
        .expect(1)
        .mount(&harness.upstream)
        .await;

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a cat" }))
        .await;

    // Enhancement failure never fails the generation.
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["was_enhanced"], false);
    assert!(body.get("enhanced_prompt").is_none());

    assert_eq!(harness.store.balance(&customer.id).unwrap(), 10);
}

// ============================================================================
// Validation and auth
// ============================================================================

#[tokio::test]
async fn empty_prompt_rejected_without_debit() {
    let harness = TestHarness::new().await;
    let customer = harness.seed_customer(&harness.test_user_id, 20);

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "   ", "enhance": false }))
        .await;

    response.assert_status_bad_request();
    assert_eq!(harness.store.balance(&customer.id).unwrap(), 20);
}

#[tokio::test]
async fn overlong_prompt_rejected() {
    let harness = TestHarness::new().await;
    harness.seed_customer(&harness.test_user_id, 20);

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "x".repeat(2001), "enhance": false }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn unknown_aspect_ratio_rejected() {
    let harness = TestHarness::new().await;
    harness.seed_customer(&harness.test_user_id, 20);

    let response = harness
        .server
        .post("/v1/generations")
        .add_header("authorization", harness.auth_header())
        .json(&json!({ "prompt": "a cat", "aspect_ratio": "2:1" }))
        .await;

    response.assert_status(axum::http::StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn generation_requires_auth() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/generations")
        .json(&json!({ "prompt": "a cat" }))
        .await;

    response.assert_status_unauthorized();
}
