//! Common test utilities for pixora-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{EncodingKey, Header};
use tempfile::TempDir;
use wiremock::MockServer;

use pixora_core::{Customer, UserId};
use pixora_service::auth::JwtClaims;
use pixora_service::crypto::hmac_sha256_hex;
use pixora_service::{create_router, AppState, ServiceConfig};
use pixora_store::{RocksStore, Store};

/// HS256 secret shared between the harness and minted test tokens.
pub const TEST_JWT_SECRET: &str = "test-jwt-secret";

/// Webhook signing secret configured into the harness.
pub const TEST_WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Mock upstream (Zhipu) server.
    pub upstream: MockServer,
    /// Direct store handle for seeding and asserting ledger state.
    pub store: Arc<RocksStore>,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and mock upstream.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));
        let upstream = MockServer::start().await;

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            jwt_secret: TEST_JWT_SECRET.into(),
            jwt_audience: "pixora".into(),
            zhipu_api_url: upstream.uri(),
            zhipu_api_key: Some("test-zhipu-key".into()),
            zhipu_timeout_seconds: 1,
            creem_api_url: "http://localhost:1".into(),
            creem_api_key: None,
            creem_webhook_secret: Some(TEST_WEBHOOK_SECRET.into()),
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            pricing: pixora_core::PricingConfig::default(),
        };

        let state = AppState::new(Arc::clone(&store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            upstream,
            store,
            _temp_dir: temp_dir,
            test_user_id,
        }
    }

    /// Get the authorization header for the default test user.
    pub fn auth_header(&self) -> String {
        Self::auth_header_for(&self.test_user_id)
    }

    /// Mint an authorization header for an arbitrary user.
    pub fn auth_header_for(user_id: &UserId) -> String {
        let claims = JwtClaims {
            sub: user_id.to_string(),
            aud: "pixora".into(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
        )
        .expect("Failed to mint test token");

        format!("Bearer {token}")
    }

    /// Sign a webhook body the way the provider would.
    pub fn sign(body: &str) -> String {
        hmac_sha256_hex(TEST_WEBHOOK_SECRET, body)
    }

    /// Seed a customer for the given user with an initial balance.
    pub fn seed_customer(&self, user_id: &UserId, credits: i64) -> Customer {
        let customer = Customer::new(*user_id);
        self.store.put_customer(&customer).unwrap();
        if credits > 0 {
            self.store
                .credit_credits(&customer.id, credits, "Test seed", None)
                .unwrap();
        }
        self.store.get_customer(&customer.id).unwrap().unwrap()
    }

    /// Deliver a signed webhook body and return the response.
    pub async fn deliver_webhook(&self, body: &serde_json::Value) -> axum_test::TestResponse {
        let body = body.to_string();
        self.server
            .post("/webhooks/creem")
            .add_header("creem-signature", Self::sign(&body))
            .add_header("content-type", "application/json")
            .text(body)
            .await
    }
}
