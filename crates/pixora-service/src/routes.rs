//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{billing, credits, generations, health, webhooks};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Generations (bearer auth)
/// - `POST /v1/generations` - Generate an image (debits credits)
/// - `GET /v1/generations` - Generation history
///
/// ## Credits (bearer auth, read-only)
/// - `GET /v1/credits/balance` - Current balance
/// - `GET /v1/credits/history` - Transaction history
///
/// ## Billing (bearer auth)
/// - `POST /v1/billing/checkout` - Create a Creem checkout session
/// - `POST /v1/billing/portal` - Customer-portal link
/// - `GET /v1/billing/subscription` - Active subscription, if any
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/creem` - Creem payment events
pub fn create_router(state: AppState) -> Router {
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        // Health (public)
        .route("/health", get(health::health))
        // Generations
        .route(
            "/v1/generations",
            post(generations::create_generation).get(generations::list_generations),
        )
        // Credits (read-only)
        .route("/v1/credits/balance", get(credits::get_balance))
        .route("/v1/credits/history", get(credits::list_history))
        // Billing
        .route("/v1/billing/checkout", post(billing::create_checkout))
        .route("/v1/billing/portal", post(billing::customer_portal))
        .route("/v1/billing/subscription", get(billing::get_subscription))
        // Webhooks
        .route("/webhooks/creem", post(webhooks::creem_webhook))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
