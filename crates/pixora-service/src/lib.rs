//! Pixora HTTP API service.
//!
//! Wires the three core components around the store:
//!
//! - the **credits ledger** (read surface under `/v1/credits`),
//! - the **generation metering gateway** (`/v1/generations`), which debits
//!   before calling the upstream image API and refunds on failure,
//! - the **payment event reconciler** (`/webhooks/creem`), which turns
//!   at-least-once provider webhooks into idempotent state updates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod creem;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod zhipu;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
