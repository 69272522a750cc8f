//! Creem payment-provider integration.
//!
//! Outbound: checkout sessions and customer-portal links via `CreemClient`.
//! Inbound: webhook payload types consumed by the event reconciler.

pub mod client;
pub mod types;

pub use client::{CreemClient, CreemError};
