//! Core types and utilities for the Pixora service.
//!
//! This crate provides the foundational types used throughout the platform:
//!
//! - **Identifiers**: `UserId`, `CustomerId`, `TransactionId`, `GenerationId`
//! - **Customers**: `Customer` - the authoritative credit balance holder
//! - **Credits**: `CreditTransaction`, `TransactionKind` - the append-only ledger history
//! - **Subscriptions**: `Subscription`, `SubscriptionStatus` - mirrored provider state
//! - **Generations**: `GenerationRecord`, request enums for aspect ratio / style / model
//! - **Pricing**: `PricingConfig`
//!
//! # Credit unit
//!
//! Credits are opaque integer units metering image generation (10 credits per
//! generation by default). They are stored as `i64` and every balance change
//! is recorded as a `CreditTransaction`, so that for any customer the sum of
//! all transaction amounts equals the current balance.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod credits;
pub mod customer;
pub mod generation;
pub mod ids;
pub mod pricing;
pub mod subscription;

pub use credits::{CreditTransaction, TransactionKind};
pub use customer::Customer;
pub use generation::{
    AspectRatio, GenerationRecord, GenerationStatus, ImageModel, Style, DEFAULT_IMAGE_SIZE,
};
pub use ids::{CustomerId, GenerationId, IdError, TransactionId, UserId};
pub use pricing::{PricingConfig, DEFAULT_CREDITS_PER_GENERATION};
pub use subscription::{Subscription, SubscriptionStatus};
