//! `RocksDB` storage layer and credits ledger for Pixora.
//!
//! This crate owns every durable mutation in the system. The credits ledger
//! lives here because its correctness depends on the storage layer's atomic
//! primitives: a debit's balance check and balance update, together with the
//! transaction-history row, commit as one `WriteBatch` inside a critical
//! section, closing the read-then-write race between concurrent requests.
//!
//! # Column families
//!
//! - `customers` (+ `customers_by_user`, `customers_by_provider` indexes)
//! - `transactions` (+ `transactions_by_customer` index; ULID keys give
//!   chronological order)
//! - `ledger_refs`: idempotency markers for externally-referenced credits
//! - `subscriptions` (+ `subscriptions_by_customer` index)
//! - `generations` (+ `generations_by_customer` index)
//!
//! # Example
//!
//! ```no_run
//! use pixora_store::{RocksStore, Store, DebitOutcome};
//! use pixora_core::{Customer, UserId};
//!
//! let store = RocksStore::open("/tmp/pixora-db").unwrap();
//!
//! let customer = Customer::new(UserId::generate());
//! store.put_customer(&customer).unwrap();
//!
//! store.credit_credits(&customer.id, 100, "Sign-up bonus", None).unwrap();
//! match store.debit_credits(&customer.id, 10, "Generation").unwrap() {
//!     DebitOutcome::Applied { new_balance, .. } => println!("balance: {new_balance}"),
//!     DebitOutcome::InsufficientCredits { required, .. } => println!("need {required}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use pixora_core::{
    CreditTransaction, Customer, CustomerId, GenerationRecord, Subscription, TransactionId, UserId,
};

/// Outcome of a conditional debit.
///
/// Insufficient funds is an expected business condition, not a fault, so it
/// is a value rather than an error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebitOutcome {
    /// The debit committed together with its `subtract` transaction row.
    Applied {
        /// Id of the recorded transaction.
        transaction_id: TransactionId,
        /// Balance after the debit.
        new_balance: i64,
    },

    /// The balance did not cover the amount; nothing was written.
    InsufficientCredits {
        /// Balance at the time of the check.
        balance: i64,
        /// The amount that was requested.
        required: i64,
    },
}

/// The storage trait defining all database operations.
///
/// Abstracts the storage layer so handlers can be exercised against any
/// implementation.
pub trait Store: Send + Sync {
    // =========================================================================
    // Customer Operations
    // =========================================================================

    /// Insert a customer, or update its profile fields in place.
    ///
    /// Maintains the user and provider indexes. On update the stored credit
    /// balance is preserved: balance changes flow only through
    /// [`Store::debit_credits`] and [`Store::credit_credits`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_customer(&self, customer: &Customer) -> Result<()>;

    /// Get a customer by internal id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_customer(&self, customer_id: &CustomerId) -> Result<Option<Customer>>;

    /// Find a customer by the internal user identity it belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_customer_by_user(&self, user_id: &UserId) -> Result<Option<Customer>>;

    /// Find a customer by payment-provider customer id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_customer_by_provider(&self, provider_customer_id: &str) -> Result<Option<Customer>>;

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Conditionally debit credits: subtract `amount` where the balance
    /// covers it, appending the `subtract` transaction row in the same
    /// atomic batch.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if `amount <= 0`.
    /// - `StoreError::NotFound` if the customer doesn't exist.
    /// - `StoreError::Database` if the write cannot be committed; callers
    ///   must treat the debit as not-applied.
    fn debit_credits(
        &self,
        customer_id: &CustomerId,
        amount: i64,
        description: &str,
    ) -> Result<DebitOutcome>;

    /// Credit `amount` to the customer, appending the `add` transaction row
    /// in the same atomic batch. Returns the new balance.
    ///
    /// When `external_ref` is supplied and a transaction carrying the same
    /// reference already exists for this customer, the call is a no-op and
    /// the current balance is returned unchanged - this is what makes
    /// webhook redelivery safe.
    ///
    /// # Errors
    ///
    /// - `StoreError::InvalidAmount` if `amount <= 0`.
    /// - `StoreError::NotFound` if the customer doesn't exist.
    /// - `StoreError::Database` if the write cannot be committed.
    fn credit_credits(
        &self,
        customer_id: &CustomerId,
        amount: i64,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<i64>;

    /// Read the current balance. No side effects.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the customer doesn't exist.
    fn balance(&self, customer_id: &CustomerId) -> Result<i64>;

    /// List a customer's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(
        &self,
        customer_id: &CustomerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>>;

    // =========================================================================
    // Subscription Operations
    // =========================================================================

    /// Insert or replace a subscription, keyed by provider subscription id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_subscription(&self, subscription: &Subscription) -> Result<()>;

    /// Get a subscription by provider subscription id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_subscription(&self, provider_subscription_id: &str) -> Result<Option<Subscription>>;

    /// List all subscriptions ever recorded for a customer.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_subscriptions(&self, customer_id: &CustomerId) -> Result<Vec<Subscription>>;

    // =========================================================================
    // Generation Operations
    // =========================================================================

    /// Append a generation record. Records are immutable once written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_generation(&self, record: &GenerationRecord) -> Result<()>;

    /// List a customer's generation records, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_generations(
        &self,
        customer_id: &CustomerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<GenerationRecord>>;
}
