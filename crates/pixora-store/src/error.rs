//! Error types for Pixora storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// Insufficient funds is deliberately NOT represented here: a debit that
/// fails the balance check is a normal business outcome, reported as a
/// [`crate::DebitOutcome`] value, not an error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed. Writes that hit this must be treated as
    /// not-committed by callers.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The entity kind that was looked up.
        entity: &'static str,
        /// The id that was not found.
        id: String,
    },

    /// Ledger amounts must be strictly positive.
    #[error("invalid amount: {0} (must be > 0)")]
    InvalidAmount(i64),
}
