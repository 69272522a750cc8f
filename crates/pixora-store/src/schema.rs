//! Column family layout for the `RocksDB` store.

/// Column family names.
pub mod cf {
    /// Customer records, keyed by customer id.
    pub const CUSTOMERS: &str = "customers";

    /// Index: user id -> customer id.
    pub const CUSTOMERS_BY_USER: &str = "customers_by_user";

    /// Index: provider customer id -> customer id.
    pub const CUSTOMERS_BY_PROVIDER: &str = "customers_by_provider";

    /// Credit transactions, keyed by transaction id (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: customer id || transaction id -> (empty).
    pub const TRANSACTIONS_BY_CUSTOMER: &str = "transactions_by_customer";

    /// Idempotency markers: customer id || external ref -> transaction id.
    pub const LEDGER_REFS: &str = "ledger_refs";

    /// Subscriptions, keyed by provider subscription id.
    pub const SUBSCRIPTIONS: &str = "subscriptions";

    /// Index: customer id || provider subscription id -> (empty).
    pub const SUBSCRIPTIONS_BY_CUSTOMER: &str = "subscriptions_by_customer";

    /// Generation records, keyed by generation id (ULID).
    pub const GENERATIONS: &str = "generations";

    /// Index: customer id || generation id -> (empty).
    pub const GENERATIONS_BY_CUSTOMER: &str = "generations_by_customer";
}

/// All column families that must exist in the database.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::CUSTOMERS,
        cf::CUSTOMERS_BY_USER,
        cf::CUSTOMERS_BY_PROVIDER,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_CUSTOMER,
        cf::LEDGER_REFS,
        cf::SUBSCRIPTIONS,
        cf::SUBSCRIPTIONS_BY_CUSTOMER,
        cf::GENERATIONS,
        cf::GENERATIONS_BY_CUSTOMER,
    ]
}
