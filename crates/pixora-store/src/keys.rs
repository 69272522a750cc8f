//! Key encoding for the `RocksDB` column families.
//!
//! Index keys are a fixed 16-byte id prefix followed by the indexed id, so
//! prefix iteration over a customer's records is bounded and, for ULID
//! suffixes, time-ordered.

use pixora_core::{CustomerId, GenerationId, TransactionId, UserId};

/// Customer record key.
#[must_use]
pub fn customer_key(customer_id: &CustomerId) -> Vec<u8> {
    customer_id.as_bytes().to_vec()
}

/// User-index key.
#[must_use]
pub fn user_index_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Provider-customer-index key.
#[must_use]
pub fn provider_index_key(provider_customer_id: &str) -> Vec<u8> {
    provider_customer_id.as_bytes().to_vec()
}

/// Transaction record key.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Customer-transaction index key: `customer_id (16) || transaction_id (16)`.
#[must_use]
pub fn customer_transaction_key(
    customer_id: &CustomerId,
    transaction_id: &TransactionId,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(customer_id.as_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Extract the transaction id from a customer-transaction index key.
///
/// # Panics
///
/// Panics if the key is shorter than 32 bytes.
#[must_use]
pub fn transaction_id_from_index_key(key: &[u8]) -> TransactionId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    TransactionId::from_bytes(bytes)
}

/// Ledger idempotency-marker key: `customer_id (16) || external_ref`.
#[must_use]
pub fn ledger_ref_key(customer_id: &CustomerId, external_ref: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + external_ref.len());
    key.extend_from_slice(customer_id.as_bytes());
    key.extend_from_slice(external_ref.as_bytes());
    key
}

/// Subscription record key.
#[must_use]
pub fn subscription_key(provider_subscription_id: &str) -> Vec<u8> {
    provider_subscription_id.as_bytes().to_vec()
}

/// Customer-subscription index key: `customer_id (16) || provider id`.
#[must_use]
pub fn customer_subscription_key(
    customer_id: &CustomerId,
    provider_subscription_id: &str,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + provider_subscription_id.len());
    key.extend_from_slice(customer_id.as_bytes());
    key.extend_from_slice(provider_subscription_id.as_bytes());
    key
}

/// Generation record key.
#[must_use]
pub fn generation_key(generation_id: &GenerationId) -> Vec<u8> {
    generation_id.to_bytes().to_vec()
}

/// Customer-generation index key: `customer_id (16) || generation_id (16)`.
#[must_use]
pub fn customer_generation_key(
    customer_id: &CustomerId,
    generation_id: &GenerationId,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(customer_id.as_bytes());
    key.extend_from_slice(&generation_id.to_bytes());
    key
}

/// Extract the generation id from a customer-generation index key.
///
/// # Panics
///
/// Panics if the key is shorter than 32 bytes.
#[must_use]
pub fn generation_id_from_index_key(key: &[u8]) -> GenerationId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    GenerationId::from_bytes(bytes)
}

/// Prefix covering all of a customer's entries in a compound-key index.
#[must_use]
pub fn customer_prefix(customer_id: &CustomerId) -> Vec<u8> {
    customer_id.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn customer_transaction_key_layout() {
        let customer_id = CustomerId::generate();
        let tx_id = TransactionId::generate();
        let key = customer_transaction_key(&customer_id, &tx_id);

        assert_eq!(key.len(), 32);
        assert_eq!(&key[..16], customer_id.as_bytes());
        assert_eq!(&key[16..], tx_id.to_bytes());
    }

    #[test]
    fn transaction_id_index_roundtrip() {
        let customer_id = CustomerId::generate();
        let tx_id = TransactionId::generate();
        let key = customer_transaction_key(&customer_id, &tx_id);

        assert_eq!(transaction_id_from_index_key(&key), tx_id);
    }

    #[test]
    fn generation_id_index_roundtrip() {
        let customer_id = CustomerId::generate();
        let generation_id = GenerationId::generate();
        let key = customer_generation_key(&customer_id, &generation_id);

        assert_eq!(generation_id_from_index_key(&key), generation_id);
    }

    #[test]
    fn ledger_ref_key_embeds_ref() {
        let customer_id = CustomerId::generate();
        let key = ledger_ref_key(&customer_id, "ord_42");

        assert_eq!(&key[..16], customer_id.as_bytes());
        assert_eq!(&key[16..], b"ord_42");
    }
}
