//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Ledger mutations acquire a store-level write lock and commit through a
//! single `WriteBatch`, so the balance check, the balance update, and the
//! history row are one atomic unit.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use pixora_core::{
    CreditTransaction, Customer, CustomerId, GenerationRecord, Subscription, UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{DebitOutcome, Store};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    // All balance mutations serialize on this lock: the conditional check
    // and the batch commit form one critical section.
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Load a customer or fail with `NotFound`.
    fn load_customer(&self, customer_id: &CustomerId) -> Result<Customer> {
        self.get_customer(customer_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "customer",
                id: customer_id.to_string(),
            })
    }

    /// Whether a ledger ref marker exists for `(customer, external_ref)`.
    fn has_ledger_ref(&self, customer_id: &CustomerId, external_ref: &str) -> Result<bool> {
        let cf = self.cf(cf::LEDGER_REFS)?;
        let key = keys::ledger_ref_key(customer_id, external_ref);

        let exists = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        Ok(exists)
    }

    /// Stage a customer write (record plus both indexes) into a batch.
    fn stage_customer(&self, batch: &mut WriteBatch, customer: &Customer) -> Result<()> {
        let cf_customers = self.cf(cf::CUSTOMERS)?;
        let cf_by_user = self.cf(cf::CUSTOMERS_BY_USER)?;
        let cf_by_provider = self.cf(cf::CUSTOMERS_BY_PROVIDER)?;

        let value = Self::serialize(customer)?;
        batch.put_cf(&cf_customers, keys::customer_key(&customer.id), &value);
        batch.put_cf(
            &cf_by_user,
            keys::user_index_key(&customer.user_id),
            customer.id.as_bytes(),
        );
        if let Some(provider_id) = &customer.provider_customer_id {
            batch.put_cf(
                &cf_by_provider,
                keys::provider_index_key(provider_id),
                customer.id.as_bytes(),
            );
        }

        Ok(())
    }

    /// Stage a transaction row (record plus customer index) into a batch.
    fn stage_transaction(&self, batch: &mut WriteBatch, tx: &CreditTransaction) -> Result<()> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_customer = self.cf(cf::TRANSACTIONS_BY_CUSTOMER)?;

        let value = Self::serialize(tx)?;
        batch.put_cf(&cf_tx, keys::transaction_key(&tx.id), &value);
        batch.put_cf(
            &cf_by_customer,
            keys::customer_transaction_key(&tx.customer_id, &tx.id),
            [],
        );

        Ok(())
    }

    /// Collect index keys under a customer prefix, newest first, paginated.
    fn index_keys_newest_first(
        &self,
        cf_name: &str,
        customer_id: &CustomerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let prefix = keys::customer_prefix(customer_id);

        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        // ULID suffixes are time-ordered, so forward iteration yields oldest
        // first; collect and reverse.
        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            all_keys.push(key.to_vec());
        }

        all_keys.reverse();

        Ok(all_keys.into_iter().skip(offset).take(limit).collect())
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Customer Operations
    // =========================================================================

    fn put_customer(&self, customer: &Customer) -> Result<()> {
        let _guard = self.lock();

        // Profile upserts never move the balance; preserve whatever the
        // ledger last committed.
        let mut record = customer.clone();
        if let Some(existing) = self.get_customer(&customer.id)? {
            record.credits = existing.credits;
            record.created_at = existing.created_at;
        }

        let mut batch = WriteBatch::default();
        self.stage_customer(&mut batch, &record)?;

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_customer(&self, customer_id: &CustomerId) -> Result<Option<Customer>> {
        let cf = self.cf(cf::CUSTOMERS)?;

        self.db
            .get_cf(&cf, keys::customer_key(customer_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn find_customer_by_user(&self, user_id: &UserId) -> Result<Option<Customer>> {
        let cf = self.cf(cf::CUSTOMERS_BY_USER)?;

        let Some(id_bytes) = self
            .db
            .get_cf(&cf, keys::user_index_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let uuid = uuid::Uuid::from_slice(&id_bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.get_customer(&CustomerId::from_uuid(uuid))
    }

    fn find_customer_by_provider(&self, provider_customer_id: &str) -> Result<Option<Customer>> {
        let cf = self.cf(cf::CUSTOMERS_BY_PROVIDER)?;

        let Some(id_bytes) = self
            .db
            .get_cf(&cf, keys::provider_index_key(provider_customer_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let uuid = uuid::Uuid::from_slice(&id_bytes)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.get_customer(&CustomerId::from_uuid(uuid))
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    fn debit_credits(
        &self,
        customer_id: &CustomerId,
        amount: i64,
        description: &str,
    ) -> Result<DebitOutcome> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount(amount));
        }

        let _guard = self.lock();

        let mut customer = self.load_customer(customer_id)?;

        if customer.credits < amount {
            return Ok(DebitOutcome::InsufficientCredits {
                balance: customer.credits,
                required: amount,
            });
        }

        customer.credits -= amount;
        customer.updated_at = chrono::Utc::now();

        let tx = CreditTransaction::usage(*customer_id, amount, description.to_string());

        let mut batch = WriteBatch::default();
        self.stage_customer(&mut batch, &customer)?;
        self.stage_transaction(&mut batch, &tx)?;

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(DebitOutcome::Applied {
            transaction_id: tx.id,
            new_balance: customer.credits,
        })
    }

    fn credit_credits(
        &self,
        customer_id: &CustomerId,
        amount: i64,
        description: &str,
        external_ref: Option<&str>,
    ) -> Result<i64> {
        if amount <= 0 {
            return Err(StoreError::InvalidAmount(amount));
        }

        let _guard = self.lock();

        let mut customer = self.load_customer(customer_id)?;

        if let Some(external_ref) = external_ref {
            if self.has_ledger_ref(customer_id, external_ref)? {
                tracing::info!(
                    customer_id = %customer_id,
                    external_ref = %external_ref,
                    "Duplicate ledger credit ignored"
                );
                return Ok(customer.credits);
            }
        }

        customer.credits += amount;
        customer.updated_at = chrono::Utc::now();

        let tx = CreditTransaction::grant(
            *customer_id,
            amount,
            description.to_string(),
            external_ref.map(String::from),
        );

        let mut batch = WriteBatch::default();
        self.stage_customer(&mut batch, &customer)?;
        self.stage_transaction(&mut batch, &tx)?;
        if let Some(external_ref) = external_ref {
            let cf_refs = self.cf(cf::LEDGER_REFS)?;
            batch.put_cf(
                &cf_refs,
                keys::ledger_ref_key(customer_id, external_ref),
                tx.id.to_bytes(),
            );
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(customer.credits)
    }

    fn balance(&self, customer_id: &CustomerId) -> Result<i64> {
        Ok(self.load_customer(customer_id)?.credits)
    }

    fn list_transactions(
        &self,
        customer_id: &CustomerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<CreditTransaction>> {
        let index_keys =
            self.index_keys_newest_first(cf::TRANSACTIONS_BY_CUSTOMER, customer_id, limit, offset)?;

        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let mut transactions = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let tx_id = keys::transaction_id_from_index_key(&key);
            if let Some(data) = self
                .db
                .get_cf(&cf_tx, keys::transaction_key(&tx_id))
                .map_err(|e| StoreError::Database(e.to_string()))?
            {
                transactions.push(Self::deserialize(&data)?);
            }
        }

        Ok(transactions)
    }

    // =========================================================================
    // Subscription Operations
    // =========================================================================

    fn put_subscription(&self, subscription: &Subscription) -> Result<()> {
        let cf_subs = self.cf(cf::SUBSCRIPTIONS)?;
        let cf_by_customer = self.cf(cf::SUBSCRIPTIONS_BY_CUSTOMER)?;

        let value = Self::serialize(subscription)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_subs,
            keys::subscription_key(&subscription.provider_subscription_id),
            &value,
        );
        batch.put_cf(
            &cf_by_customer,
            keys::customer_subscription_key(
                &subscription.customer_id,
                &subscription.provider_subscription_id,
            ),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn get_subscription(&self, provider_subscription_id: &str) -> Result<Option<Subscription>> {
        let cf = self.cf(cf::SUBSCRIPTIONS)?;

        self.db
            .get_cf(&cf, keys::subscription_key(provider_subscription_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_subscriptions(&self, customer_id: &CustomerId) -> Result<Vec<Subscription>> {
        let cf_index = self.cf(cf::SUBSCRIPTIONS_BY_CUSTOMER)?;
        let prefix = keys::customer_prefix(customer_id);

        let iter = self
            .db
            .iterator_cf(&cf_index, IteratorMode::From(&prefix, Direction::Forward));

        let mut subscriptions = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let provider_id = String::from_utf8(key[16..].to_vec())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            if let Some(subscription) = self.get_subscription(&provider_id)? {
                subscriptions.push(subscription);
            }
        }

        Ok(subscriptions)
    }

    // =========================================================================
    // Generation Operations
    // =========================================================================

    fn put_generation(&self, record: &GenerationRecord) -> Result<()> {
        let cf_gen = self.cf(cf::GENERATIONS)?;
        let cf_by_customer = self.cf(cf::GENERATIONS_BY_CUSTOMER)?;

        let value = Self::serialize(record)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_gen, keys::generation_key(&record.id), &value);
        batch.put_cf(
            &cf_by_customer,
            keys::customer_generation_key(&record.customer_id, &record.id),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn list_generations(
        &self,
        customer_id: &CustomerId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<GenerationRecord>> {
        let index_keys =
            self.index_keys_newest_first(cf::GENERATIONS_BY_CUSTOMER, customer_id, limit, offset)?;

        let cf_gen = self.cf(cf::GENERATIONS)?;
        let mut records = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let generation_id = keys::generation_id_from_index_key(&key);
            if let Some(data) = self
                .db
                .get_cf(&cf_gen, keys::generation_key(&generation_id))
                .map_err(|e| StoreError::Database(e.to_string()))?
            {
                records.push(Self::deserialize(&data)?);
            }
        }

        Ok(records)
    }
}
