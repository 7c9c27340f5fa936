use super::in_memory::prepare_quote;
use crate::domain::order::{Order, Quote};
use crate::domain::ports::{OrderMaterializer, OrderStore, TransactionLog};
use crate::domain::transaction_log::TransactionLogEntry;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Column Family for quotes awaiting payment.
pub const CF_QUOTES: &str = "quotes";
/// Column Family for orders, keyed by quote id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for the append-only transaction log.
pub const CF_TRANSACTION_LOG: &str = "transaction_log";

/// A persistent store implementation using RocksDB.
///
/// Quotes, orders and the transaction log live in separate Column Families.
/// Log keys are the big-endian transaction id followed by a big-endian
/// sequence number, so a prefix scan returns one transaction's entries in
/// arrival order.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    // Serializes check-then-write sequences (materialization, log sequence numbers).
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path, creating
    /// missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_QUOTES, CF_ORDERS, CF_TRANSACTION_LOG]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn put_quote(&self, quote: &Quote) -> Result<()> {
        self.put(CF_QUOTES, &quote.quote_id.to_be_bytes(), quote)
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| GatewayError::internal(format!("{name} column family not found")))
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn log_entries(&self, transaction_id: u64) -> Result<Vec<TransactionLogEntry>> {
        let cf = self.cf(CF_TRANSACTION_LOG)?;
        let prefix = transaction_id.to_be_bytes();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn find_by_quote(&self, quote_id: u64) -> Result<Option<Order>> {
        self.get(CF_ORDERS, &quote_id.to_be_bytes())
    }

    async fn save(&self, order: Order) -> Result<()> {
        self.put(CF_ORDERS, &order.quote_id.to_be_bytes(), &order)
    }
}

#[async_trait]
impl OrderMaterializer for RocksDBStore {
    async fn materialize(&self, quote_id: u64, as_guest: bool) -> Result<Order> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let key = quote_id.to_be_bytes();

        if let Some(existing) = self.get::<Order>(CF_ORDERS, &key)? {
            return Ok(existing);
        }

        let mut quote: Quote =
            self.get(CF_QUOTES, &key)?
                .ok_or_else(|| GatewayError::Materialization {
                    quote_id,
                    reason: "quote not found".to_string(),
                })?;

        prepare_quote(&mut quote, as_guest)?;
        let order = quote.into_order();
        self.put(CF_ORDERS, &key, &order)?;
        Ok(order)
    }
}

#[async_trait]
impl TransactionLog for RocksDBStore {
    async fn append(&self, entry: TransactionLogEntry) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let sequence = self.log_entries(entry.transaction_id)?.len() as u64;

        let mut key = Vec::with_capacity(16);
        key.extend_from_slice(&entry.transaction_id.to_be_bytes());
        key.extend_from_slice(&sequence.to_be_bytes());

        self.put(CF_TRANSACTION_LOG, &key, &entry)
    }

    async fn entries_for(&self, transaction_id: u64) -> Result<Vec<TransactionLogEntry>> {
        self.log_entries(transaction_id)
    }
}
