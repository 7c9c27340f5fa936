use crate::domain::order::{Order, Quote};
use crate::domain::ports::{OrderMaterializer, OrderStore, TransactionLog};
use crate::domain::transaction_log::TransactionLogEntry;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for quotes and the orders created from them.
///
/// Uses `Arc<RwLock<HashMap<..>>>` so clones share the same data. Ideal for
/// tests or a single-process deployment where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryCommerceStore {
    quotes: Arc<RwLock<HashMap<u64, Quote>>>,
    orders: Arc<RwLock<HashMap<u64, Order>>>,
}

impl InMemoryCommerceStore {
    /// Creates a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_quote(&self, quote: Quote) {
        let mut quotes = self.quotes.write().await;
        quotes.insert(quote.quote_id, quote);
    }

    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryCommerceStore {
    async fn find_by_quote(&self, quote_id: u64) -> Result<Option<Order>> {
        let orders = self.orders.read().await;
        Ok(orders.get(&quote_id).cloned())
    }

    async fn save(&self, order: Order) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.quote_id, order);
        Ok(())
    }
}

#[async_trait]
impl OrderMaterializer for InMemoryCommerceStore {
    async fn materialize(&self, quote_id: u64, as_guest: bool) -> Result<Order> {
        // Holding the orders lock makes check-and-insert atomic.
        let mut orders = self.orders.write().await;
        if let Some(existing) = orders.get(&quote_id) {
            return Ok(existing.clone());
        }

        let mut quote = self
            .quotes
            .read()
            .await
            .get(&quote_id)
            .cloned()
            .ok_or_else(|| GatewayError::Materialization {
                quote_id,
                reason: "quote not found".to_string(),
            })?;

        prepare_quote(&mut quote, as_guest)?;
        let order = quote.into_order();
        orders.insert(quote_id, order.clone());
        Ok(order)
    }
}

/// Applies guest conversion and checks the quote can become an order.
pub(crate) fn prepare_quote(quote: &mut Quote, as_guest: bool) -> Result<()> {
    if as_guest {
        quote.convert_to_guest();
    }
    if quote.is_guest() && quote.customer_email.is_none() {
        return Err(GatewayError::Materialization {
            quote_id: quote.quote_id,
            reason: "guest quote has no billing email".to_string(),
        });
    }
    Ok(())
}

/// A thread-safe in-memory append-only transaction log.
#[derive(Default, Clone)]
pub struct InMemoryTransactionLog {
    entries: Arc<RwLock<HashMap<u64, Vec<TransactionLogEntry>>>>,
}

impl InMemoryTransactionLog {
    /// Creates a new, empty transaction log.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TransactionLog for InMemoryTransactionLog {
    async fn append(&self, entry: TransactionLogEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.entry(entry.transaction_id).or_default().push(entry);
        Ok(())
    }

    async fn entries_for(&self, transaction_id: u64) -> Result<Vec<TransactionLogEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(&transaction_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderStatus;
    use crate::domain::transaction_log::LogSource;
    use rust_decimal_macros::dec;

    fn quote(quote_id: u64, billing_email: Option<&str>) -> Quote {
        Quote {
            quote_id,
            grand_total: dec!(12.5),
            currency_code: "EUR".to_string(),
            customer_id: Some(4),
            customer_email: Some("account@example.com".to_string()),
            billing_email: billing_email.map(str::to_string),
            customer_group_id: 1,
            payment_method: None,
        }
    }

    fn entry(transaction_id: u64, unique_id: &str) -> TransactionLogEntry {
        TransactionLogEntry {
            payment_method: "CC".to_string(),
            payment_type: "DB".to_string(),
            transaction_id,
            unique_id: unique_id.to_string(),
            short_id: String::new(),
            status_code: 90,
            result: "ACK".to_string(),
            return_message: String::new(),
            return_code: String::new(),
            payload: "{}".to_string(),
            source: LogSource::Response,
            applied: true,
        }
    }

    #[tokio::test]
    async fn test_in_memory_order_store() {
        let store = InMemoryCommerceStore::new();
        let mut order = quote(1, None).into_order();
        order.status = OrderStatus::Processing;

        store.save(order.clone()).await.unwrap();
        let retrieved = store.find_by_quote(1).await.unwrap().unwrap();
        assert_eq!(retrieved, order);

        assert!(store.find_by_quote(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_materialize_registered_and_guest() {
        let store = InMemoryCommerceStore::new();
        store.put_quote(quote(1, Some("bill@example.com"))).await;
        store.put_quote(quote(2, Some("bill@example.com"))).await;

        let registered = store.materialize(1, false).await.unwrap();
        assert_eq!(registered.customer_id, Some(4));

        let guest = store.materialize(2, true).await.unwrap();
        assert!(guest.customer_is_guest);
        assert_eq!(guest.customer_email.as_deref(), Some("bill@example.com"));
        assert_eq!(store.order_count().await, 2);
    }

    #[tokio::test]
    async fn test_materialize_twice_returns_same_order() {
        let store = InMemoryCommerceStore::new();
        store.put_quote(quote(3, Some("bill@example.com"))).await;

        let first = store.materialize(3, false).await.unwrap();
        let second = store.materialize(3, false).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_materialization_leaves_no_order() {
        let store = InMemoryCommerceStore::new();
        store.put_quote(quote(4, None)).await;

        assert!(matches!(
            store.materialize(4, true).await,
            Err(GatewayError::Materialization { quote_id: 4, .. })
        ));
        assert!(matches!(
            store.materialize(99, false).await,
            Err(GatewayError::Materialization { quote_id: 99, .. })
        ));
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn test_in_memory_transaction_log() {
        let log = InMemoryTransactionLog::new();
        assert!(log.is_empty().await);

        log.append(entry(1, "A")).await.unwrap();
        log.append(entry(1, "B")).await.unwrap();
        log.append(entry(2, "C")).await.unwrap();

        let first = log.entries_for(1).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].unique_id, "A");
        assert_eq!(first[1].unique_id, "B");
        assert_eq!(log.len().await, 3);
        assert!(log.entries_for(3).await.unwrap().is_empty());
    }
}
