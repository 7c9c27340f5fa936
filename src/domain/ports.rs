use super::order::Order;
use super::transaction_log::TransactionLogEntry;
use crate::error::Result;
use async_trait::async_trait;

/// Orders indexed by the quote they were created from.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_quote(&self, quote_id: u64) -> Result<Option<Order>>;
    async fn save(&self, order: Order) -> Result<()>;
}

/// Converts a quote into a persisted order.
///
/// Either the order is fully created and stored, or an error is returned and
/// nothing is stored.
#[async_trait]
pub trait OrderMaterializer: Send + Sync {
    async fn materialize(&self, quote_id: u64, as_guest: bool) -> Result<Order>;
}

/// Append-only log of every verified notification.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    async fn append(&self, entry: TransactionLogEntry) -> Result<()>;
    async fn entries_for(&self, transaction_id: u64) -> Result<Vec<TransactionLogEntry>>;
}

/// Where a notification came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    /// Socket peer address. The only value the caller cannot choose.
    pub peer: Option<String>,
    /// First `X-Forwarded-For` hop as claimed by the caller.
    pub forwarded_for: Option<String>,
}

impl RequestOrigin {
    pub fn peer(peer: impl Into<String>) -> Self {
        Self {
            peer: Some(peer.into()),
            forwarded_for: None,
        }
    }
}

/// A rejected notification, as reported to the operational alerting channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityAlert {
    /// Socket peer address.
    pub origin: Option<String>,
    pub forwarded_for: Option<String>,
    pub transaction_ref: String,
    pub reason: String,
    pub expected_hash: Option<String>,
}

pub trait AlertSink: Send + Sync {
    fn raise(&self, alert: &IntegrityAlert);
}

pub type OrderStoreBox = Box<dyn OrderStore>;
pub type OrderMaterializerBox = Box<dyn OrderMaterializer>;
pub type TransactionLogBox = Box<dyn TransactionLog>;
pub type AlertSinkBox = Box<dyn AlertSink>;
