#![allow(dead_code)]

use async_trait::async_trait;
use hgw_notify::application::engine::{NotificationProcessor, ProcessorConfig};
use hgw_notify::domain::integrity::IntegrityVerifier;
use hgw_notify::domain::notification::*;
use hgw_notify::domain::order::{Order, Quote};
use hgw_notify::domain::payment_method::PaymentMethods;
use hgw_notify::domain::ports::{
    AlertSink, IntegrityAlert, OrderMaterializer, OrderStore, TransactionLog,
};
use hgw_notify::domain::transaction_log::TransactionLogEntry;
use hgw_notify::error::{GatewayError, Result};
use hgw_notify::infrastructure::hashing::HmacSha256Hash;
use hgw_notify::infrastructure::in_memory::{InMemoryCommerceStore, InMemoryTransactionLog};
use rust_decimal_macros::dec;
use secrecy::SecretString;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const SECRET: &str = "integration-shared-secret";
pub const REDIRECT_URL: &str = "https://shop.example/hgw/index/redirect";

pub fn verifier() -> IntegrityVerifier {
    let hash = HmacSha256Hash::new(SecretString::from(SECRET.to_string())).unwrap();
    IntegrityVerifier::new(Box::new(hash))
}

pub fn sign(transaction_ref: &str) -> String {
    verifier().expected(transaction_ref)
}

pub fn quote(quote_id: u64) -> Quote {
    Quote {
        quote_id,
        grand_total: dec!(59.90),
        currency_code: "EUR".to_string(),
        customer_id: Some(21),
        customer_email: Some("customer@example.com".to_string()),
        billing_email: Some("billing@example.com".to_string()),
        customer_group_id: 1,
        payment_method: Some("hgwdd".to_string()),
    }
}

/// Builder for a processor notification form.
pub struct Notification {
    fields: FormFields,
}

impl Notification {
    /// A correctly signed `ACK` for `quote_id` matching [`quote`].
    pub fn ack(quote_id: u64, payment_code: &str, status_code: u32) -> Self {
        let id = quote_id.to_string();
        let mut fields = FormFields::new();
        for (key, value) in [
            (IDENTIFICATION_TRANSACTIONID, id.clone()),
            (CRITERION_SECRET, sign(&id)),
            (PROCESSING_RESULT, "ACK".to_string()),
            (PROCESSING_STATUS_CODE, status_code.to_string()),
            (PROCESSING_RETURN, "Request successfully processed".to_string()),
            (PROCESSING_RETURN_CODE, "000.100.112".to_string()),
            (PAYMENT_CODE, payment_code.to_string()),
            (IDENTIFICATION_UNIQUEID, format!("31HA07BC81{id}")),
            (IDENTIFICATION_SHORTID, format!("4711.{id}")),
            (TRANSACTION_MODE, "CONNECTOR_TEST".to_string()),
            (PRESENTATION_AMOUNT, "59.90".to_string()),
            (PRESENTATION_CURRENCY, "EUR".to_string()),
        ] {
            fields.insert(key.to_string(), value);
        }
        Self { fields }
    }

    pub fn nok(quote_id: u64, payment_code: &str) -> Self {
        Self::ack(quote_id, payment_code, 60)
            .with(PROCESSING_RESULT, "NOK")
            .with(PROCESSING_RETURN, "Card declined")
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.fields.remove(key);
        self
    }

    pub fn guest(self) -> Self {
        self.with(CRITERION_GUEST, "true")
    }

    pub fn form(&self) -> FormFields {
        self.fields.clone()
    }

    pub fn encoded(&self) -> String {
        let pairs: Vec<(&String, &String)> = self.fields.iter().collect();
        serde_urlencoded::to_string(pairs).unwrap()
    }
}

/// Wraps the in-memory store, counting calls and optionally failing saves.
#[derive(Clone, Default)]
pub struct CountingOrderStore {
    pub inner: InMemoryCommerceStore,
    pub loads: Arc<AtomicUsize>,
    pub saves: Arc<AtomicUsize>,
    pub materializations: Arc<AtomicUsize>,
    pub fail_saves: Arc<AtomicBool>,
}

#[async_trait]
impl OrderStore for CountingOrderStore {
    async fn find_by_quote(&self, quote_id: u64) -> Result<Option<Order>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_by_quote(quote_id).await
    }

    async fn save(&self, order: Order) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(GatewayError::internal("order database unavailable"));
        }
        self.inner.save(order).await
    }
}

#[async_trait]
impl OrderMaterializer for CountingOrderStore {
    async fn materialize(&self, quote_id: u64, as_guest: bool) -> Result<Order> {
        self.materializations.fetch_add(1, Ordering::SeqCst);
        self.inner.materialize(quote_id, as_guest).await
    }
}

/// Wraps the in-memory log and optionally fails appends.
#[derive(Clone, Default)]
pub struct FlakyTransactionLog {
    pub inner: InMemoryTransactionLog,
    pub fail_appends: Arc<AtomicBool>,
}

#[async_trait]
impl TransactionLog for FlakyTransactionLog {
    async fn append(&self, entry: TransactionLogEntry) -> Result<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(GatewayError::internal("log table locked"));
        }
        self.inner.append(entry).await
    }

    async fn entries_for(&self, transaction_id: u64) -> Result<Vec<TransactionLogEntry>> {
        self.inner.entries_for(transaction_id).await
    }
}

#[derive(Clone, Default)]
pub struct RecordingAlertSink {
    pub alerts: Arc<Mutex<Vec<IntegrityAlert>>>,
}

impl AlertSink for RecordingAlertSink {
    fn raise(&self, alert: &IntegrityAlert) {
        self.alerts.lock().unwrap().push(alert.clone());
    }
}

pub struct Harness {
    pub processor: Arc<NotificationProcessor>,
    pub store: CountingOrderStore,
    pub log: FlakyTransactionLog,
    pub alerts: RecordingAlertSink,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_payment_methods(PaymentMethods::default())
    }

    pub fn with_payment_methods(methods: PaymentMethods) -> Self {
        let store = CountingOrderStore::default();
        let log = FlakyTransactionLog::default();
        let alerts = RecordingAlertSink::default();

        let processor = NotificationProcessor::new(
            ProcessorConfig {
                redirect_url: REDIRECT_URL.to_string(),
            },
            verifier(),
            Box::new(store.clone()),
            Box::new(store.clone()),
            Box::new(log.clone()),
            Box::new(alerts.clone()),
        )
        .with_payment_methods(methods);

        Self {
            processor: Arc::new(processor),
            store,
            log,
            alerts,
        }
    }

    pub async fn with_quotes(quote_ids: &[u64]) -> Self {
        Self::new().seeded(quote_ids).await
    }

    pub async fn seeded(self, quote_ids: &[u64]) -> Self {
        for id in quote_ids {
            self.store.inner.put_quote(quote(*id)).await;
        }
        self
    }

    pub async fn order(&self, quote_id: u64) -> Option<Order> {
        self.store.inner.find_by_quote(quote_id).await.unwrap()
    }

    pub async fn log_entries(&self, transaction_id: u64) -> Vec<TransactionLogEntry> {
        self.log.inner.entries_for(transaction_id).await.unwrap()
    }

    pub fn loads(&self) -> usize {
        self.store.loads.load(Ordering::SeqCst)
    }

    pub fn alerts(&self) -> Vec<IntegrityAlert> {
        self.alerts.alerts.lock().unwrap().clone()
    }
}
