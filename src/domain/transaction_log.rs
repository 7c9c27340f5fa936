use super::notification::NotificationResult;
use serde::{Deserialize, Serialize};

/// Where a logged notification came from.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSource {
    Response,
}

/// Immutable audit record of one received notification.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct TransactionLogEntry {
    pub payment_method: String,
    pub payment_type: String,
    pub transaction_id: u64,
    pub unique_id: String,
    pub short_id: String,
    pub status_code: u32,
    pub result: String,
    pub return_message: String,
    pub return_code: String,
    /// JSON of the normalized notification, without the supplied secret.
    pub payload: String,
    pub source: LogSource,
    /// Whether the order was changed and saved for this notification.
    #[serde(default)]
    pub applied: bool,
}

impl TransactionLogEntry {
    pub fn from_notification(
        result: &NotificationResult,
        source: LogSource,
        applied: bool,
    ) -> Self {
        let payload = serde_json::json!({
            "notification": result,
            "source": source,
        })
        .to_string();

        Self {
            payment_method: result.payment_method().unwrap_or_default().to_string(),
            payment_type: result.payment_type().unwrap_or_default().to_string(),
            transaction_id: result.transaction_id,
            unique_id: result.unique_id.clone(),
            short_id: result.short_id.clone(),
            status_code: result.status_code,
            result: result.result.to_string(),
            return_message: result.return_message.clone(),
            return_code: result.return_code.clone(),
            payload,
            source,
            applied,
        }
    }

    /// Whether this entry records the same processor outcome as `result`.
    pub fn is_redelivery_of(&self, result: &NotificationResult) -> bool {
        !self.unique_id.is_empty()
            && self.unique_id == result.unique_id
            && self.status_code == result.status_code
            && self.result == result.result.to_string()
            && self.payment_method == result.payment_method().unwrap_or_default()
            && self.payment_type == result.payment_type().unwrap_or_default()
    }
}

/// How a notification relates to what is already logged for its transaction.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Delivery {
    /// Not seen before.
    First,
    /// Seen before and nothing else arrived since.
    Repeated,
    /// Applied before, and a different notification was applied after it.
    Superseded,
}

impl Delivery {
    /// Only applied entries supersede, so a notification whose order update
    /// failed stays retryable.
    pub fn of(entries: &[TransactionLogEntry], result: &NotificationResult) -> Self {
        if !entries.iter().any(|entry| entry.is_redelivery_of(result)) {
            return Delivery::First;
        }
        let Some(first_applied) = entries
            .iter()
            .position(|entry| entry.applied && entry.is_redelivery_of(result))
        else {
            return Delivery::Repeated;
        };
        if entries[first_applied + 1..]
            .iter()
            .any(|entry| entry.applied && !entry.is_redelivery_of(result))
        {
            Delivery::Superseded
        } else {
            Delivery::Repeated
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::{
        CRITERION_SECRET, FormFields, IDENTIFICATION_TRANSACTIONID, IDENTIFICATION_UNIQUEID,
        PAYMENT_CODE, PROCESSING_RESULT, PROCESSING_STATUS_CODE, split_payment_code,
    };

    fn notification() -> NotificationResult {
        let form: FormFields = [
            (IDENTIFICATION_TRANSACTIONID, "88"),
            (IDENTIFICATION_UNIQUEID, "31HA07BC81"),
            (CRITERION_SECRET, "do-not-log"),
            (PROCESSING_RESULT, "ACK"),
            (PROCESSING_STATUS_CODE, "90"),
            (PAYMENT_CODE, "CC.DB"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        NotificationResult::from_form(&form)
    }

    #[test]
    fn test_entry_from_notification() {
        let entry = TransactionLogEntry::from_notification(&notification(), LogSource::Response, true);

        assert_eq!(entry.payment_method, "CC");
        assert_eq!(entry.payment_type, "DB");
        assert_eq!(entry.transaction_id, 88);
        assert_eq!(entry.result, "ACK");
        assert!(!entry.payload.contains("do-not-log"));

        let payload: serde_json::Value = serde_json::from_str(&entry.payload).unwrap();
        assert_eq!(payload["source"], "RESPONSE");
        assert_eq!(payload["notification"]["transaction_id"], 88);
    }

    #[test]
    fn test_redelivery_detection() {
        let first = notification();
        let entry = TransactionLogEntry::from_notification(&first, LogSource::Response, true);
        assert!(entry.is_redelivery_of(&first));

        let mut later = first.clone();
        later.status_code = 80;
        assert!(!entry.is_redelivery_of(&later));

        let mut capture = first.clone();
        capture.payment_code = "CC.CP".to_string();
        capture.payment = split_payment_code("CC.CP");
        assert!(!entry.is_redelivery_of(&capture));
    }

    #[test]
    fn test_delivery_classification() {
        let pending = {
            let mut pending = notification();
            pending.status_code = 80;
            pending
        };
        let paid = {
            let mut paid = notification();
            paid.unique_id = "31HA07BC82".to_string();
            paid
        };
        let log = |items: &[&NotificationResult]| -> Vec<TransactionLogEntry> {
            items
                .iter()
                .map(|item| {
                    TransactionLogEntry::from_notification(item, LogSource::Response, true)
                })
                .collect()
        };
        let unapplied = |item: &NotificationResult| {
            TransactionLogEntry::from_notification(item, LogSource::Response, false)
        };

        assert_eq!(Delivery::of(&[], &pending), Delivery::First);
        assert_eq!(Delivery::of(&log(&[&pending]), &paid), Delivery::First);
        assert_eq!(Delivery::of(&log(&[&pending, &pending]), &pending), Delivery::Repeated);
        assert_eq!(Delivery::of(&log(&[&pending, &paid]), &paid), Delivery::Repeated);
        assert_eq!(Delivery::of(&log(&[&pending, &paid]), &pending), Delivery::Superseded);
        // a logged stale redelivery does not make the next one look fresh
        assert_eq!(
            Delivery::of(&log(&[&pending, &paid, &pending]), &pending),
            Delivery::Superseded
        );

        // a paid notification whose save failed is still retryable, even
        // after the pending one came in again
        let mut entries = log(&[&pending]);
        entries.push(unapplied(&paid));
        entries.push(unapplied(&pending));
        assert_eq!(Delivery::of(&entries, &pending), Delivery::Repeated);
        assert_eq!(Delivery::of(&entries, &paid), Delivery::Repeated);
        assert_eq!(Delivery::of(&[unapplied(&pending)], &pending), Delivery::Repeated);
    }
}
