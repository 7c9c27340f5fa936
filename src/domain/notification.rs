//! Canonical payment result record and the form-field normalizer that builds it.
//!
//! The processor posts a flat `application/x-www-form-urlencoded` body. Every
//! field is coerced here into a typed value with fail-closed defaults: a result
//! is only `ACK` when the literal `ACK` was posted, a mode is only `LIVE` when
//! the literal `LIVE` was posted, and numbers that fail to parse become zero.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

/// Raw submitted form fields, keyed by wire name.
pub type FormFields = HashMap<String, String>;

pub const CRITERION_SECRET: &str = "CRITERION_SECRET";
pub const IDENTIFICATION_TRANSACTIONID: &str = "IDENTIFICATION_TRANSACTIONID";
pub const IDENTIFICATION_UNIQUEID: &str = "IDENTIFICATION_UNIQUEID";
pub const IDENTIFICATION_SHORTID: &str = "IDENTIFICATION_SHORTID";
pub const IDENTIFICATION_SHOPPERID: &str = "IDENTIFICATION_SHOPPERID";
pub const PROCESSING_RESULT: &str = "PROCESSING_RESULT";
pub const PROCESSING_STATUS_CODE: &str = "PROCESSING_STATUS_CODE";
pub const PROCESSING_RETURN: &str = "PROCESSING_RETURN";
pub const PROCESSING_RETURN_CODE: &str = "PROCESSING_RETURN_CODE";
pub const PAYMENT_CODE: &str = "PAYMENT_CODE";
pub const CRITERION_GUEST: &str = "CRITERION_GUEST";
pub const TRANSACTION_MODE: &str = "TRANSACTION_MODE";
pub const PRESENTATION_CURRENCY: &str = "PRESENTATION_CURRENCY";
pub const PRESENTATION_AMOUNT: &str = "PRESENTATION_AMOUNT";
pub const ACCOUNT_BRAND: &str = "ACCOUNT_BRAND";

const KNOWN_FIELDS: [&str; 15] = [
    CRITERION_SECRET,
    IDENTIFICATION_TRANSACTIONID,
    IDENTIFICATION_UNIQUEID,
    IDENTIFICATION_SHORTID,
    IDENTIFICATION_SHOPPERID,
    PROCESSING_RESULT,
    PROCESSING_STATUS_CODE,
    PROCESSING_RETURN,
    PROCESSING_RETURN_CODE,
    PAYMENT_CODE,
    CRITERION_GUEST,
    TRANSACTION_MODE,
    PRESENTATION_CURRENCY,
    PRESENTATION_AMOUNT,
    ACCOUNT_BRAND,
];

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingResult {
    Ack,
    Nok,
}

impl ProcessingResult {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("ACK") => Self::Ack,
            _ => Self::Nok,
        }
    }
}

impl fmt::Display for ProcessingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ack => f.write_str("ACK"),
            Self::Nok => f.write_str("NOK"),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionMode {
    Live,
    Test,
}

impl TransactionMode {
    fn parse(value: Option<&str>) -> Self {
        match value {
            Some("LIVE") => Self::Live,
            _ => Self::Test,
        }
    }
}

/// Method and type halves of a dotted payment code such as `CC.DB`.
#[derive(Debug, Serialize, PartialEq, Eq, Clone)]
pub struct PaymentCode {
    pub method: String,
    pub kind: String,
}

/// Splits a payment code on `.`.
///
/// Returns `None` unless the split yields exactly two non-empty parts, so a
/// malformed code is unclassifiable rather than silently mapped to a default.
pub fn split_payment_code(code: &str) -> Option<PaymentCode> {
    let mut parts = code.split('.');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(method), Some(kind), None) if !method.is_empty() && !kind.is_empty() => {
            Some(PaymentCode {
                method: method.to_string(),
                kind: kind.to_string(),
            })
        }
        _ => None,
    }
}

/// Fields that must be present before a notification can be verified.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RequiredField {
    TransactionId,
    Secret,
}

impl fmt::Display for RequiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransactionId => f.write_str(IDENTIFICATION_TRANSACTIONID),
            Self::Secret => f.write_str(CRITERION_SECRET),
        }
    }
}

/// The `CRITERION_SECRET` presented by the caller. Redacted in `Debug`.
#[derive(PartialEq, Eq, Clone, Default)]
pub struct SuppliedSecret(String);

impl SuppliedSecret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SuppliedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SuppliedSecret([REDACTED])")
    }
}

/// A payment result notification after normalization.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct NotificationResult {
    /// Quote/order identifier the notification targets.
    pub transaction_id: u64,
    /// The transaction id exactly as submitted. Input to the integrity hash.
    pub transaction_ref: String,
    pub unique_id: String,
    pub short_id: String,
    pub shopper_id: u64,
    pub result: ProcessingResult,
    pub status_code: u32,
    pub return_code: String,
    pub return_message: String,
    /// The dotted code as submitted; `payment` holds its parsed halves.
    pub payment_code: String,
    pub payment: Option<PaymentCode>,
    pub mode: TransactionMode,
    pub presentation_amount: Option<Decimal>,
    pub presentation_currency: Option<String>,
    pub is_guest_checkout: bool,
    pub account_brand: Option<String>,
    #[serde(skip)]
    pub supplied_secret: SuppliedSecret,
    /// Method-specific fields such as prepayment bank account data.
    pub extra: BTreeMap<String, String>,
}

impl NotificationResult {
    /// Normalizes submitted form fields. Never fails; missing values become
    /// empty strings, zeros or `None`.
    pub fn from_form(form: &FormFields) -> Self {
        let text = |key: &str| field(form, key).to_string();
        let optional = |key: &str| {
            Some(field(form, key))
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let transaction_ref = text(IDENTIFICATION_TRANSACTIONID);
        let payment_code = text(PAYMENT_CODE);

        let extra = form
            .iter()
            .filter(|(key, _)| !KNOWN_FIELDS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Self {
            transaction_id: parse_or_zero(&transaction_ref),
            payment: split_payment_code(&payment_code),
            transaction_ref,
            unique_id: text(IDENTIFICATION_UNIQUEID),
            short_id: text(IDENTIFICATION_SHORTID),
            shopper_id: parse_or_zero(field(form, IDENTIFICATION_SHOPPERID)),
            result: ProcessingResult::parse(form.get(PROCESSING_RESULT).map(String::as_str)),
            status_code: parse_or_zero(field(form, PROCESSING_STATUS_CODE)),
            return_code: text(PROCESSING_RETURN_CODE),
            return_message: text(PROCESSING_RETURN),
            payment_code,
            mode: TransactionMode::parse(form.get(TRANSACTION_MODE).map(String::as_str)),
            presentation_amount: optional(PRESENTATION_AMOUNT)
                .map(|raw| Decimal::from_str(&raw).unwrap_or(Decimal::ZERO)),
            presentation_currency: optional(PRESENTATION_CURRENCY),
            is_guest_checkout: form.get(CRITERION_GUEST).map(String::as_str) == Some("true"),
            account_brand: optional(ACCOUNT_BRAND),
            supplied_secret: SuppliedSecret::new(text(CRITERION_SECRET)),
            extra,
        }
    }

    /// The first required field that is empty, if any.
    pub fn missing_required(&self) -> Option<RequiredField> {
        if self.transaction_ref.is_empty() {
            Some(RequiredField::TransactionId)
        } else if self.supplied_secret.is_empty() {
            Some(RequiredField::Secret)
        } else {
            None
        }
    }

    pub fn is_ack(&self) -> bool {
        self.result == ProcessingResult::Ack
    }

    pub fn payment_method(&self) -> Option<&str> {
        self.payment.as_ref().map(|code| code.method.as_str())
    }

    pub fn payment_type(&self) -> Option<&str> {
        self.payment.as_ref().map(|code| code.kind.as_str())
    }
}

fn field<'a>(form: &'a FormFields, key: &str) -> &'a str {
    form.get(key).map(|value| value.trim()).unwrap_or_default()
}

fn parse_or_zero<T: FromStr + Default>(raw: &str) -> T {
    raw.parse().unwrap_or_default()
}
