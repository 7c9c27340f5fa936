//! Semantic classification of a verified notification.
//!
//! All functions are pure and fail closed: an unclassifiable payment code or
//! an absent amount/currency never yields `true`.

use super::notification::{NotificationResult, ProcessingResult};
use super::order::Order;
use rust_decimal::{Decimal, RoundingStrategy};

/// Processor status code for an acknowledged but still pending payment.
pub const STATUS_PENDING: u32 = 80;

const PROCESSING_TYPES: [&str; 4] = ["CP", "DB", "FI", "RC"];
const RECEIPT_METHODS: [&str; 7] = ["DD", "PP", "IV", "OT", "PC", "MP", "HP"];
const REFUNDABLE_TYPES: [&str; 3] = ["DB", "CP", "RC"];

pub fn is_processing(payment_type: Option<&str>, result: &NotificationResult) -> bool {
    payment_type.is_some_and(|kind| PROCESSING_TYPES.contains(&kind))
        && result.result == ProcessingResult::Ack
        && result.status_code != STATUS_PENDING
}

pub fn is_pre_authorization(result: &NotificationResult) -> bool {
    result.payment_type() == Some("PA")
}

pub fn is_receipt_able(method: &str, kind: &str) -> bool {
    kind == "RC" && RECEIPT_METHODS.contains(&method)
}

pub fn is_refundable(kind: &str) -> bool {
    REFUNDABLE_TYPES.contains(&kind)
}

pub fn amount_matches(order: &Order, result: &NotificationResult) -> bool {
    result
        .presentation_amount
        .is_some_and(|amount| format_amount(amount) == format_amount(order.grand_total))
}

pub fn currency_matches(order: &Order, result: &NotificationResult) -> bool {
    result
        .presentation_currency
        .as_deref()
        .is_some_and(|currency| currency == order.currency_code)
}

/// Formats an amount with two fixed decimals, rounding half away from zero.
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}
