//! Per-payment-method order transitions.
//!
//! The reconciliation engine decides *which* transition a notification
//! triggers; a [`PaymentMethodHandler`] decides *how* the order changes for
//! its payment method. Handlers must be idempotent: applying a transition to
//! an order already in the target state reports no change.

use super::classifier::{
    amount_matches, currency_matches, format_amount, is_pre_authorization, is_refundable,
};
use super::notification::NotificationResult;
use super::order::{Order, OrderStatus};
use std::collections::HashMap;
use std::sync::Arc;

/// Only prepayment reservations carry the account the shopper transfers to.
const PREPAYMENT_METHOD: &str = "PP";

const BANK_FIELDS: [(&str, &str); 3] = [
    ("CONNECTOR_ACCOUNT_HOLDER", "Account holder"),
    ("CONNECTOR_ACCOUNT_IBAN", "IBAN"),
    ("CONNECTOR_ACCOUNT_BIC", "BIC"),
];

pub trait PaymentMethodHandler: Send + Sync {
    /// Payment failed. Returns `true` if the order changed.
    fn cancel(&self, order: &mut Order, message: &str) -> bool;
    /// Payment captured or received. Returns `true` if the order changed.
    fn processing(&self, order: &mut Order, result: &NotificationResult) -> bool;
    /// Payment acknowledged but not settled. Returns `true` if the order changed.
    fn pending(&self, order: &mut Order, result: &NotificationResult, message: &str) -> bool;
}

/// Generic transitions shared by every method without its own rules.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardPaymentMethod;

impl StandardPaymentMethod {
    fn record_reference(order: &mut Order, result: &NotificationResult) -> bool {
        let before = order.payment.clone();
        if !result.unique_id.is_empty() {
            order.payment.unique_id = Some(result.unique_id.clone());
        }
        if !result.short_id.is_empty() {
            order.payment.short_id = Some(result.short_id.clone());
        }
        order.payment != before
    }
}

impl PaymentMethodHandler for StandardPaymentMethod {
    fn cancel(&self, order: &mut Order, message: &str) -> bool {
        order.transition(OrderStatus::Canceled, format!("Payment failed: {message}"))
    }

    fn processing(&self, order: &mut Order, result: &NotificationResult) -> bool {
        let mut changed = Self::record_reference(order, result);

        if amount_matches(order, result) && currency_matches(order, result) {
            let paid = result.presentation_amount;
            let refundable = result.payment_type().is_some_and(is_refundable);
            if order.payment.amount_paid != paid || order.payment.refundable != refundable {
                order.payment.amount_paid = paid;
                order.payment.refundable = refundable;
                changed = true;
            }
            let comment = format!("Payment received, short id {}", result.short_id);
            changed |= order.transition(OrderStatus::Processing, comment);
        } else {
            let comment = format!(
                "Amount or currency mismatch: notified {} {}, order {} {}",
                result
                    .presentation_amount
                    .map(format_amount)
                    .unwrap_or_else(|| "-".to_string()),
                result.presentation_currency.as_deref().unwrap_or("-"),
                format_amount(order.grand_total),
                order.currency_code,
            );
            changed |= order.transition(OrderStatus::PaymentReview, comment);
        }
        changed
    }

    fn pending(&self, order: &mut Order, result: &NotificationResult, message: &str) -> bool {
        let changed = Self::record_reference(order, result);

        let mut comment = message.to_string();
        if result.payment_method() == Some(PREPAYMENT_METHOD) && is_pre_authorization(result) {
            for (field, label) in BANK_FIELDS {
                if let Some(value) = result.extra.get(field).filter(|v| !v.is_empty()) {
                    if !comment.is_empty() {
                        comment.push_str("; ");
                    }
                    comment.push_str(&format!("{label}: {value}"));
                }
            }
        }
        order.transition(OrderStatus::PendingPayment, comment) || changed
    }
}

/// Handlers selected by payment method code (`CC`, `PP`, ...).
#[derive(Clone)]
pub struct PaymentMethods {
    handlers: HashMap<String, Arc<dyn PaymentMethodHandler>>,
    fallback: Arc<dyn PaymentMethodHandler>,
}

impl Default for PaymentMethods {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            fallback: Arc::new(StandardPaymentMethod),
        }
    }
}

impl PaymentMethods {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handler(
        mut self,
        method: impl Into<String>,
        handler: Arc<dyn PaymentMethodHandler>,
    ) -> Self {
        self.handlers.insert(method.into(), handler);
        self
    }

    /// The handler for `method`, or the standard one when none is registered
    /// or the payment code could not be parsed.
    pub fn resolve(&self, method: Option<&str>) -> &dyn PaymentMethodHandler {
        method
            .and_then(|code| self.handlers.get(code))
            .unwrap_or(&self.fallback)
            .as_ref()
    }
}
