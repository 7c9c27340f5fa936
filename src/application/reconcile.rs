//! The order state machine driven by a verified notification.

use crate::domain::classifier::is_processing;
use crate::domain::notification::NotificationResult;
use crate::domain::order::Order;
use crate::domain::payment_method::PaymentMethodHandler;

/// The single transition a notification triggers on an order.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Transition {
    /// The order is canceled, closed or complete and stays untouched.
    IgnoreTerminal,
    Cancel,
    Processing,
    Pending,
}

pub fn decide(order: &Order, result: &NotificationResult) -> Transition {
    if order.is_terminal() {
        Transition::IgnoreTerminal
    } else if !result.is_ack() {
        Transition::Cancel
    } else if is_processing(result.payment_type(), result) {
        Transition::Processing
    } else {
        Transition::Pending
    }
}

/// Applies `transition` through `handler`. Returns `true` if the order changed.
pub fn apply(
    transition: Transition,
    handler: &dyn PaymentMethodHandler,
    order: &mut Order,
    result: &NotificationResult,
) -> bool {
    match transition {
        Transition::IgnoreTerminal => false,
        Transition::Cancel => handler.cancel(order, &result.return_message),
        Transition::Processing => handler.processing(order, result),
        Transition::Pending => handler.pending(order, result, &result.return_message),
    }
}
