use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Customer group assigned to guest orders.
pub const NOT_LOGGED_IN_GROUP: u32 = 0;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    Processing,
    PendingPayment,
    PaymentReview,
    Canceled,
    Closed,
    Complete,
}

impl OrderStatus {
    /// Terminal orders are never changed by a payment notification.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Canceled | Self::Closed | Self::Complete)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Processing => "processing",
            Self::PendingPayment => "pending_payment",
            Self::PaymentReview => "payment_review",
            Self::Canceled => "canceled",
            Self::Closed => "closed",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Record of the processor transaction attached to an order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct PaymentInfo {
    pub method: Option<String>,
    pub unique_id: Option<String>,
    pub short_id: Option<String>,
    pub amount_paid: Option<Decimal>,
    pub refundable: bool,
}

/// The order aggregate mutated by payment notifications.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Order {
    pub increment_id: String,
    pub quote_id: u64,
    pub status: OrderStatus,
    pub grand_total: Decimal,
    pub currency_code: String,
    pub customer_id: Option<u64>,
    pub customer_email: Option<String>,
    pub customer_is_guest: bool,
    pub customer_group_id: u32,
    pub payment: PaymentInfo,
    /// Status history comments, oldest first.
    pub comments: Vec<String>,
}

impl Order {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves the order to `status` and records `comment`.
    ///
    /// Returns `false` without touching the order when it is already in
    /// `status`, which keeps redelivered notifications from piling up history.
    pub fn transition(&mut self, status: OrderStatus, comment: impl Into<String>) -> bool {
        if self.status == status {
            return false;
        }
        self.status = status;
        let comment = comment.into();
        if !comment.is_empty() {
            self.comments.push(comment);
        }
        true
    }
}

/// Pre-order cart aggregate. Becomes an [`Order`] on the first acknowledged
/// notification.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Quote {
    pub quote_id: u64,
    pub grand_total: Decimal,
    pub currency_code: String,
    pub customer_id: Option<u64>,
    pub customer_email: Option<String>,
    pub billing_email: Option<String>,
    pub customer_group_id: u32,
    pub payment_method: Option<String>,
}

impl Quote {
    /// Detaches the quote from any customer account, taking the email from
    /// the billing address.
    pub fn convert_to_guest(&mut self) {
        self.customer_id = None;
        self.customer_email = self.billing_email.clone();
        self.customer_group_id = NOT_LOGGED_IN_GROUP;
    }

    pub fn is_guest(&self) -> bool {
        self.customer_id.is_none()
    }

    /// Builds the order for this quote. The increment id is derived from the
    /// quote id so a quote can only ever map to one order.
    pub fn into_order(self) -> Order {
        Order {
            increment_id: format!("{:09}", self.quote_id),
            quote_id: self.quote_id,
            status: OrderStatus::New,
            grand_total: self.grand_total,
            currency_code: self.currency_code,
            customer_is_guest: self.customer_id.is_none(),
            customer_id: self.customer_id,
            customer_email: self.customer_email,
            customer_group_id: self.customer_group_id,
            payment: PaymentInfo {
                method: self.payment_method,
                ..PaymentInfo::default()
            },
            comments: Vec::new(),
        }
    }
}
