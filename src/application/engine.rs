use super::locks::TransactionLocks;
use super::reconcile::{self, Transition};
use crate::domain::integrity::{IntegrityRejection, IntegrityVerifier};
use crate::domain::notification::{FormFields, NotificationResult};
use crate::domain::order::Order;
use crate::domain::payment_method::PaymentMethods;
use crate::domain::ports::{
    AlertSinkBox, IntegrityAlert, OrderMaterializerBox, OrderStoreBox, RequestOrigin,
    TransactionLogBox,
};
use crate::domain::transaction_log::{Delivery, LogSource, TransactionLogEntry};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Shopper-facing page the processor is told to redirect to.
    pub redirect_url: String,
}

/// What happened to the order for one notification.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Outcome {
    /// Failed the integrity gate. Nothing was loaded or written.
    Rejected(IntegrityRejection),
    /// The order is terminal; nothing changed.
    IgnoredTerminal,
    /// A transition ran; `changed` is false for an idempotent redelivery.
    Applied { transition: Transition, changed: bool },
    /// An already logged notification arrived again after a newer one for the
    /// same transaction. Logged, the order is not touched.
    Redelivered,
    /// A failure notification for a quote that never became an order.
    NoOrder,
    MaterializationFailed,
    /// Loading or saving the order failed.
    PersistenceFailed,
}

#[derive(Debug, Clone)]
pub struct NotificationResponse {
    pub redirect_url: String,
    pub outcome: Outcome,
    /// Whether the transaction log entry was written.
    pub logged: bool,
}

/// Verifies inbound notifications and reconciles them against their order.
///
/// Every call produces a [`NotificationResponse`]; failures past the integrity
/// gate are logged and never surface to the caller.
pub struct NotificationProcessor {
    config: ProcessorConfig,
    verifier: IntegrityVerifier,
    orders: OrderStoreBox,
    materializer: OrderMaterializerBox,
    log: TransactionLogBox,
    alerts: AlertSinkBox,
    methods: PaymentMethods,
    locks: TransactionLocks,
}

impl NotificationProcessor {
    pub fn new(
        config: ProcessorConfig,
        verifier: IntegrityVerifier,
        orders: OrderStoreBox,
        materializer: OrderMaterializerBox,
        log: TransactionLogBox,
        alerts: AlertSinkBox,
    ) -> Self {
        Self {
            config,
            verifier,
            orders,
            materializer,
            log,
            alerts,
            methods: PaymentMethods::default(),
            locks: TransactionLocks::new(),
        }
    }

    pub fn with_payment_methods(mut self, methods: PaymentMethods) -> Self {
        self.methods = methods;
        self
    }

    /// Handles one notification received from `origin`.
    pub async fn handle(&self, form: &FormFields, origin: RequestOrigin) -> NotificationResponse {
        let result = NotificationResult::from_form(form);

        if let Err(rejection) = self.verifier.verify(&result) {
            self.reject(&result, origin, &rejection);
            return self.respond(Outcome::Rejected(rejection), false);
        }

        debug!(notification = ?result, "Notification verified");

        let _guard = self.locks.acquire(result.transaction_id).await;

        let outcome = if self.detect_redelivery(&result).await {
            Outcome::Redelivered
        } else {
            self.reconcile(&result).await
        };
        let applied = matches!(outcome, Outcome::Applied { changed: true, .. });
        let logged = self.append_log(&result, applied).await;

        info!(
            transaction_id = result.transaction_id,
            result = %result.result,
            status_code = result.status_code,
            payment_code = %result.payment_code,
            outcome = ?outcome,
            logged,
            "Notification processed"
        );

        self.respond(outcome, logged)
    }

    fn respond(&self, outcome: Outcome, logged: bool) -> NotificationResponse {
        NotificationResponse {
            redirect_url: self.config.redirect_url.clone(),
            outcome,
            logged,
        }
    }

    fn reject(
        &self,
        result: &NotificationResult,
        origin: RequestOrigin,
        rejection: &IntegrityRejection,
    ) {
        let (reason, expected_hash) = match rejection {
            IntegrityRejection::MissingField(field) => {
                let expected = Some(&result.transaction_ref)
                    .filter(|reference| !reference.is_empty())
                    .map(|reference| self.verifier.expected(reference));
                (format!("missing {field}"), expected)
            }
            IntegrityRejection::Mismatch { expected } => {
                ("hash mismatch".to_string(), Some(expected.clone()))
            }
        };
        self.alerts.raise(&IntegrityAlert {
            origin: origin.peer,
            forwarded_for: origin.forwarded_for,
            transaction_ref: result.transaction_ref.clone(),
            reason,
            expected_hash,
        });
    }

    /// Returns `true` for a stale redelivery that must not touch the order.
    async fn detect_redelivery(&self, result: &NotificationResult) -> bool {
        let entries = match self.log.entries_for(result.transaction_id).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    transaction_id = result.transaction_id,
                    error = %e,
                    "Could not read transaction log for redelivery check"
                );
                return false;
            }
        };

        let delivery = Delivery::of(&entries, result);
        if delivery != Delivery::First {
            info!(
                transaction_id = result.transaction_id,
                unique_id = %result.unique_id,
                delivery = ?delivery,
                "Redelivered notification"
            );
        }
        delivery == Delivery::Superseded
    }

    async fn reconcile(&self, result: &NotificationResult) -> Outcome {
        let quote_id = result.transaction_id;

        let existing = match self.orders.find_by_quote(quote_id).await {
            Ok(order) => order,
            Err(e) => {
                error!(quote_id, error = %e, "Failed to load order");
                return Outcome::PersistenceFailed;
            }
        };

        let mut order = match existing {
            Some(order) => order,
            None if result.is_ack() => match self.materialize(result).await {
                Some(order) => order,
                None => return Outcome::MaterializationFailed,
            },
            None => {
                info!(quote_id, "Failure notification for a quote without order");
                return Outcome::NoOrder;
            }
        };

        let transition = reconcile::decide(&order, result);
        if transition == Transition::IgnoreTerminal {
            info!(
                quote_id,
                order = %order.increment_id,
                status = %order.status,
                "Order is terminal, notification ignored"
            );
            return Outcome::IgnoredTerminal;
        }

        let handler = self.methods.resolve(result.payment_method());
        let changed = reconcile::apply(transition, handler, &mut order, result);

        if changed {
            let increment_id = order.increment_id.clone();
            let status = order.status;
            if let Err(e) = self.orders.save(order).await {
                error!(
                    quote_id,
                    order = %increment_id,
                    status = %status,
                    error = %e,
                    "Failed to save order"
                );
                return Outcome::PersistenceFailed;
            }
        }

        Outcome::Applied { transition, changed }
    }

    async fn materialize(&self, result: &NotificationResult) -> Option<Order> {
        let quote_id = result.transaction_id;
        match self
            .materializer
            .materialize(quote_id, result.is_guest_checkout)
            .await
        {
            Ok(order) => {
                info!(
                    quote_id,
                    order = %order.increment_id,
                    guest = order.customer_is_guest,
                    "Order created from quote"
                );
                Some(order)
            }
            Err(e) => {
                warn!(quote_id, error = %e, "Order materialization failed");
                None
            }
        }
    }

    async fn append_log(&self, result: &NotificationResult, applied: bool) -> bool {
        let entry = TransactionLogEntry::from_notification(result, LogSource::Response, applied);
        match self.log.append(entry).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    transaction_id = result.transaction_id,
                    unique_id = %result.unique_id,
                    error = %e,
                    "Failed to write transaction log entry"
                );
                false
            }
        }
    }
}
