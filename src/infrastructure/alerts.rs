use crate::domain::ports::{AlertSink, IntegrityAlert};

/// Raises integrity alerts as `error` events on the `hgw_notify::alert` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn raise(&self, alert: &IntegrityAlert) {
        tracing::error!(
            target: "hgw_notify::alert",
            origin = alert.origin.as_deref().unwrap_or("unknown"),
            forwarded_for = alert.forwarded_for.as_deref().unwrap_or("-"),
            transaction_ref = %alert.transaction_ref,
            reason = %alert.reason,
            expected_hash = alert.expected_hash.as_deref().unwrap_or("-"),
            "Notification with an invalid hash. This could be some kind of manipulation."
        );
    }
}
