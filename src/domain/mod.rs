//! Domain types, pure classification rules and the ports the core depends on.

pub mod classifier;
pub mod integrity;
pub mod notification;
pub mod order;
pub mod payment_method;
pub mod ports;
pub mod transaction_log;
