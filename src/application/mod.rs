//! Application layer containing the notification processing orchestration.
//!
//! `NotificationProcessor` is the entry point for every inbound notification.
//! It runs the integrity gate, serializes work per transaction id, drives the
//! order state machine in `reconcile` and writes the transaction log.

pub mod engine;
pub mod locks;
pub mod reconcile;
