//! Inbound adapters: the processor-facing HTTP endpoint and CSV quote import.

pub mod csv;
pub mod http;
