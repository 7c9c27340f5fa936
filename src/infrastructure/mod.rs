//! Adapters behind the domain ports.

pub mod alerts;
pub mod hashing;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
