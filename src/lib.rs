/// A durable, reorg-safe secondary-index engine for a blockchain-style
/// producer: a tip tracker, a chain-synchronization loop, and a pluggable
/// indexer pipeline for transaction-by-hash and address-to-tx/coin lookups.
pub mod chain;
pub mod client;
pub mod config;
pub mod error;
pub mod hash;
pub mod indexdb;
pub mod indexer;
pub mod keys;
pub mod record;
pub mod store;
pub mod telemetry;

pub use error::{IndexError, Result};
pub use indexdb::IndexDb;
