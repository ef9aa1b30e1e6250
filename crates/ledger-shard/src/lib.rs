//! Shard ledger service
//!
//! A shard owns one partition of the transaction ledger. It loads its flat
//! source file once at startup, keeps the records in memory as an ordered
//! append-only sequence, and answers two datagram requests: a full dump of
//! the sequence, and an append that records a new transfer leg under a
//! freshly assigned serial.

pub mod ledger;
pub mod service;

pub use ledger::Ledger;
pub use service::ShardService;
