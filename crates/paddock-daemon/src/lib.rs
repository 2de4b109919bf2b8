//! The paddock wagering daemon.
//!
//! Wires the domain core to its runtime collaborators: SQLite adapters for
//! the store traits, the request orchestrator, and a Unix-domain-socket
//! protocol server speaking length-delimited JSON frames.
//!
//! Each request is an independent stateless unit of work; the stores are
//! the only points of serialization, and correctness under concurrency
//! rests on SQLite's native atomicity (primary-key conflicts for bet
//! uniqueness, transactions for result replacement) rather than in-process
//! locks.

pub mod config;
pub mod orchestrator;
pub mod protocol;
pub mod storage;

pub use config::DaemonConfig;
pub use orchestrator::Orchestrator;
pub use protocol::{ProtocolClient, ProtocolServer};
