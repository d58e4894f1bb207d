//! gelf-relay message router
//!
//! This crate owns everything downstream of GELF wire decoding:
//! - `ratelimit`: time-evicted, single-critical-section rate limiter
//! - `senders`: SMS/email/issue-tracker sender traits + concrete clients
//! - `rules`: the Matcher/Alerter/Rule compiler and evaluator
//! - `store`: the indexer store forwarder
//! - `dispatch`: the single-consumer dispatch loop
//! - `listeners`: the UDP/TCP/HTTP GELF ingestion listeners
//! - `server`: the explicit `Server` struct that wires all of the above

pub mod dispatch;
pub mod error;
pub mod listeners;
pub mod ratelimit;
pub mod rules;
pub mod senders;
pub mod server;
pub mod store;

pub use error::{RouterError, RuleError};
pub use server::Server;

pub type Result<T> = std::result::Result<T, RouterError>;
