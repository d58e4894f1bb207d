//! GELF ingestion listeners.
//!
//! Each listener is an independent `tokio::spawn`ed task pushing decoded
//! messages into the shared fan-in channel. The HTTP listener is built on
//! an `axum::Router` with shared state, carrying GELF ingestion routes
//! rather than a monitoring API.

pub mod http;
pub mod tcp;
pub mod udp;

pub use http::serve_http;
pub use tcp::serve_tcp;
pub use udp::serve_udp;
