//! Client side of the backup daemon API.
//!
//! ## Architecture
//!
//! - `transport`: the [`DaemonTransport`] seam and its request/response types
//! - `client`: pooled `reqwest` implementation used in production
//! - `wire`: version-specific payload and query shapes

mod client;
mod transport;
mod wire;

pub use client::HttpTransport;
pub use transport::{DaemonRequest, DaemonResponse, DaemonTransport, Method};
pub use wire::WireContract;

/// Versioned path prefix of every daemon endpoint.
pub const API_V1: &str = "api/v1";
