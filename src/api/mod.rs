//! Purpose: Define the public Rust API boundary for the append-only DB client.
//! Exports: Client facades, configuration, transport seam, and model/error types.
//! Role: Public, additive-only surface; wire details stay in `core::wire`.
//! Invariants: This module is the only path callers need for day-to-day use.

mod blocking;
mod channel;
mod client;
mod config;
mod executor;
mod transport;

pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::tuple::{TableStats, TimeRange, Tuple};
pub use blocking::BlockingClient;
pub use channel::{establish, load_trust_root};
pub use client::{ApiResult, Client};
pub use config::{CallOptions, ClientConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_CONNECT_TIMEOUT};
pub use tokio_util::sync::CancellationToken;
pub use transport::{DbService, GrpcTransport};
