//! Purpose: Client library for the remote append-only time-series DB service.
//! Exports: `api` (client facades, config, errors) and `core` (model, wire messages).
//! Role: Thin, deterministic protocol boundary; the server owns storage and ordering.
//! Invariants: No retries, caching, batching, or reordering happen in this crate.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
