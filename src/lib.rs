//! Device hub event core.
//!
//! The hub ingests device events (connect, disconnect, telemetry, attribute
//! reports, raw frames, RPC requests) from transport listeners and processes
//! them through four cooperating pieces:
//!
//! * [`dispatcher`] — bounded-concurrency consumer of the inbound queue,
//!   resolving each event's identity and fanning work out to workers.
//! * [`engine`] — rule chains: directed graphs of typed nodes compiled from
//!   declarative JSON, routing messages along label-tagged edges.
//! * [`shadow`] — per-device digital twins with debounced offline detection.
//! * [`chain_cache`] — compiled-chain cache with single-flight resolution.
//!
//! Storage and transport concerns sit behind traits in [`storage`],
//! [`transport`], and [`notify`] so deployments can wire their own backends;
//! in-memory implementations back the default binary and the test suite.

pub mod chain_cache;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod event;
pub mod identity;
pub mod metrics;
pub mod notify;
pub mod queue_adapter;
pub mod shadow;
pub mod storage;
pub mod tasks;
pub mod transport;
