//! # galley-relay: Post-Commit Collaborators for Galley POS
//!
//! Cache and broadcast backends reached after an order update commits,
//! plus the bounded retry both go through.
//!
//! ## Failure Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order committed ──► evict stale keys ──► publish reloaded order        │
//! │                          │                      │                       │
//! │                     retry + deadline       retry + deadline             │
//! │                          │                      │                       │
//! │                     failure: logged        failure: logged              │
//! │                     request still 200      request still 200            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`cache`] - `CacheStore` trait, in-memory and Redis backends
//! - [`broadcast`] - `Broadcaster` trait, channel and Redis pub/sub backends
//! - [`retry`] - Exponential backoff with a per-attempt deadline
//! - [`config`] - TOML / environment configuration
//! - [`error`] - Relay error type

pub mod broadcast;
pub mod cache;
pub mod config;
pub mod error;
pub mod retry;

pub use broadcast::{encode_payload, Broadcaster, ChannelBroadcaster, NoOpBroadcaster, RedisBroadcaster, TopicMessage};
pub use cache::{CacheStore, MemoryCache, RedisCache};
pub use config::RelayConfig;
pub use error::{RelayError, RelayResult};
pub use retry::{with_retry, RetryPolicy};
