//! # galley-api
//!
//! HTTP service for the Galley POS order lifecycle.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Galley API Server                               │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  routes/orders │  │routes/inventory│  │  routes/health             ││
//! │  │                │  │                │  │                            ││
//! │  │ • create       │  │ • ingredients  │  │ • store health             ││
//! │  │ • get / put    │  │ • recipes      │  │                            ││
//! │  │ • delete       │  │ • stock        │  │                            ││
//! │  │ • payment      │  │                │  │                            ││
//! │  └───────┬────────┘  └───────┬────────┘  └────────────────────────────┘│
//! │          │                   │                                          │
//! │          ▼                   │                                          │
//! │  ┌────────────────┐          │                                          │
//! │  │OrderUpdateSaga │          │                                          │
//! │  └───────┬────────┘          │                                          │
//! │          ├───────────────────┴──────► galley-db (SQLite)               │
//! │          ├──────────────────────────► CacheStore  (memory | Redis)     │
//! │          └──────────────────────────► Broadcaster (channel | Redis)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ErrorCode};
pub use routes::router;
pub use state::AppState;
