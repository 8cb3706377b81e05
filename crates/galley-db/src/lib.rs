//! # galley-db: Database Layer for Galley POS
//!
//! This crate provides database access for Galley POS.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Galley POS Data Flow                             │
//! │                                                                         │
//! │  galley-api handler (PUT /api/orders/{id})                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     galley-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ OrderRepo     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ StockRepo     │    │ 001_orders   │  │   │
//! │  │   │ Transactions  │    │ RecipeRepo    │    │ 002_inventory│  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL)                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use galley_db::{Database, DbConfig, UpdateOptions};
//!
//! let db = Database::new(DbConfig::new("galley.db")).await?;
//!
//! let plan = patch.validate()?;
//! let outcome = db.orders().apply_update(&order_id, &patch, &plan, UpdateOptions::default()).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::ingredient::IngredientRepository;
pub use repository::line::LineRepository;
pub use repository::order::{OrderRepository, UpdateOptions, UpdateOutcome};
pub use repository::payment::PaymentRepository;
pub use repository::recipe::RecipeRepository;
pub use repository::stock::StockRepository;
