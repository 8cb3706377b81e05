//! # Repository Module
//!
//! Database repository implementations for Galley POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  galley-api handler                                                     │
//! │       │  db.orders().apply_update(id, &patch, &plan, options)           │
//! │       ▼                                                                 │
//! │  OrderRepository ──┬── line::reconcile_lines      (same transaction)   │
//! │                    ├── recipe::load_recipe_book                        │
//! │                    └── stock::apply_plan                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Repositories own a pool handle. Steps that must share a transaction
//! are crate-private functions taking `&mut SqliteConnection`.
//!
//! ## Available Repositories
//!
//! - [`OrderRepository`](order::OrderRepository) - Orders and the update transaction
//! - [`LineRepository`](line::LineRepository) - Order line reconciliation
//! - [`PaymentRepository`](payment::PaymentRepository) - One payment per order
//! - [`IngredientRepository`](ingredient::IngredientRepository) - Ingredient reference data
//! - [`RecipeRepository`](recipe::RecipeRepository) - Menu item recipes
//! - [`StockRepository`](stock::StockRepository) - Stock ledger

pub mod ingredient;
pub mod line;
pub mod order;
pub mod payment;
pub mod recipe;
pub mod stock;
