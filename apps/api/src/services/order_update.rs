//! # Order Update Saga
//!
//! Coordinates an order mutation with its post-commit side effects and
//! journals what happened at each step.
//!
//! ## Steps
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. persisted          one SQLite transaction:                          │
//! │                          order fields + lines + (on PAID) deduction     │
//! │                        failure ──► request fails, later steps Skipped  │
//! │                                                                         │
//! │  2. cache_invalidated  evict orders:{branch|company|waiter}:{id}        │
//! │                        retry + deadline; failure ──► logged, swallowed │
//! │                        no keys ──► Skipped                              │
//! │                                                                         │
//! │  3. broadcast          publish reloaded order on orders:branch:{id}    │
//! │                        retry + deadline; failure ──► logged, swallowed │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Step 1 is never retried. Steps 2 and 3 only run after it committed, so
//! a failure there cannot undo or repeat a deduction.

use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::services::order_numbers::next_order_number;
use crate::state::AppState;
use galley_core::cache_keys::{branch_topic, CacheScope};
use galley_core::patch::{NewOrder, OrderPatch};
use galley_core::{DeductionReport, Order, OrderDetail, ValidationError};
use galley_db::{Database, DbError, UpdateOptions};
use galley_relay::{encode_payload, with_retry, Broadcaster, CacheStore, RelayError, RetryPolicy};

// =============================================================================
// Journal
// =============================================================================

/// Outcome of one saga step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed,
    #[default]
    Skipped,
    Failed(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }

    fn label(&self) -> &'static str {
        match self {
            StepOutcome::Completed => "completed",
            StepOutcome::Skipped => "skipped",
            StepOutcome::Failed(_) => "failed",
        }
    }
}

/// Per-step record of one saga run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaJournal {
    pub persisted: StepOutcome,
    pub cache_invalidated: StepOutcome,
    pub broadcast: StepOutcome,
}

impl SagaJournal {
    pub fn has_failures(&self) -> bool {
        self.persisted.is_failed() || self.cache_invalidated.is_failed() || self.broadcast.is_failed()
    }

    fn log(&self, operation: &str, order_id: &str) {
        if self.has_failures() {
            error!(operation, order_id = %order_id, journal = %self, "Order saga finished with failed steps");
        } else {
            info!(operation, order_id = %order_id, journal = %self, "Order saga finished");
        }
    }
}

/// `persisted=completed,cache_invalidated=skipped,broadcast=failed`
impl fmt::Display for SagaJournal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "persisted={},cache_invalidated={},broadcast={}",
            self.persisted.label(),
            self.cache_invalidated.label(),
            self.broadcast.label()
        )
    }
}

// =============================================================================
// Errors & Outcome
// =============================================================================

/// Why a saga did not persist anything.
#[derive(Debug, Error)]
pub enum OrderUpdateError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] DbError),

    /// The order number counter could not be reached.
    #[error("Order numbering unavailable: {0}")]
    Numbering(#[from] RelayError),
}

#[derive(Debug, Clone)]
pub struct SagaOutcome {
    /// The order as reloaded after commit.
    pub detail: OrderDetail,
    /// Present when the run moved the order into PAID.
    pub deduction: Option<DeductionReport>,
    pub journal: SagaJournal,
}

// =============================================================================
// Saga
// =============================================================================

pub struct OrderUpdateSaga {
    db: Database,
    cache: Arc<dyn CacheStore>,
    broadcaster: Arc<dyn Broadcaster>,
    options: UpdateOptions,
    cache_policy: RetryPolicy,
    broadcast_policy: RetryPolicy,
}

impl OrderUpdateSaga {
    pub fn new(
        db: Database,
        cache: Arc<dyn CacheStore>,
        broadcaster: Arc<dyn Broadcaster>,
        options: UpdateOptions,
        cache_policy: RetryPolicy,
        broadcast_policy: RetryPolicy,
    ) -> Self {
        OrderUpdateSaga {
            db,
            cache,
            broadcaster,
            options,
            cache_policy,
            broadcast_policy,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        OrderUpdateSaga::new(
            state.db.clone(),
            state.cache.clone(),
            state.broadcaster.clone(),
            state.config.update_options(),
            state.config.relay.cache_policy(),
            state.config.relay.broadcast_policy(),
        )
    }

    /// Applies a patch, then invalidates the caches it names and
    /// broadcasts the reloaded order.
    pub async fn update(
        &self,
        order_id: &str,
        patch: &OrderPatch,
    ) -> Result<SagaOutcome, OrderUpdateError> {
        let mut journal = SagaJournal::default();

        let persisted = match patch.validate() {
            Ok(plan) => self
                .db
                .orders()
                .apply_update(order_id, patch, &plan, self.options)
                .await
                .map_err(OrderUpdateError::from),
            Err(e) => Err(e.into()),
        };
        let outcome = match persisted {
            Ok(outcome) => outcome,
            Err(e) => {
                journal.persisted = StepOutcome::Failed(e.to_string());
                journal.log("update", order_id);
                return Err(e);
            }
        };
        journal.persisted = StepOutcome::Completed;

        if let Some(report) = &outcome.deduction {
            info!(
                order_id = %order_id,
                applied = report.applied.len(),
                skipped = report.skipped.len(),
                shortages = report.shortages.len(),
                "Inventory deducted"
            );
        }

        journal.cache_invalidated = self.invalidate(&patch.scope).await;
        journal.broadcast = self.broadcast(&outcome.detail).await;
        journal.log("update", order_id);

        Ok(SagaOutcome {
            detail: outcome.detail,
            deduction: outcome.deduction,
            journal,
        })
    }

    /// Numbers and persists a new order, then invalidates its listings and
    /// broadcasts it.
    pub async fn create(&self, new: &NewOrder) -> Result<SagaOutcome, OrderUpdateError> {
        let mut journal = SagaJournal::default();

        let created = self.persist_new(new).await;
        let detail = match created {
            Ok(detail) => detail,
            Err(e) => {
                journal.persisted = StepOutcome::Failed(e.to_string());
                journal.log("create", "-");
                return Err(e);
            }
        };
        journal.persisted = StepOutcome::Completed;

        journal.cache_invalidated = self.invalidate(&scope_of(&detail.order)).await;
        journal.broadcast = self.broadcast(&detail).await;
        journal.log("create", &detail.order.id);

        Ok(SagaOutcome {
            detail,
            deduction: None,
            journal,
        })
    }

    /// Deletes an order and invalidates its listings. Nothing is broadcast.
    pub async fn delete(&self, order_id: &str) -> Result<(Order, SagaJournal), OrderUpdateError> {
        let mut journal = SagaJournal::default();

        let order = match self.db.orders().delete(order_id).await {
            Ok(order) => order,
            Err(e) => {
                journal.persisted = StepOutcome::Failed(e.to_string());
                journal.log("delete", order_id);
                return Err(e.into());
            }
        };
        journal.persisted = StepOutcome::Completed;

        journal.cache_invalidated = self.invalidate(&scope_of(&order)).await;
        journal.log("delete", order_id);

        Ok((order, journal))
    }

    async fn persist_new(&self, new: &NewOrder) -> Result<OrderDetail, OrderUpdateError> {
        let lines = new.validate()?;
        let order_number = next_order_number(
            self.cache.as_ref(),
            &self.cache_policy,
            &new.branch_id,
            Utc::now().date_naive(),
        )
        .await?;
        Ok(self.db.orders().create(new, &lines, &order_number).await?)
    }

    // =========================================================================
    // Post-commit steps
    // =========================================================================

    async fn invalidate(&self, scope: &CacheScope) -> StepOutcome {
        let keys = scope.stale_keys();
        if keys.is_empty() {
            return StepOutcome::Skipped;
        }

        match with_retry(&self.cache_policy, "cache invalidation", || self.cache.delete(&keys)).await {
            Ok(removed) => {
                tracing::debug!(keys = ?keys, removed, "Stale order caches evicted");
                StepOutcome::Completed
            }
            Err(e) => {
                warn!(keys = ?keys, error = %e, "Cache invalidation failed; entries expire by TTL");
                StepOutcome::Failed(e.to_string())
            }
        }
    }

    async fn broadcast(&self, detail: &OrderDetail) -> StepOutcome {
        let topic = branch_topic(&detail.order.branch_id);
        let payload = match encode_payload(detail) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(topic = %topic, error = %e, "Order could not be encoded for broadcast");
                return StepOutcome::Failed(e.to_string());
            }
        };

        match with_retry(&self.broadcast_policy, "order broadcast", || {
            self.broadcaster.publish(&topic, &payload)
        })
        .await
        {
            Ok(receivers) => {
                tracing::debug!(topic = %topic, receivers, "Order broadcast");
                StepOutcome::Completed
            }
            Err(e) => {
                warn!(topic = %topic, order_id = %detail.order.id, error = %e, "Order broadcast failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Every listing an existing order appears in.
fn scope_of(order: &Order) -> CacheScope {
    CacheScope::new(
        Some(order.branch_id.clone()),
        Some(order.company_id.clone()),
        order.waiter_id.clone(),
    )
}
