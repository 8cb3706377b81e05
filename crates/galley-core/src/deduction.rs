//! # Inventory Deduction
//!
//! Turns the lines of a paid order into one net decrement per
//! `(ingredient, branch)` pair.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Order O @ branch B                                                     │
//! │   ├── 2 × burger ──┐                                                    │
//! │   └── 3 × fries  ──┤                                                    │
//! │                    ▼                                                    │
//! │  RecipeResolver::resolve(menu_item)   (once per distinct item)         │
//! │   burger → bun 1.000, beef 0.200                                        │
//! │   fries  → potato 0.150                                                 │
//! │                    │                                                    │
//! │                    ▼  delta = amount × line.quantity, netted by key     │
//! │  DeductionPlan                                                          │
//! │   (bun, B)    → 2.000                                                   │
//! │   (beef, B)   → 0.400                                                   │
//! │   (potato, B) → 0.450                                                   │
//! │                    │                                                    │
//! │                    ▼                                                    │
//! │  galley-db stock ledger: one batch, one transaction                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A menu item with no recipe consumes nothing. Entries whose amount is
//! zero or negative are ignored. A delta that overflows fails the whole
//! plan with `CoreError::QuantityOverflow`.

use std::collections::{BTreeMap, HashMap};

use crate::error::{CoreError, CoreResult};
use crate::quantity::Quantity;
use crate::types::{OrderLine, RecipeEntry, StockKey};

// =============================================================================
// Recipe Resolution
// =============================================================================

/// Consumption of one ingredient per unit of a menu item sold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientUse {
    pub ingredient_id: String,
    pub amount_per_unit: Quantity,
}

impl IngredientUse {
    pub fn new(ingredient_id: impl Into<String>, amount_per_unit: Quantity) -> Self {
        IngredientUse {
            ingredient_id: ingredient_id.into(),
            amount_per_unit,
        }
    }
}

/// Maps a sold menu item to its ingredient consumption rates.
///
/// Implementations are pure reads. An unknown menu item resolves to an
/// empty list.
pub trait RecipeResolver {
    fn resolve(&self, menu_item_id: &str) -> Vec<IngredientUse>;
}

/// In-memory recipe lookup, usually loaded from the database for the
/// distinct menu items of one order.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    entries: HashMap<String, Vec<IngredientUse>>,
}

impl RecipeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry. Returns `false` (and stores nothing) when the amount
    /// is not positive.
    pub fn insert(&mut self, entry: &RecipeEntry) -> bool {
        if !entry.amount.is_positive() {
            return false;
        }
        self.entries
            .entry(entry.menu_item_id.clone())
            .or_default()
            .push(IngredientUse::new(&entry.ingredient_id, entry.amount));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RecipeResolver for RecipeBook {
    fn resolve(&self, menu_item_id: &str) -> Vec<IngredientUse> {
        self.entries.get(menu_item_id).cloned().unwrap_or_default()
    }
}

// =============================================================================
// Deduction Plan
// =============================================================================

/// Net decrements for one order, keyed by `(ingredient, branch)`.
///
/// Every value is positive; zero-sum keys are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeductionPlan {
    deltas: BTreeMap<StockKey, Quantity>,
}

impl DeductionPlan {
    /// Builds the plan for the lines of an order sold at `branch_id`.
    pub fn build<R>(branch_id: &str, lines: &[OrderLine], resolver: &R) -> CoreResult<Self>
    where
        R: RecipeResolver + ?Sized,
    {
        Self::build_from_sold(
            branch_id,
            lines.iter().map(|l| (l.menu_item_id.as_str(), l.quantity)),
            resolver,
        )
    }

    /// Builds the plan from `(menu_item_id, quantity)` pairs.
    ///
    /// The resolver is consulted once per distinct menu item.
    pub fn build_from_sold<'a, I, R>(branch_id: &str, sold: I, resolver: &R) -> CoreResult<Self>
    where
        I: IntoIterator<Item = (&'a str, i64)>,
        R: RecipeResolver + ?Sized,
    {
        let mut resolved: HashMap<&'a str, Vec<IngredientUse>> = HashMap::new();
        let mut deltas: BTreeMap<StockKey, Quantity> = BTreeMap::new();

        for (menu_item_id, quantity) in sold {
            if quantity <= 0 {
                continue;
            }
            let uses = resolved
                .entry(menu_item_id)
                .or_insert_with(|| resolver.resolve(menu_item_id));

            for usage in uses.iter().filter(|u| u.amount_per_unit.is_positive()) {
                let key = StockKey::new(&usage.ingredient_id, branch_id);
                let added = usage.amount_per_unit.checked_times(quantity);
                let delta = deltas.entry(key.clone()).or_default();
                let sum = added.and_then(|q| delta.checked_add(q)).ok_or_else(|| {
                    CoreError::QuantityOverflow {
                        ingredient_id: key.ingredient_id,
                        branch_id: key.branch_id,
                    }
                })?;
                *delta = sum;
            }
        }

        deltas.retain(|_, delta| !delta.is_zero());
        Ok(DeductionPlan { deltas })
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn get(&self, key: &StockKey) -> Option<Quantity> {
        self.deltas.get(key).copied()
    }

    /// Entries in key order, which is also the write order.
    pub fn iter(&self) -> impl Iterator<Item = (&StockKey, Quantity)> {
        self.deltas.iter().map(|(k, q)| (k, *q))
    }

    /// Sum of all decrements, across ingredients. Diagnostic only.
    pub fn total(&self) -> Option<Quantity> {
        self.deltas
            .values()
            .try_fold(Quantity::zero(), |acc, q| acc.checked_add(*q))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
