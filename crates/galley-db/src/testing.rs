//! Shared fixtures for repository tests.

use galley_core::patch::{LinePatch, NewOrder};
use galley_core::{OrderDetail, Quantity};

use crate::{Database, DbConfig};

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// File-backed database in `dir`, for tests that need several connections.
pub(crate) async fn file_db(dir: &tempfile::TempDir) -> Database {
    let config = DbConfig::new(dir.path().join("galley.db")).max_connections(8);
    Database::new(config).await.unwrap()
}

/// One menu item whose recipe uses `count` ingredients, one thousandth of
/// each, with one unit of every ingredient stocked at `branch_id`.
pub(crate) async fn wide_recipe(db: &Database, menu_item_id: &str, branch_id: &str, count: usize) {
    let mut tx = db.pool().begin().await.unwrap();
    for i in 0..count {
        let id = format!("{menu_item_id}-{i:04}");
        sqlx::query(
            "INSERT INTO ingredients (id, company_id, name, unit, created_at) \
             VALUES (?1, 'C', ?1, 'g', '2026-01-01T00:00:00Z')",
        )
        .bind(&id)
        .execute(&mut *tx)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO recipe_entries (id, menu_item_id, ingredient_id, amount_milli, created_at) \
             VALUES (?1, ?2, ?1, 1, '2026-01-01T00:00:00Z')",
        )
        .bind(&id)
        .bind(menu_item_id)
        .execute(&mut *tx)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO stock_records (ingredient_id, branch_id, quantity_milli, updated_at) \
             VALUES (?1, ?2, 1000, '2026-01-01T00:00:00Z')",
        )
        .bind(&id)
        .bind(branch_id)
        .execute(&mut *tx)
        .await
        .unwrap();
    }
    tx.commit().await.unwrap();
}

/// 2 × burger at 8.50 and 3 × fries at 3.99, company `C`.
pub(crate) async fn burger_order(db: &Database, branch_id: &str) -> OrderDetail {
    let new = NewOrder {
        company_id: "C".into(),
        branch_id: branch_id.into(),
        waiter_id: Some("w1".into()),
        discount_cents: 0,
        rounding_cents: 0,
        lines: vec![
            LinePatch::new("burger", 2, 850),
            LinePatch::new("fries", 3, 399),
        ],
    };
    let lines = new.validate().unwrap();
    db.orders().create(&new, &lines, "20260101-0001").await.unwrap()
}

/// Ingredients `bun`, `beef`, `potato` (fixed ids), the burger / fries
/// recipes, and 10 units of each at `branch_id`.
pub(crate) async fn stock_kitchen(db: &Database, branch_id: &str) {
    for (id, unit) in [("bun", "pcs"), ("beef", "kg"), ("potato", "kg")] {
        sqlx::query(
            "INSERT OR IGNORE INTO ingredients (id, company_id, name, unit, created_at) \
             VALUES (?1, 'C', ?1, ?2, '2026-01-01T00:00:00Z')",
        )
        .bind(id)
        .bind(unit)
        .execute(db.pool())
        .await
        .unwrap();
    }

    for (menu, ingredient, milli) in [("burger", "bun", 1_000), ("burger", "beef", 200), ("fries", "potato", 150)] {
        if db
            .recipes()
            .list_for_menu_item(menu)
            .await
            .unwrap()
            .iter()
            .all(|e| e.ingredient_id != ingredient)
        {
            db.recipes()
                .add_entry(menu, ingredient, Quantity::from_milli(milli))
                .await
                .unwrap();
        }
    }

    for ingredient in ["bun", "beef", "potato"] {
        db.stock()
            .add(ingredient, branch_id, Quantity::from_units(10))
            .await
            .unwrap();
    }
}
