//! # Recipe Repository
//!
//! Menu item ↔ ingredient links and the per-deduction recipe loader.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  recipe_entries                                                         │
//! │  menu_item_id │ ingredient_id │ amount_milli                            │
//! │  burger       │ bun           │ 1000                                    │
//! │  burger       │ beef          │  200                                    │
//! │  fries        │ potato        │  150                                    │
//! │                                                                         │
//! │  load_recipe_book(["burger", "fries"])  → RecipeBook                    │
//! │    one SELECT per distinct menu item, inside the order transaction     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use galley_core::deduction::RecipeBook;
use galley_core::validation::{validate_id, validate_recipe_amount};
use galley_core::{Quantity, RecipeEntry};

#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

impl RecipeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RecipeRepository { pool }
    }

    /// Links an ingredient to a menu item.
    ///
    /// ## Errors
    /// - `Rule(Validation)` if `amount` is not positive
    /// - `NotFound` if the ingredient does not exist
    /// - `UniqueViolation` if the pair is already linked
    pub async fn add_entry(
        &self,
        menu_item_id: &str,
        ingredient_id: &str,
        amount: Quantity,
    ) -> DbResult<RecipeEntry> {
        validate_id("menuItemId", menu_item_id)?;
        validate_id("ingredientId", ingredient_id)?;
        validate_recipe_amount(amount)?;

        let entry = RecipeEntry {
            id: Uuid::new_v4().to_string(),
            menu_item_id: menu_item_id.to_string(),
            ingredient_id: ingredient_id.to_string(),
            amount,
        };

        debug!(menu_item_id = %menu_item_id, ingredient_id = %ingredient_id, amount = %amount, "Adding recipe entry");

        sqlx::query(
            r#"
            INSERT INTO recipe_entries (id, menu_item_id, ingredient_id, amount_milli, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.menu_item_id)
        .bind(&entry.ingredient_id)
        .bind(entry.amount)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => DbError::not_found("Ingredient", ingredient_id),
            DbError::UniqueViolation { .. } => {
                DbError::duplicate("recipe entry", format!("{menu_item_id}/{ingredient_id}"))
            }
            other => other,
        })?;

        Ok(entry)
    }

    /// All entries of a menu item, as stored.
    pub async fn list_for_menu_item(&self, menu_item_id: &str) -> DbResult<Vec<RecipeEntry>> {
        let mut conn = self.pool.acquire().await?;
        fetch_entries(&mut conn, menu_item_id).await
    }
}

async fn fetch_entries(
    conn: &mut SqliteConnection,
    menu_item_id: &str,
) -> DbResult<Vec<RecipeEntry>> {
    let entries = sqlx::query_as::<_, RecipeEntry>(
        r#"
        SELECT id, menu_item_id, ingredient_id, amount_milli AS amount
        FROM recipe_entries
        WHERE menu_item_id = ?1
        ORDER BY created_at, rowid
        "#,
    )
    .bind(menu_item_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(entries)
}

/// Loads the recipes of the given distinct menu items.
///
/// Entries with a non-positive amount are left out of the book.
pub(crate) async fn load_recipe_book(
    conn: &mut SqliteConnection,
    menu_item_ids: &[&str],
) -> DbResult<RecipeBook> {
    let mut book = RecipeBook::new();

    for menu_item_id in menu_item_ids {
        for entry in fetch_entries(conn, menu_item_id).await? {
            if !book.insert(&entry) {
                warn!(
                    recipe_entry_id = %entry.id,
                    menu_item_id = %entry.menu_item_id,
                    amount = %entry.amount,
                    "Skipping recipe entry with non-positive amount"
                );
            }
        }
    }

    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{stock_kitchen, test_db};
    use galley_core::deduction::RecipeResolver;

    #[tokio::test]
    async fn test_add_and_list() {
        let db = test_db().await;
        let potato = db.ingredients().create("c1", "Potato", "kg").await.unwrap();

        let entry = db
            .recipes()
            .add_entry("wedges", &potato.id, Quantity::from_milli(180))
            .await
            .unwrap();
        let listed = db.recipes().list_for_menu_item("wedges").await.unwrap();
        assert_eq!(listed, vec![entry]);
    }

    #[tokio::test]
    async fn test_rejects_bad_entries() {
        let db = test_db().await;
        let potato = db.ingredients().create("c1", "Potato", "kg").await.unwrap();
        let recipes = db.recipes();

        assert!(matches!(
            recipes.add_entry("wedges", &potato.id, Quantity::zero()).await,
            Err(DbError::Rule(_))
        ));
        assert!(matches!(
            recipes.add_entry("wedges", "no-such-ingredient", Quantity::from_milli(1)).await,
            Err(DbError::NotFound { .. })
        ));

        recipes.add_entry("wedges", &potato.id, Quantity::from_milli(1)).await.unwrap();
        assert!(matches!(
            recipes.add_entry("wedges", &potato.id, Quantity::from_milli(2)).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_book_skips_non_positive_rows() {
        let db = test_db().await;
        stock_kitchen(&db, "B").await;
        // imported row that bypassed validation
        sqlx::query(
            "INSERT INTO recipe_entries (id, menu_item_id, ingredient_id, amount_milli, created_at) \
             VALUES ('bad', 'fries', 'bun', 0, '2026-01-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let book = load_recipe_book(&mut conn, &["burger", "fries"]).await.unwrap();

        assert_eq!(book.len(), 3);
        assert_eq!(book.resolve("fries").len(), 1);
        assert!(book.resolve("water").is_empty());
    }
}
