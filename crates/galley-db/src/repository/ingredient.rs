//! # Ingredient Repository
//!
//! Reference data: the ingredients a company stocks.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use galley_core::validation::{validate_id, validate_ingredient_name, validate_unit};
use galley_core::Ingredient;

#[derive(Debug, Clone)]
pub struct IngredientRepository {
    pool: SqlitePool,
}

impl IngredientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        IngredientRepository { pool }
    }

    /// Creates an ingredient. Names are unique within a company.
    pub async fn create(&self, company_id: &str, name: &str, unit: &str) -> DbResult<Ingredient> {
        validate_id("companyId", company_id)?;
        validate_ingredient_name(name)?;
        validate_unit(unit)?;

        let ingredient = Ingredient {
            id: Uuid::new_v4().to_string(),
            company_id: company_id.to_string(),
            name: name.trim().to_string(),
            unit: unit.trim().to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %ingredient.id, name = %ingredient.name, "Creating ingredient");

        sqlx::query(
            r#"
            INSERT INTO ingredients (id, company_id, name, unit, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&ingredient.id)
        .bind(&ingredient.company_id)
        .bind(&ingredient.name)
        .bind(&ingredient.unit)
        .bind(ingredient.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("ingredient name", &ingredient.name),
            other => other,
        })?;

        Ok(ingredient)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "SELECT id, company_id, name, unit, created_at FROM ingredients WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(ingredient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_db;

    #[tokio::test]
    async fn test_create_and_get() {
        let db = test_db().await;
        let created = db.ingredients().create("c1", " Potato ", "kg").await.unwrap();
        assert_eq!(created.name, "Potato");

        let fetched = db.ingredients().get_by_id(&created.id).await.unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let db = test_db().await;
        db.ingredients().create("c1", "Beef", "kg").await.unwrap();
        assert!(matches!(
            db.ingredients().create("c1", "Beef", "kg").await,
            Err(DbError::UniqueViolation { .. })
        ));
        assert!(db.ingredients().create("c2", "Beef", "kg").await.is_ok());
    }
}
