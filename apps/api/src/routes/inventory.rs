//! # Inventory Routes
//!
//! Reference data and stock maintenance.
//!
//! Quantities travel as integer thousandths (`amountMilli`, `quantityMilli`)
//! or as decimal strings (`amount`, `quantity`): `"0.15"` is 150.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;
use galley_core::validation::validate_id;
use galley_core::{Ingredient, Quantity, RecipeEntry, StockRecord};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIngredientRequest {
    pub company_id: String,
    pub name: String,
    pub unit: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRecipeEntryRequest {
    pub menu_item_id: String,
    pub ingredient_id: String,
    #[serde(default)]
    pub amount_milli: Option<i64>,
    #[serde(default)]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStockRequest {
    pub ingredient_id: String,
    pub branch_id: String,
    #[serde(default)]
    pub quantity_milli: Option<i64>,
    #[serde(default)]
    pub quantity: Option<String>,
}

/// A stock record as listed, with its quantity also in decimal form.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    #[serde(flatten)]
    pub record: StockRecord,
    /// Decimal rendering of `quantityMilli`, e.g. `"-0.450"`.
    pub quantity: String,
    /// Oversold: the quantity is below zero.
    pub short: bool,
}

impl From<StockRecord> for StockView {
    fn from(record: StockRecord) -> Self {
        StockView {
            quantity: record.quantity.to_string(),
            short: record.is_short(),
            record,
        }
    }
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    payload: Result<Json<CreateIngredientRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Ingredient>), ApiError> {
    let Json(request) = payload?;
    let ingredient = state
        .db
        .ingredients()
        .create(&request.company_id, &request.name, &request.unit)
        .await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

pub async fn add_recipe_entry(
    State(state): State<AppState>,
    payload: Result<Json<AddRecipeEntryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecipeEntry>), ApiError> {
    let Json(request) = payload?;
    let amount = quantity_input("amount", request.amount_milli, request.amount.as_deref())?;

    let entry = state
        .db
        .recipes()
        .add_entry(&request.menu_item_id, &request.ingredient_id, amount)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn list_recipe(
    State(state): State<AppState>,
    Path(menu_item_id): Path<String>,
) -> Result<Json<Vec<RecipeEntry>>, ApiError> {
    validate_id("menuItemId", &menu_item_id)?;
    let entries = state.db.recipes().list_for_menu_item(&menu_item_id).await?;
    Ok(Json(entries))
}

pub async fn add_stock(
    State(state): State<AppState>,
    payload: Result<Json<AddStockRequest>, JsonRejection>,
) -> Result<Json<StockView>, ApiError> {
    let Json(request) = payload?;
    let quantity = quantity_input("quantity", request.quantity_milli, request.quantity.as_deref())?;

    let record = state
        .db
        .stock()
        .add(&request.ingredient_id, &request.branch_id, quantity)
        .await?;
    Ok(Json(record.into()))
}

pub async fn list_stock(
    State(state): State<AppState>,
    Path(branch_id): Path<String>,
) -> Result<Json<Vec<StockView>>, ApiError> {
    validate_id("branchId", &branch_id)?;
    let records = state.db.stock().list_for_branch(&branch_id).await?;
    Ok(Json(records.into_iter().map(StockView::from).collect()))
}

/// Exactly one of `{field}Milli` and `{field}` must be given.
fn quantity_input(field: &str, milli: Option<i64>, decimal: Option<&str>) -> Result<Quantity, ApiError> {
    match (milli, decimal) {
        (Some(milli), None) => Ok(Quantity::from_milli(milli)),
        (None, Some(decimal)) => Ok(decimal.parse::<Quantity>()?),
        (Some(_), Some(_)) => Err(ApiError::validation(format!(
            "give either {field}Milli or {field}, not both"
        ))),
        (None, None) => Err(ApiError::validation(format!("{field} is required"))),
    }
}
