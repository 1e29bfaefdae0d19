//! Cart entity and repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metagrid_core::JsonList;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{CartRepository, PgStore, StoreError};

/// A user's cart of selected datasets
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    pub user_id: Uuid,
    pub items: JsonList,
    pub updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CartRow {
    user_id: Uuid,
    items: sqlx::types::Json<Value>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = StoreError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let items = JsonList::try_from(row.items.0)
            .map_err(|e| StoreError::Corrupt(format!("carts.items for {}: {}", row.user_id, e)))?;
        Ok(Self {
            user_id: row.user_id,
            items,
            updated_at: row.updated_at,
        })
    }
}

/// Cart response DTO
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartResponse {
    /// Owner of the cart
    #[schema(value_type = String)]
    pub user: Uuid,
    /// Client-defined dataset records, in the order the client saved them
    #[schema(value_type = Vec<Object>)]
    pub items: JsonList,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            user: cart.user_id,
            items: cart.items,
        }
    }
}

/// Request body replacing a cart's items
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CartItemsUpdate {
    #[schema(value_type = Vec<Object>)]
    pub items: JsonList,
}

#[async_trait]
impl CartRepository for PgStore {
    async fn find_cart(&self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            "SELECT user_id, items, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Cart::try_from).transpose()
    }

    async fn replace_cart_items(
        &self,
        user_id: Uuid,
        items: JsonList,
    ) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(
            r#"
            UPDATE carts
            SET items = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, items, updated_at
            "#,
        )
        .bind(user_id)
        .bind(sqlx::types::Json(Value::from(items)))
        .fetch_optional(self.pool())
        .await?;

        row.map(Cart::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_row_with_object_items_is_corrupt() {
        let row = CartRow {
            user_id: Uuid::new_v4(),
            items: sqlx::types::Json(json!({"id": "dataset"})),
            updated_at: Utc::now(),
        };
        let err = Cart::try_from(row).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn test_response_shape() {
        let user_id = Uuid::new_v4();
        let cart = Cart {
            user_id,
            items: JsonList::new(vec![json!({"id": "CMIP6.CMIP.foo|esgf-data.example.org"})]),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(CartResponse::from(cart)).unwrap();
        assert_eq!(json["user"], json!(user_id.to_string()));
        assert_eq!(json["items"][0]["id"], "CMIP6.CMIP.foo|esgf-data.example.org");
    }

    #[test]
    fn test_update_rejects_non_array() {
        let result = serde_json::from_value::<CartItemsUpdate>(json!({"items": {"a": 1}}));
        assert!(result.is_err());

        let update: CartItemsUpdate = serde_json::from_value(json!({"items": []})).unwrap();
        assert!(update.items.is_empty());
    }
}
