//! Subscription entities and repository
//!
//! Two separate records live here: the free-form saved subscriptions list the
//! frontend keeps per user, and structured subscription definitions with a
//! notification period.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metagrid_core::{ensure_max_length, JsonList, JsonMap, Period, MAX_NAME_LENGTH};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Page, PageParams, PgStore, StoreError, SubscriptionRepository};

/// A user's saved subscriptions list
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSubscriptions {
    pub user_id: Uuid,
    pub subscriptions: JsonList,
    pub updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SavedSubscriptionsRow {
    user_id: Uuid,
    subscriptions: sqlx::types::Json<Value>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SavedSubscriptionsRow> for SavedSubscriptions {
    type Error = StoreError;

    fn try_from(row: SavedSubscriptionsRow) -> Result<Self, Self::Error> {
        let subscriptions = JsonList::try_from(row.subscriptions.0).map_err(|e| {
            StoreError::Corrupt(format!(
                "saved_subscriptions.subscriptions for {}: {}",
                row.user_id, e
            ))
        })?;
        Ok(Self {
            user_id: row.user_id,
            subscriptions,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SavedSubscriptionsResponse {
    #[schema(value_type = String)]
    pub user: Uuid,
    #[schema(value_type = Vec<Object>)]
    pub subscriptions: JsonList,
}

impl From<SavedSubscriptions> for SavedSubscriptionsResponse {
    fn from(saved: SavedSubscriptions) -> Self {
        Self {
            user: saved.user_id,
            subscriptions: saved.subscriptions,
        }
    }
}

/// Request body replacing the saved subscriptions list
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SavedSubscriptionsUpdate {
    #[schema(value_type = Vec<Object>)]
    pub subscriptions: JsonList,
}

/// Subscription definition entity
#[derive(Debug, Clone, PartialEq)]
pub struct Subscription {
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: Uuid,
    pub period: Period,
    pub timestamp: DateTime<Utc>,
    pub name: Option<String>,
    pub facets: JsonMap,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Build a new subscription owned by `user_id`; ids are assigned by the store
    pub(crate) fn from_input(id: i64, user_id: Uuid, input: NewSubscription) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            user_id,
            period: input.period,
            timestamp: input.timestamp,
            name: input.name,
            facets: input.facets,
            created_at: Utc::now(),
        }
    }

    /// Overwrite every mutable field
    pub(crate) fn replace(&mut self, input: NewSubscription) {
        self.period = input.period;
        self.timestamp = input.timestamp;
        self.name = input.name;
        self.facets = input.facets;
    }

    /// Overwrite only the fields present in `patch`
    pub(crate) fn apply(&mut self, patch: SubscriptionPatch) {
        if let Some(period) = patch.period {
            self.period = period;
        }
        if let Some(timestamp) = patch.timestamp {
            self.timestamp = timestamp;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(facets) = patch.facets {
            self.facets = facets;
        }
    }

    /// When the next notification is due
    pub fn next_notification(&self) -> DateTime<Utc> {
        self.period.next_after(self.timestamp)
    }
}

#[derive(FromRow)]
struct SubscriptionRow {
    id: i64,
    uuid: Uuid,
    user_id: Uuid,
    period: String,
    timestamp: DateTime<Utc>,
    name: Option<String>,
    facets: sqlx::types::Json<Value>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = StoreError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt = |e: metagrid_core::MetagridError| {
            StoreError::Corrupt(format!("subscriptions row {}: {}", id, e))
        };

        Ok(Self {
            period: row.period.parse().map_err(corrupt)?,
            facets: JsonMap::try_from(row.facets.0).map_err(corrupt)?,
            id,
            uuid: row.uuid,
            user_id: row.user_id,
            timestamp: row.timestamp,
            name: row.name,
            created_at: row.created_at,
        })
    }
}

fn validate_name(name: Option<&str>) -> metagrid_core::Result<()> {
    match name {
        Some(name) => ensure_max_length("name", name, MAX_NAME_LENGTH),
        None => Ok(()),
    }
}

/// Request body for creating or replacing a subscription
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewSubscription {
    /// Notification period code
    #[serde(default)]
    #[schema(value_type = String, example = "W")]
    pub period: Period,

    /// Reference time the period is counted from
    #[schema(value_type = String, example = "2026-01-08T10:00:00Z")]
    pub timestamp: DateTime<Utc>,

    #[schema(example = "Daily tas updates")]
    pub name: Option<String>,

    /// Facet selection keyed by facet name
    #[serde(default)]
    #[schema(value_type = Object)]
    pub facets: JsonMap,
}

impl NewSubscription {
    pub fn validate(&self) -> metagrid_core::Result<()> {
        validate_name(self.name.as_deref())
    }
}

/// Request body for a partial subscription update
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SubscriptionPatch {
    #[schema(value_type = Option<String>, example = "M")]
    pub period: Option<Period>,
    #[schema(value_type = Option<String>)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Absent leaves the name unchanged, `null` clears it
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    #[schema(value_type = Option<Object>)]
    pub facets: Option<JsonMap>,
}

impl SubscriptionPatch {
    pub fn validate(&self) -> metagrid_core::Result<()> {
        validate_name(self.name.as_ref().and_then(Option::as_deref))
    }
}

/// Wrap a field that was present in the body, even when it is `null`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Subscription response DTO
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SubscriptionResponse {
    #[schema(value_type = String)]
    pub uuid: Uuid,
    #[schema(value_type = String)]
    pub user: Uuid,
    #[schema(value_type = String, example = "W")]
    pub period: Period,
    #[schema(value_type = String)]
    pub timestamp: DateTime<Utc>,
    pub name: Option<String>,
    #[schema(value_type = Object)]
    pub facets: JsonMap,
    /// `timestamp` advanced by one period
    #[schema(value_type = String)]
    pub next_notification: DateTime<Utc>,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<Subscription> for SubscriptionResponse {
    fn from(subscription: Subscription) -> Self {
        Self {
            next_notification: subscription.next_notification(),
            uuid: subscription.uuid,
            user: subscription.user_id,
            period: subscription.period,
            timestamp: subscription.timestamp,
            name: subscription.name,
            facets: subscription.facets,
            created_at: subscription.created_at,
        }
    }
}

const SUBSCRIPTION_COLUMNS: &str =
    r#"id, uuid, user_id, period, "timestamp", name, facets, created_at"#;

#[async_trait]
impl SubscriptionRepository for PgStore {
    async fn find_saved_subscriptions(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SavedSubscriptions>, StoreError> {
        let row = sqlx::query_as::<_, SavedSubscriptionsRow>(
            "SELECT user_id, subscriptions, updated_at FROM saved_subscriptions WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(SavedSubscriptions::try_from).transpose()
    }

    async fn replace_saved_subscriptions(
        &self,
        user_id: Uuid,
        subscriptions: JsonList,
    ) -> Result<Option<SavedSubscriptions>, StoreError> {
        let row = sqlx::query_as::<_, SavedSubscriptionsRow>(
            r#"
            UPDATE saved_subscriptions
            SET subscriptions = $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, subscriptions, updated_at
            "#,
        )
        .bind(user_id)
        .bind(sqlx::types::Json(Value::from(subscriptions)))
        .fetch_optional(self.pool())
        .await?;

        row.map(SavedSubscriptions::try_from).transpose()
    }

    async fn list_subscriptions(
        &self,
        user_id: Uuid,
        params: &PageParams,
    ) -> Result<Page<Subscription>, StoreError> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(self.pool())
                .await?;

        let rows = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(user_id)
        .bind(params.limit)
        .bind(params.offset())
        .fetch_all(self.pool())
        .await?;

        let subscriptions = rows
            .into_iter()
            .map(Subscription::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(subscriptions, params, total))
    }

    async fn create_subscription(
        &self,
        user_id: Uuid,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            INSERT INTO subscriptions (uuid, user_id, period, "timestamp", name, facets)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.period.code())
        .bind(input.timestamp)
        .bind(&input.name)
        .bind(sqlx::types::Json(Value::from(input.facets)))
        .fetch_one(self.pool())
        .await?;

        let subscription = Subscription::try_from(row)?;
        tracing::debug!(
            subscription_uuid = %subscription.uuid,
            period = %subscription.period,
            "Subscription created"
        );
        Ok(subscription)
    }

    async fn find_subscription(
        &self,
        user_id: Uuid,
        uuid: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            "SELECT {} FROM subscriptions WHERE uuid = $1 AND user_id = $2",
            SUBSCRIPTION_COLUMNS
        ))
        .bind(uuid)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    async fn replace_subscription(
        &self,
        user_id: Uuid,
        uuid: Uuid,
        input: NewSubscription,
    ) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET period = $3, "timestamp" = $4, name = $5, facets = $6
            WHERE uuid = $1 AND user_id = $2
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(uuid)
        .bind(user_id)
        .bind(input.period.code())
        .bind(input.timestamp)
        .bind(&input.name)
        .bind(sqlx::types::Json(Value::from(input.facets)))
        .fetch_optional(self.pool())
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    async fn patch_subscription(
        &self,
        user_id: Uuid,
        uuid: Uuid,
        patch: SubscriptionPatch,
    ) -> Result<Option<Subscription>, StoreError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(&format!(
            r#"
            UPDATE subscriptions
            SET period = COALESCE($3, period),
                "timestamp" = COALESCE($4, "timestamp"),
                name = CASE WHEN $5 THEN $6 ELSE name END,
                facets = COALESCE($7, facets)
            WHERE uuid = $1 AND user_id = $2
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        ))
        .bind(uuid)
        .bind(user_id)
        .bind(patch.period.map(|p| p.code()))
        .bind(patch.timestamp)
        .bind(patch.name.is_some())
        .bind(patch.name.flatten())
        .bind(patch.facets.map(|f| sqlx::types::Json(Value::from(f))))
        .fetch_optional(self.pool())
        .await?;

        row.map(Subscription::try_from).transpose()
    }

    async fn delete_subscription(&self, user_id: Uuid, uuid: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM subscriptions WHERE uuid = $1 AND user_id = $2")
            .bind(uuid)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
