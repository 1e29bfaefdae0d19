//! Saved search entity and repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metagrid_core::{
    validate_result_url, validate_text_filters, validate_version_range, JsonMap, ResultType,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Page, PageParams, PgStore, SearchRepository, StoreError};

/// Saved search entity
#[derive(Debug, Clone, PartialEq)]
pub struct Search {
    pub id: i64,
    pub uuid: Uuid,
    pub user_id: Uuid,
    pub project_id: i32,
    pub result_type: ResultType,
    pub min_version_date: Option<String>,
    pub max_version_date: Option<String>,
    pub filename_vars: Vec<String>,
    pub active_facets: JsonMap,
    pub text_inputs: Vec<String>,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl Search {
    /// Build a new search owned by `user_id`; ids are assigned by the store
    pub(crate) fn from_input(id: i64, user_id: Uuid, input: NewSearch) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            user_id,
            project_id: input.project,
            result_type: input.result_type,
            min_version_date: input.min_version_date,
            max_version_date: input.max_version_date,
            filename_vars: input.filename_vars,
            active_facets: input.active_facets,
            text_inputs: input.text_inputs,
            url: input.url,
            created_at: Utc::now(),
        }
    }
}

#[derive(FromRow)]
struct SearchRow {
    id: i64,
    uuid: Uuid,
    user_id: Uuid,
    project_id: i32,
    result_type: String,
    min_version_date: Option<String>,
    max_version_date: Option<String>,
    filename_vars: Vec<String>,
    active_facets: sqlx::types::Json<Value>,
    text_inputs: Vec<String>,
    url: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<SearchRow> for Search {
    type Error = StoreError;

    fn try_from(row: SearchRow) -> Result<Self, Self::Error> {
        let id = row.id;
        let corrupt =
            |e: metagrid_core::MetagridError| StoreError::Corrupt(format!("searches row {}: {}", id, e));

        Ok(Self {
            result_type: row.result_type.parse().map_err(corrupt)?,
            active_facets: JsonMap::try_from(row.active_facets.0).map_err(corrupt)?,
            id,
            uuid: row.uuid,
            user_id: row.user_id,
            project_id: row.project_id,
            min_version_date: row.min_version_date,
            max_version_date: row.max_version_date,
            filename_vars: row.filename_vars,
            text_inputs: row.text_inputs,
            url: row.url,
            created_at: row.created_at,
        })
    }
}

/// Request body for saving a search
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewSearch {
    /// Project the search runs against
    #[schema(example = 1)]
    pub project: i32,

    #[serde(default)]
    #[schema(value_type = String, example = "all")]
    pub result_type: ResultType,

    /// Lower version date bound, `YYYYMMDD`
    #[schema(example = "20190101")]
    pub min_version_date: Option<String>,

    /// Upper version date bound, `YYYYMMDD`
    #[schema(example = "20201231")]
    pub max_version_date: Option<String>,

    #[serde(default)]
    pub filename_vars: Vec<String>,

    /// Selected facet values keyed by facet name
    #[serde(default)]
    #[schema(value_type = Object)]
    pub active_facets: JsonMap,

    #[serde(default)]
    pub text_inputs: Vec<String>,

    /// ESG-Search URL reproducing the results
    #[schema(example = "https://esgf-node.llnl.gov/esg-search/search/?project=CMIP6")]
    pub url: String,
}

impl NewSearch {
    /// Field-level validation; project existence is checked against the store
    pub fn validate(&self) -> metagrid_core::Result<()> {
        validate_version_range(
            self.min_version_date.as_deref(),
            self.max_version_date.as_deref(),
        )?;
        validate_text_filters("filename_vars", &self.filename_vars)?;
        validate_text_filters("text_inputs", &self.text_inputs)?;
        validate_result_url(&self.url)
    }
}

/// Saved search response DTO
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SearchResponse {
    #[schema(value_type = String)]
    pub uuid: Uuid,
    #[schema(value_type = String)]
    pub user: Uuid,
    pub project: i32,
    #[schema(value_type = String, example = "all")]
    pub result_type: ResultType,
    pub min_version_date: Option<String>,
    pub max_version_date: Option<String>,
    pub filename_vars: Vec<String>,
    #[schema(value_type = Object)]
    pub active_facets: JsonMap,
    pub text_inputs: Vec<String>,
    pub url: String,
    #[schema(value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<Search> for SearchResponse {
    fn from(search: Search) -> Self {
        Self {
            uuid: search.uuid,
            user: search.user_id,
            project: search.project_id,
            result_type: search.result_type,
            min_version_date: search.min_version_date,
            max_version_date: search.max_version_date,
            filename_vars: search.filename_vars,
            active_facets: search.active_facets,
            text_inputs: search.text_inputs,
            url: search.url,
            created_at: search.created_at,
        }
    }
}

const SEARCH_COLUMNS: &str = "id, uuid, user_id, project_id, result_type, min_version_date, \
     max_version_date, filename_vars, active_facets, text_inputs, url, created_at";

#[async_trait]
impl SearchRepository for PgStore {
    async fn list_searches(
        &self,
        user_id: Uuid,
        params: &PageParams,
    ) -> Result<Page<Search>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM searches WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        let rows = sqlx::query_as::<_, SearchRow>(&format!(
            "SELECT {} FROM searches WHERE user_id = $1 ORDER BY id LIMIT $2 OFFSET $3",
            SEARCH_COLUMNS
        ))
        .bind(user_id)
        .bind(params.limit)
        .bind(params.offset())
        .fetch_all(self.pool())
        .await?;

        let searches = rows
            .into_iter()
            .map(Search::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(searches, params, total))
    }

    async fn create_search(&self, user_id: Uuid, input: NewSearch) -> Result<Search, StoreError> {
        let row = sqlx::query_as::<_, SearchRow>(&format!(
            r#"
            INSERT INTO searches (
                uuid, user_id, project_id, result_type, min_version_date, max_version_date,
                filename_vars, active_facets, text_inputs, url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            SEARCH_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(input.project)
        .bind(input.result_type.as_str())
        .bind(&input.min_version_date)
        .bind(&input.max_version_date)
        .bind(&input.filename_vars)
        .bind(sqlx::types::Json(Value::from(input.active_facets)))
        .bind(&input.text_inputs)
        .bind(&input.url)
        .fetch_one(self.pool())
        .await?;

        let search = Search::try_from(row)?;
        tracing::debug!(search_uuid = %search.uuid, user_id = %user_id, "Search saved");
        Ok(search)
    }

    async fn find_search(&self, user_id: Uuid, uuid: Uuid) -> Result<Option<Search>, StoreError> {
        let row = sqlx::query_as::<_, SearchRow>(&format!(
            "SELECT {} FROM searches WHERE uuid = $1 AND user_id = $2",
            SEARCH_COLUMNS
        ))
        .bind(uuid)
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(Search::try_from).transpose()
    }

    async fn delete_search(&self, user_id: Uuid, uuid: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM searches WHERE uuid = $1 AND user_id = $2")
            .bind(uuid)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
