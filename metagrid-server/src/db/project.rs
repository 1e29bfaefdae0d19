//! Project, facet group and facet entities
//!
//! Projects are read-only over the API. The built-in catalogue from
//! [`metagrid_core::catalog`] is loaded with [`ProjectRepository::seed_catalog`].

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use metagrid_core::{catalog, facets_url, group_facets};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use super::{Page, PageParams, PgStore, ProjectRepository, StoreError};

/// Project entity from database
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Project {
    pub id: i32,
    pub name: String,
    pub full_name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FacetGroup {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Facet joined with its group name
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Facet {
    pub id: i32,
    pub name: String,
    pub project_id: i32,
    pub group_id: Option<i32>,
    pub group_name: Option<String>,
}

/// Project with its facets ordered by facet id
#[derive(Debug, Clone)]
pub struct ProjectWithFacets {
    pub project: Project,
    pub facets: Vec<Facet>,
}

/// Counts reported after seeding the catalogue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub projects: usize,
    pub groups: usize,
    pub facets: usize,
}

impl SeedSummary {
    /// Summary of the built-in catalogue
    pub fn of_catalog() -> Self {
        Self {
            projects: catalog::PROJECTS.len(),
            groups: catalog::FACET_GROUPS.len(),
            facets: catalog::PROJECTS.iter().map(|p| p.facets().count()).sum(),
        }
    }
}

/// Project response DTO
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProjectResponse {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "CMIP6")]
    pub name: String,
    #[schema(example = "Coupled Model Intercomparison Project Phase 6")]
    pub full_name: Option<String>,
    pub description: Option<String>,
    /// ESG-Search query returning facet counts for this project
    pub facets_url: Option<String>,
    /// Facet names keyed by facet group name
    pub facets_by_group: BTreeMap<String, Vec<String>>,
}

impl ProjectResponse {
    pub fn new(value: ProjectWithFacets, esgf_search_url: &str) -> Self {
        let ProjectWithFacets { project, facets } = value;

        let names: Vec<&str> = facets.iter().map(|f| f.name.as_str()).collect();
        let facets_url = facets_url(esgf_search_url, &project.name, &names);
        let facets_by_group = group_facets(
            facets
                .iter()
                .map(|f| (f.name.as_str(), f.group_name.as_deref())),
        );

        Self {
            id: project.id,
            name: project.name,
            full_name: project.full_name,
            description: project.description,
            facets_url,
            facets_by_group,
        }
    }
}

const SELECT_FACETS_SQL: &str = r#"
    SELECT f.id, f.name, f.project_id, f.group_id, g.name AS group_name
    FROM facets f
    LEFT JOIN facet_groups g ON g.id = f.group_id
    WHERE f.project_id = ANY($1)
    ORDER BY f.id
"#;

/// Attach facets to their projects, keeping both orders
fn attach_facets(projects: Vec<Project>, facets: Vec<Facet>) -> Vec<ProjectWithFacets> {
    let mut by_project: HashMap<i32, Vec<Facet>> = HashMap::new();
    for facet in facets {
        by_project.entry(facet.project_id).or_default().push(facet);
    }

    projects
        .into_iter()
        .map(|project| ProjectWithFacets {
            facets: by_project.remove(&project.id).unwrap_or_default(),
            project,
        })
        .collect()
}

#[async_trait]
impl ProjectRepository for PgStore {
    async fn list_projects(
        &self,
        params: &PageParams,
    ) -> Result<Page<ProjectWithFacets>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(self.pool())
            .await?;

        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, name, full_name, description
            FROM projects
            ORDER BY id
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(params.limit)
        .bind(params.offset())
        .fetch_all(self.pool())
        .await?;

        let ids: Vec<i32> = projects.iter().map(|p| p.id).collect();
        let facets = sqlx::query_as::<_, Facet>(SELECT_FACETS_SQL)
            .bind(&ids)
            .fetch_all(self.pool())
            .await?;

        Ok(Page::new(attach_facets(projects, facets), params, total))
    }

    async fn find_project(&self, id: i32) -> Result<Option<ProjectWithFacets>, StoreError> {
        let project = sqlx::query_as::<_, Project>(
            "SELECT id, name, full_name, description FROM projects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        let Some(project) = project else {
            return Ok(None);
        };

        let facets = sqlx::query_as::<_, Facet>(SELECT_FACETS_SQL)
            .bind(vec![project.id])
            .fetch_all(self.pool())
            .await?;

        Ok(Some(ProjectWithFacets { project, facets }))
    }

    async fn project_exists(&self, id: i32) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
            .bind(id)
            .fetch_one(self.pool())
            .await?;
        Ok(exists)
    }

    async fn seed_catalog(&self) -> Result<SeedSummary, StoreError> {
        let mut tx = self.pool().begin().await?;
        let mut group_ids: HashMap<&'static str, i32> = HashMap::new();

        for group in catalog::FACET_GROUPS {
            let id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO facet_groups (name, description)
                VALUES ($1, $2)
                ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
                RETURNING id
                "#,
            )
            .bind(group.name)
            .bind(group.description)
            .fetch_one(&mut *tx)
            .await?;
            group_ids.insert(group.name, id);
        }

        for project in catalog::PROJECTS {
            let project_id: i32 = sqlx::query_scalar(
                r#"
                INSERT INTO projects (name, full_name, description)
                VALUES ($1, $2, $3)
                ON CONFLICT (name) DO UPDATE SET
                    full_name = EXCLUDED.full_name,
                    description = EXCLUDED.description
                RETURNING id
                "#,
            )
            .bind(project.name)
            .bind(project.full_name)
            .bind(project.description)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StoreError::from_sqlx(e, "Project full name is already taken"))?;

            for (facet, group) in project.facets() {
                sqlx::query(
                    r#"
                    INSERT INTO facets (name, project_id, group_id)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (name, project_id) DO UPDATE SET group_id = EXCLUDED.group_id
                    "#,
                )
                .bind(facet)
                .bind(project_id)
                .bind(group_ids.get(group).copied())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;

        let summary = SeedSummary::of_catalog();
        tracing::info!(
            projects = summary.projects,
            groups = summary.groups,
            facets = summary.facets,
            "Catalogue seeded"
        );
        Ok(summary)
    }
}
