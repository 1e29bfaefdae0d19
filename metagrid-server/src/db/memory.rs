//! In-memory storage backend
//!
//! Used when no database is configured and by the integration tests.
//! Enforces the same uniqueness and ownership rules as the PostgreSQL schema.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use metagrid_core::{catalog, JsonList};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use super::{
    Cart, CartRepository, Facet, FacetGroup, NewSearch, NewSubscription, Page, PageParams,
    Project, ProjectRepository, ProjectWithFacets, SavedSubscriptions, Search, SearchRepository,
    SeedSummary, Store, StoreError, Subscription, SubscriptionPatch, SubscriptionRepository,
    SyncUser, User, UserRepository,
};

/// Projects, facet groups and facets, each ordered by id
#[derive(Default)]
struct CatalogTables {
    projects: Vec<Project>,
    groups: Vec<FacetGroup>,
    facets: Vec<Facet>,
}

impl CatalogTables {
    /// Upsert the built-in catalogue by natural key
    fn seed(&mut self) -> SeedSummary {
        let mut group_ids: HashMap<&str, i32> = HashMap::new();
        for group in catalog::FACET_GROUPS {
            let id = match self.groups.iter_mut().find(|g| g.name == group.name) {
                Some(existing) => {
                    existing.description = Some(group.description.to_string());
                    existing.id
                }
                None => {
                    let id = self.groups.len() as i32 + 1;
                    self.groups.push(FacetGroup {
                        id,
                        name: group.name.to_string(),
                        description: Some(group.description.to_string()),
                    });
                    id
                }
            };
            group_ids.insert(group.name, id);
        }

        for entry in catalog::PROJECTS {
            let project_id = match self.projects.iter_mut().find(|p| p.name == entry.name) {
                Some(existing) => {
                    existing.full_name = Some(entry.full_name.to_string());
                    existing.description = Some(entry.description.to_string());
                    existing.id
                }
                None => {
                    let id = self.projects.len() as i32 + 1;
                    self.projects.push(Project {
                        id,
                        name: entry.name.to_string(),
                        full_name: Some(entry.full_name.to_string()),
                        description: Some(entry.description.to_string()),
                    });
                    id
                }
            };

            for (name, group) in entry.facets() {
                let group_id = group_ids.get(group).copied();
                let group_name = group_id.map(|_| group.to_string());
                match self
                    .facets
                    .iter_mut()
                    .find(|f| f.project_id == project_id && f.name == name)
                {
                    Some(existing) => {
                        existing.group_id = group_id;
                        existing.group_name = group_name;
                    }
                    None => {
                        let id = self.facets.len() as i32 + 1;
                        self.facets.push(Facet {
                            id,
                            name: name.to_string(),
                            project_id,
                            group_id,
                            group_name,
                        });
                    }
                }
            }
        }

        SeedSummary::of_catalog()
    }

    fn with_facets(&self, project: &Project) -> ProjectWithFacets {
        ProjectWithFacets {
            project: project.clone(),
            facets: self
                .facets
                .iter()
                .filter(|f| f.project_id == project.id)
                .cloned()
                .collect(),
        }
    }
}

/// In-memory store backed by concurrent maps
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, User>,
    /// subject -> user id
    subjects: DashMap<String, Uuid>,
    /// Held for the whole of `sync_user` so the email check and the write are atomic
    user_writes: Mutex<()>,
    catalog: RwLock<CatalogTables>,
    carts: DashMap<Uuid, Cart>,
    saved_subscriptions: DashMap<Uuid, SavedSubscriptions>,
    /// Keyed by public uuid
    searches: DashMap<Uuid, Search>,
    subscriptions: DashMap<Uuid, Subscription>,
    next_id: AtomicI64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store preloaded with the built-in catalogue
    pub fn with_catalog() -> Self {
        let mut tables = CatalogTables::default();
        tables.seed();
        Self {
            catalog: RwLock::new(tables),
            ..Self::default()
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Owned records sorted by id, then paginated
    fn page_of<T: Clone>(
        map: &DashMap<Uuid, T>,
        params: &PageParams,
        owned: impl Fn(&T) -> bool,
        id: impl Fn(&T) -> i64,
    ) -> Page<T> {
        let mut items: Vec<T> = map
            .iter()
            .filter(|entry| owned(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|item| id(item));
        Page::from_ordered(items, params)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.subjects.get(subject).map(|entry| *entry.value()) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn sync_user(&self, input: SyncUser) -> Result<(User, bool), StoreError> {
        let _guard = self.user_writes.lock().await;

        let email_taken = self
            .users
            .iter()
            .any(|user| user.email == input.email && user.subject != input.subject);
        if email_taken {
            return Err(StoreError::Conflict(
                "Email address is already registered".to_string(),
            ));
        }

        let now = Utc::now();
        match self.subjects.entry(input.subject.clone()) {
            Entry::Occupied(entry) => {
                let id = *entry.get();
                let mut user = self.users.get_mut(&id).ok_or_else(|| {
                    StoreError::Corrupt(format!("subject {} points at missing user", input.subject))
                })?;
                user.email = input.email;
                if input.name.is_some() {
                    user.name = input.name;
                }
                user.updated_at = now;
                Ok((user.clone(), false))
            }
            Entry::Vacant(entry) => {
                let user = User {
                    id: Uuid::new_v4(),
                    subject: input.subject,
                    email: input.email,
                    name: input.name,
                    created_at: now,
                    updated_at: now,
                };

                self.carts.insert(
                    user.id,
                    Cart {
                        user_id: user.id,
                        items: JsonList::default(),
                        updated_at: now,
                    },
                );
                self.saved_subscriptions.insert(
                    user.id,
                    SavedSubscriptions {
                        user_id: user.id,
                        subscriptions: JsonList::default(),
                        updated_at: now,
                    },
                );
                self.users.insert(user.id, user.clone());
                entry.insert(user.id);

                Ok((user, true))
            }
        }
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn list_projects(
        &self,
        params: &PageParams,
    ) -> Result<Page<ProjectWithFacets>, StoreError> {
        let tables = self.catalog.read().await;
        let projects: Vec<ProjectWithFacets> = tables
            .projects
            .iter()
            .map(|project| tables.with_facets(project))
            .collect();
        Ok(Page::from_ordered(projects, params))
    }

    async fn find_project(&self, id: i32) -> Result<Option<ProjectWithFacets>, StoreError> {
        let tables = self.catalog.read().await;
        Ok(tables
            .projects
            .iter()
            .find(|p| p.id == id)
            .map(|project| tables.with_facets(project)))
    }

    async fn project_exists(&self, id: i32) -> Result<bool, StoreError> {
        Ok(self.catalog.read().await.projects.iter().any(|p| p.id == id))
    }

    async fn seed_catalog(&self) -> Result<SeedSummary, StoreError> {
        Ok(self.catalog.write().await.seed())
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn find_cart(&self, user_id: Uuid) -> Result<Option<Cart>, StoreError> {
        Ok(self.carts.get(&user_id).map(|cart| cart.clone()))
    }

    async fn replace_cart_items(
        &self,
        user_id: Uuid,
        items: JsonList,
    ) -> Result<Option<Cart>, StoreError> {
        Ok(self.carts.get_mut(&user_id).map(|mut cart| {
            cart.items = items;
            cart.updated_at = Utc::now();
            cart.clone()
        }))
    }
}

#[async_trait]
impl SearchRepository for MemoryStore {
    async fn list_searches(
        &self,
        user_id: Uuid,
        params: &PageParams,
    ) -> Result<Page<Search>, StoreError> {
        Ok(Self::page_of(
            &self.searches,
            params,
            |s| s.user_id == user_id,
            |s| s.id,
        ))
    }

    async fn create_search(&self, user_id: Uuid, input: NewSearch) -> Result<Search, StoreError> {
        let search = Search::from_input(self.next_id(), user_id, input);
        self.searches.insert(search.uuid, search.clone());
        Ok(search)
    }

    async fn find_search(&self, user_id: Uuid, uuid: Uuid) -> Result<Option<Search>, StoreError> {
        Ok(self
            .searches
            .get(&uuid)
            .filter(|s| s.user_id == user_id)
            .map(|s| s.clone()))
    }

    async fn delete_search(&self, user_id: Uuid, uuid: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .searches
            .remove_if(&uuid, |_, s| s.user_id == user_id)
            .is_some())
    }
}

#[async_trait]
impl SubscriptionRepository for MemoryStore {
    async fn find_saved_subscriptions(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SavedSubscriptions>, StoreError> {
        Ok(self
            .saved_subscriptions
            .get(&user_id)
            .map(|saved| saved.clone()))
    }

    async fn replace_saved_subscriptions(
        &self,
        user_id: Uuid,
        subscriptions: JsonList,
    ) -> Result<Option<SavedSubscriptions>, StoreError> {
        Ok(self.saved_subscriptions.get_mut(&user_id).map(|mut saved| {
            saved.subscriptions = subscriptions;
            saved.updated_at = Utc::now();
            saved.clone()
        }))
    }

    async fn list_subscriptions(
        &self,
        user_id: Uuid,
        params: &PageParams,
    ) -> Result<Page<Subscription>, StoreError> {
        Ok(Self::page_of(
            &self.subscriptions,
            params,
            |s| s.user_id == user_id,
            |s| s.id,
        ))
    }

    async fn create_subscription(
        &self,
        user_id: Uuid,
        input: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        let subscription = Subscription::from_input(self.next_id(), user_id, input);
        self.subscriptions
            .insert(subscription.uuid, subscription.clone());
        Ok(subscription)
    }

    async fn find_subscription(
        &self,
        user_id: Uuid,
        uuid: Uuid,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .get(&uuid)
            .filter(|s| s.user_id == user_id)
            .map(|s| s.clone()))
    }

    async fn replace_subscription(
        &self,
        user_id: Uuid,
        uuid: Uuid,
        input: NewSubscription,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .get_mut(&uuid)
            .filter(|s| s.user_id == user_id)
            .map(|mut s| {
                s.replace(input);
                s.clone()
            }))
    }

    async fn patch_subscription(
        &self,
        user_id: Uuid,
        uuid: Uuid,
        patch: SubscriptionPatch,
    ) -> Result<Option<Subscription>, StoreError> {
        Ok(self
            .subscriptions
            .get_mut(&uuid)
            .filter(|s| s.user_id == user_id)
            .map(|mut s| {
                s.apply(patch);
                s.clone()
            }))
    }

    async fn delete_subscription(&self, user_id: Uuid, uuid: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .subscriptions
            .remove_if(&uuid, |_, s| s.user_id == user_id)
            .is_some())
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn check_health(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sync(subject: &str, email: &str, name: Option<&str>) -> SyncUser {
        SyncUser {
            subject: subject.to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
        }
    }

    fn new_search(project: i32) -> NewSearch {
        serde_json::from_value(json!({
            "project": project,
            "url": "https://esgf-node.llnl.gov/esg-search/search/?project=CMIP6"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_sync_user_creates_once() {
        let store = MemoryStore::new();

        let (user, created) = store
            .sync_user(sync("sub-1", "a@example.org", Some("Ada")))
            .await
            .unwrap();
        assert!(created);
        assert!(store.find_cart(user.id).await.unwrap().is_some());
        assert!(store
            .find_saved_subscriptions(user.id)
            .await
            .unwrap()
            .is_some());

        store
            .replace_cart_items(user.id, JsonList::new(vec![json!({"id": "ds"})]))
            .await
            .unwrap();

        let (again, created) = store
            .sync_user(sync("sub-1", "ada@example.org", None))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, user.id);
        assert_eq!(again.email, "ada@example.org");
        assert_eq!(again.name.as_deref(), Some("Ada"));

        // Re-sync must not reset the cart
        let cart = store.find_cart(user.id).await.unwrap().unwrap();
        assert_eq!(cart.items.len(), 1);
    }

    #[tokio::test]
    async fn test_sync_user_email_conflict() {
        let store = MemoryStore::new();
        store
            .sync_user(sync("sub-1", "a@example.org", None))
            .await
            .unwrap();

        let err = store
            .sync_user(sync("sub-2", "a@example.org", None))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sync_same_email() {
        let store = std::sync::Arc::new(MemoryStore::new());

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .sync_user(sync(&format!("sub-{}", i), "shared@example.org", None))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => created += 1,
                Err(err) => assert!(matches!(err, StoreError::Conflict(_))),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.users.len(), 1);
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.seed_catalog().await.unwrap();
        store.seed_catalog().await.unwrap();

        let page = store
            .list_projects(&PageParams { page: 1, limit: 100 })
            .await
            .unwrap();
        assert_eq!(page.total as usize, first.projects);
        assert_eq!(page.results[0].project.name, "CMIP6");
        assert_eq!(page.results[0].facets.len(), 15);

        let tables = store.catalog.read().await;
        assert_eq!(tables.facets.len(), first.facets);
        assert_eq!(tables.groups.len(), first.groups);
    }

    #[tokio::test]
    async fn test_searches_are_owner_scoped() {
        let store = MemoryStore::with_catalog();
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let first = store.create_search(owner, new_search(1)).await.unwrap();
        let second = store.create_search(owner, new_search(2)).await.unwrap();
        store.create_search(other, new_search(1)).await.unwrap();

        let page = store
            .list_searches(owner, &PageParams::default())
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.results[0].uuid, first.uuid);
        assert_eq!(page.results[1].uuid, second.uuid);

        assert!(store.find_search(other, first.uuid).await.unwrap().is_none());
        assert!(!store.delete_search(other, first.uuid).await.unwrap());
        assert!(store.delete_search(owner, first.uuid).await.unwrap());
        assert!(store.find_search(owner, first.uuid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_patch_subscription_foreign_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let input: NewSubscription =
            serde_json::from_value(json!({"timestamp": "2026-01-01T00:00:00Z"})).unwrap();
        let sub = store.create_subscription(owner, input).await.unwrap();

        let patch = SubscriptionPatch {
            name: Some(Some("renamed".to_string())),
            ..SubscriptionPatch::default()
        };
        let foreign = store
            .patch_subscription(Uuid::new_v4(), sub.uuid, patch.clone())
            .await
            .unwrap();
        assert!(foreign.is_none());

        let patched = store
            .patch_subscription(owner, sub.uuid, patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(patched.name.as_deref(), Some("renamed"));
    }
}
