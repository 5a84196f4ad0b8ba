//! Read-through cache for the default role set.
//!
//! Default roles are read on every registration but change rarely.
//! Entries live for the configured TTL and are never invalidated on
//! writes, so a newly flagged default role may take up to one TTL to
//! apply.

use cached::{Cached, TimedSizedCache};
use miala_core::error::MialaResult;
use miala_core::models::role::{CreateRole, Role};
use miala_core::repository::RoleRepository;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const DEFAULT_ROLES_KEY: &str = "default_roles";

/// [`RoleRepository`] decorator caching [`RoleRepository::list_default`].
pub struct CachingRoleRepository<R: RoleRepository> {
    inner: R,
    cache: Mutex<TimedSizedCache<&'static str, Vec<Role>>>,
}

impl<R: RoleRepository> CachingRoleRepository<R> {
    pub fn new(inner: R, size: usize, ttl_secs: u64) -> Self {
        Self {
            inner,
            cache: Mutex::new(TimedSizedCache::with_size_and_lifespan(size.max(1), ttl_secs)),
        }
    }
}

impl<R: RoleRepository> RoleRepository for CachingRoleRepository<R> {
    async fn create(&self, input: CreateRole) -> MialaResult<Role> {
        self.inner.create(input).await
    }

    async fn get_by_id(&self, id: Uuid) -> MialaResult<Role> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> MialaResult<Vec<Role>> {
        self.inner.get_by_ids(ids).await
    }

    async fn list_default(&self) -> MialaResult<Vec<Role>> {
        // Held across the load so concurrent misses hit the store once.
        let mut cache = self.cache.lock().await;
        if let Some(roles) = cache.cache_get(&DEFAULT_ROLES_KEY) {
            return Ok(roles.clone());
        }

        debug!("Default roles cache miss");
        let roles = self.inner.list_default().await?;
        if !roles.is_empty() {
            cache.cache_set(DEFAULT_ROLES_KEY, roles.clone());
        }
        Ok(roles)
    }

    async fn grant_permission(&self, role_id: Uuid, permission_id: Uuid) -> MialaResult<()> {
        self.inner.grant_permission(role_id, permission_id).await
    }
}
