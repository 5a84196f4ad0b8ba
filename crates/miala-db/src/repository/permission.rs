//! SurrealDB implementation of [`PermissionRepository`].

use chrono::{DateTime, Utc};
use miala_core::error::MialaResult;
use miala_core::models::permission::{CreatePermission, Permission};
use miala_core::models::role::RoleType;
use miala_core::repository::PermissionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, select_live, uuid_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct PermissionRowWithId {
    record_id: String,
    name: String,
    permission_type: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PermissionRowWithId {
    fn try_into_permission(self) -> Result<Permission, DbError> {
        let permission_type = RoleType::parse(&self.permission_type).ok_or_else(|| {
            DbError::InvalidRecord(format!("unknown permission type: {}", self.permission_type))
        })?;
        Ok(Permission {
            id: parse_uuid(&self.record_id, "permission")?,
            name: self.name,
            permission_type,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Permission repository.
#[derive(Clone)]
pub struct SurrealPermissionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPermissionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PermissionRepository for SurrealPermissionRepository<C> {
    async fn create(&self, input: CreatePermission) -> MialaResult<Permission> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        self.db
            .query(
                "CREATE type::record('permission', $id) SET \
                 name = $name, permission_type = $permission_type, \
                 description = $description, deleted = false",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("permission_type", input.permission_type.as_str().to_string()))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        self.get_by_ids(&[id])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("permission", id_str).into())
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> MialaResult<Vec<Permission>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = select_live("permission", "meta::id(id) IN $ids") + " ORDER BY name ASC";

        let mut result = self
            .db
            .query(&query)
            .bind(("ids", uuid_strings(ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PermissionRowWithId> = result.take(0).map_err(DbError::from)?;
        let permissions = rows
            .into_iter()
            .map(PermissionRowWithId::try_into_permission)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(permissions)
    }
}
