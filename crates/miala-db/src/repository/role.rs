//! SurrealDB implementation of [`RoleRepository`].

use chrono::{DateTime, Utc};
use miala_core::error::MialaResult;
use miala_core::models::role::{CreateRole, Role, RoleType};
use miala_core::repository::RoleRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::{parse_uuid, parse_uuids, select_live, uuid_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RoleRowWithId {
    record_id: String,
    name: String,
    role_type: String,
    default_role: bool,
    description: String,
    permission_ids: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RoleRowWithId {
    fn try_into_role(self) -> Result<Role, DbError> {
        let role_type = RoleType::parse(&self.role_type)
            .ok_or_else(|| DbError::InvalidRecord(format!("unknown role type: {}", self.role_type)))?;
        Ok(Role {
            id: parse_uuid(&self.record_id, "role")?,
            name: self.name,
            role_type,
            default_role: self.default_role,
            description: self.description,
            permission_ids: parse_uuids(&self.permission_ids, "permission")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the Role repository.
#[derive(Clone)]
pub struct SurrealRoleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRoleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RoleRepository for SurrealRoleRepository<C> {
    async fn create(&self, input: CreateRole) -> MialaResult<Role> {
        let id = Uuid::new_v4();

        self.db
            .query(
                "CREATE type::record('role', $id) SET \
                 name = $name, role_type = $role_type, \
                 default_role = $default_role, \
                 description = $description, \
                 permission_ids = [], deleted = false",
            )
            .bind(("id", id.to_string()))
            .bind(("name", input.name))
            .bind(("role_type", input.role_type.as_str().to_string()))
            .bind(("default_role", input.default_role))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> MialaResult<Role> {
        let id_str = id.to_string();
        let query = select_live("role", "id = type::record('role', $id)");

        let mut result = self
            .db
            .query(&query)
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| DbError::not_found("role", id_str))?;

        Ok(row.try_into_role()?)
    }

    async fn get_by_ids(&self, ids: &[Uuid]) -> MialaResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = select_live("role", "meta::id(id) IN $ids") + " ORDER BY name ASC";

        let mut result = self
            .db
            .query(&query)
            .bind(("ids", uuid_strings(ids)))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let roles = rows
            .into_iter()
            .map(RoleRowWithId::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(roles)
    }

    async fn list_default(&self) -> MialaResult<Vec<Role>> {
        let query = select_live("role", "default_role = true") + " ORDER BY name ASC";

        let mut result = self.db.query(&query).await.map_err(DbError::from)?;

        let rows: Vec<RoleRowWithId> = result.take(0).map_err(DbError::from)?;
        let roles = rows
            .into_iter()
            .map(RoleRowWithId::try_into_role)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(roles)
    }

    async fn grant_permission(&self, role_id: Uuid, permission_id: Uuid) -> MialaResult<()> {
        // Unknown or deleted roles are NotFound.
        self.get_by_id(role_id).await?;

        self.db
            .query(
                "UPDATE type::record('role', $id) SET \
                 permission_ids = array::union(permission_ids, [$permission_id]), \
                 updated_at = time::now() RETURN NONE",
            )
            .bind(("id", role_id.to_string()))
            .bind(("permission_id", permission_id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from_check)?;

        Ok(())
    }
}
