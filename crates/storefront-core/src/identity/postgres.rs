//! PostgreSQL identity store
//!
//! Provides identity persistence using SQLx and PostgreSQL. The refresh slot
//! lives in two nullable columns of the identity row, so a single-row
//! conditional `UPDATE` is enough to serialize rotations per user.

use super::{IdentityRepository, IdentityUpdate, NewIdentity, Profile, RefreshSlot, UserIdentity};
use crate::{Result, Role, StorefrontError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS user_identities (
        id                 UUID PRIMARY KEY,
        email              TEXT NOT NULL UNIQUE,
        password_hash      TEXT NOT NULL,
        role               TEXT NOT NULL DEFAULT 'customer'
                           CHECK (role IN ('admin', 'shop', 'customer')),
        first_name         TEXT,
        last_name          TEXT,
        photo              TEXT,
        refresh_token_hash TEXT,
        refresh_expires_at TIMESTAMPTZ,
        created_at         TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at         TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    // Tables created before profile fields existed
    "ALTER TABLE user_identities ADD COLUMN IF NOT EXISTS first_name TEXT",
    "ALTER TABLE user_identities ADD COLUMN IF NOT EXISTS last_name TEXT",
    "ALTER TABLE user_identities ADD COLUMN IF NOT EXISTS photo TEXT",
];

const COLUMNS: &str = "id, email, password_hash, role, first_name, last_name, photo, \
                       refresh_token_hash, refresh_expires_at, created_at, updated_at";

/// PostgreSQL identity store
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    /// Create a new store connection
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StorefrontError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        tracing::debug!(max_connections, "PostgreSQL pool created");
        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the identity table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StorefrontError::DatabaseError(format!("Failed to create schema: {e}")))?;
        }
        tracing::info!("Identity schema ready");
        Ok(())
    }
}

/// Identity row from database
#[derive(Debug, FromRow)]
struct IdentityRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    photo: Option<String>,
    refresh_token_hash: Option<String>,
    refresh_expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<IdentityRow> for UserIdentity {
    type Error = StorefrontError;

    fn try_from(row: IdentityRow) -> Result<Self> {
        Ok(UserIdentity {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse::<Role>()?,
            profile: Profile {
                first_name: row.first_name,
                last_name: row.last_name,
                photo: row.photo,
            },
            refresh_slot: RefreshSlot::from_columns(row.refresh_token_hash, row.refresh_expires_at),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn map_write_error(e: sqlx::Error, context: &str) -> StorefrontError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            tracing::debug!(context, "Unique violation on identity write");
            return StorefrontError::Conflict("Email already registered".to_string());
        }
    }
    StorefrontError::DatabaseError(format!("{context}: {e}"))
}

#[async_trait]
impl IdentityRepository for PgIdentityStore {
    async fn create(&self, identity: NewIdentity) -> Result<UserIdentity> {
        let row: IdentityRow = sqlx::query_as(&format!(
            "INSERT INTO user_identities \
             (id, email, password_hash, role, first_name, last_name, photo) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(identity.role.as_str())
        .bind(identity.profile.first_name.as_deref())
        .bind(identity.profile.last_name.as_deref())
        .bind(identity.profile.photo.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to create identity"))?;

        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>> {
        let row: Option<IdentityRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM user_identities WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorefrontError::DatabaseError(format!("Failed to fetch identity: {e}")))?;

        row.map(UserIdentity::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        let row: Option<IdentityRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM user_identities WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StorefrontError::DatabaseError(format!("Failed to fetch identity: {e}")))?;

        row.map(UserIdentity::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<UserIdentity>> {
        let rows: Vec<IdentityRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM user_identities ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorefrontError::DatabaseError(format!("Failed to list identities: {e}")))?;

        rows.into_iter().map(UserIdentity::try_from).collect()
    }

    async fn update(&self, id: Uuid, update: IdentityUpdate) -> Result<UserIdentity> {
        let row: Option<IdentityRow> = sqlx::query_as(&format!(
            r#"
            UPDATE user_identities SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                role = COALESCE($4, role),
                first_name = COALESCE($5, first_name),
                last_name = COALESCE($6, last_name),
                photo = COALESCE($7, photo),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.email.as_deref())
        .bind(update.password_hash.as_deref())
        .bind(update.role.map(|r| r.as_str()))
        .bind(update.first_name.as_deref())
        .bind(update.last_name.as_deref())
        .bind(update.photo.as_deref())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to update identity"))?;

        row.ok_or_else(|| StorefrontError::NotFound(format!("user {id}")))?
            .try_into()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM user_identities WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorefrontError::DatabaseError(format!("Failed to delete identity: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn exists_with_role(&self, role: Role) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_identities WHERE role = $1)",
        )
        .bind(role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorefrontError::DatabaseError(format!("Failed to check roles: {e}")))?;

        Ok(exists)
    }

    async fn set_refresh_slot(&self, id: Uuid, slot: RefreshSlot) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_identities SET
                refresh_token_hash = $2,
                refresh_expires_at = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(slot.token_hash())
        .bind(slot.expires_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorefrontError::DatabaseError(format!("Failed to write refresh slot: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StorefrontError::NotFound(format!("user {id}")));
        }
        Ok(())
    }

    async fn replace_refresh_slot(
        &self,
        id: Uuid,
        expected_hash: Option<&str>,
        slot: RefreshSlot,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE user_identities SET
                refresh_token_hash = $3,
                refresh_expires_at = $4,
                updated_at = NOW()
            WHERE id = $1 AND refresh_token_hash IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(id)
        .bind(expected_hash)
        .bind(slot.token_hash())
        .bind(slot.expires_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorefrontError::DatabaseError(format!("Failed to rotate refresh slot: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StorefrontError::DatabaseError(format!("Health check failed: {e}")))?;
        Ok(())
    }
}
