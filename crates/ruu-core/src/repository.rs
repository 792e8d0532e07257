//! Repository traits and the PostgreSQL store
//!
//! All reads are scoped to rows whose `deleted_at` is NULL unless a method
//! says otherwise. Deletes are soft: they stamp `deleted_at`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Postgres, QueryBuilder};
use std::time::Duration;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::models::{
    Client, ClientChanges, Feature, NewClient, NewFeature, NewProperty, NewUser, Property, User,
};
use crate::query::{Listable, PaginationMeta, ResolvedQuery};
use crate::{Result, RuuError};

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub const CLIENT_NOT_FOUND: &str = "client not found";
pub const USER_NOT_FOUND: &str = "user not found";

/// User persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user after checking email and phone against every row,
    /// soft-deleted ones included
    async fn create(&self, user: NewUser) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    async fn list(&self, query: &ResolvedQuery) -> Result<(Vec<User>, PaginationMeta)>;
}

/// Client persistence
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(&self, client: NewClient) -> Result<Client>;

    /// Fails with `NotFound` for unknown or deleted ids
    async fn get(&self, id: Uuid) -> Result<Client>;

    async fn list(&self, query: &ResolvedQuery) -> Result<(Vec<Client>, PaginationMeta)>;

    async fn update(&self, id: Uuid, changes: ClientChanges) -> Result<Client>;

    /// Soft delete
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait FeatureRepository: Send + Sync {
    async fn create(&self, feature: NewFeature) -> Result<Feature>;
}

#[async_trait]
pub trait PropertyRepository: Send + Sync {
    async fn create(&self, property: NewProperty) -> Result<Property>;

    async fn list(&self, query: &ResolvedQuery) -> Result<(Vec<Property>, PaginationMeta)>;
}

/// PostgreSQL-backed store implementing every repository trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a connection pool sized from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.postgres_url)
            .await
            .map_err(|e| RuuError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        tracing::info!(pool_size = config.pool_size, "Connected to PostgreSQL");
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

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RuuError::DatabaseError(format!("Migration failed: {e}")))
    }

    /// Count and fetch one page of live rows from `table`
    async fn fetch_page<T>(
        &self,
        table: &str,
        columns: &str,
        query: &ResolvedQuery,
    ) -> Result<(Vec<T>, i64)>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut count: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT COUNT(*) FROM {table} WHERE deleted_at IS NULL"
        ));
        query.push_search(&mut count);

        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RuuError::DatabaseError(format!("Failed to count {table}: {e}")))?;

        let mut select: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {columns} FROM {table} WHERE deleted_at IS NULL"
        ));
        query.push_search(&mut select);
        query.push_order_and_page(&mut select);

        let rows = select
            .build_query_as::<T>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RuuError::DatabaseError(format!("Failed to list {table}: {e}")))?;

        tracing::debug!(table, total, returned = rows.len(), "Fetched page");
        Ok((rows, total))
    }
}

/// Map a write failure, turning unique violations into `Conflict`
fn write_error(err: sqlx::Error, action: &str, conflict: &str) -> RuuError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            tracing::debug!(constraint = ?db.constraint(), "Unique violation on {action}");
            return RuuError::Conflict(conflict.to_string());
        }
    }
    RuuError::DatabaseError(format!("Failed to {action}: {err}"))
}

const USER_COLUMNS: &str =
    "uuid, email, password_hash, name, phone_number, image, role, created_at, updated_at";
const CLIENT_COLUMNS: &str =
    "uuid, name, email, phone_number, address, contact_person, created_at, updated_at";
const PROPERTY_COLUMNS: &str = "uuid, name, description, created_at, updated_at";

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    uuid: Uuid,
    email: String,
    password_hash: String,
    name: String,
    phone_number: String,
    image: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            uuid: row.uuid,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            phone_number: row.phone_number,
            image: row.image,
            role: row.role.parse().unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RuuError::DatabaseError(format!("Failed to begin transaction: {e}")))?;

        let email_taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT uuid FROM users WHERE email = $1 LIMIT 1")
                .bind(&user.email)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| RuuError::DatabaseError(format!("Failed to check email: {e}")))?;
        if email_taken.is_some() {
            return Err(RuuError::Conflict("Email already registered".to_string()));
        }

        let phone_taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT uuid FROM users WHERE phone_number = $1 LIMIT 1")
                .bind(&user.phone_number)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| RuuError::DatabaseError(format!("Failed to check phone number: {e}")))?;
        if phone_taken.is_some() {
            return Err(RuuError::Conflict(
                "Phone number already registered".to_string(),
            ));
        }

        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (email, password_hash, name, phone_number, image, role)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone_number)
        .bind(&user.image)
        .bind(user.role.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| write_error(e, "create user", "Email or phone number already registered"))?;

        tx.commit()
            .await
            .map_err(|e| RuuError::DatabaseError(format!("Failed to commit user: {e}")))?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RuuError::DatabaseError(format!("Failed to get user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE uuid = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RuuError::DatabaseError(format!("Failed to get user: {e}")))?;

        Ok(row.map(User::from))
    }

    async fn list(&self, query: &ResolvedQuery) -> Result<(Vec<User>, PaginationMeta)> {
        let (rows, total) = self
            .fetch_page::<UserRow>(User::TABLE, USER_COLUMNS, query)
            .await?;

        Ok((rows.into_iter().map(User::from).collect(), query.meta(total)))
    }
}

#[async_trait]
impl ClientRepository for PgStore {
    async fn create(&self, client: NewClient) -> Result<Client> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO clients (name, email, phone_number, address, contact_person)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone_number)
        .bind(&client.address)
        .bind(&client.contact_person)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                "create client",
                "Client with this email or phone number already exists",
            )
        })
    }

    async fn get(&self, id: Uuid) -> Result<Client> {
        let client: Option<Client> = sqlx::query_as(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE uuid = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RuuError::DatabaseError(format!("Failed to get client: {e}")))?;

        client.ok_or_else(|| RuuError::NotFound(CLIENT_NOT_FOUND.to_string()))
    }

    async fn list(&self, query: &ResolvedQuery) -> Result<(Vec<Client>, PaginationMeta)> {
        let (clients, total) = self
            .fetch_page::<Client>(Client::TABLE, CLIENT_COLUMNS, query)
            .await?;

        Ok((clients, query.meta(total)))
    }

    async fn update(&self, id: Uuid, changes: ClientChanges) -> Result<Client> {
        let client: Option<Client> = sqlx::query_as(&format!(
            r#"
            UPDATE clients SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone_number = COALESCE($4, phone_number),
                address = COALESCE($5, address),
                contact_person = COALESCE($6, contact_person),
                updated_at = NOW()
            WHERE uuid = $1 AND deleted_at IS NULL
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone_number)
        .bind(&changes.address)
        .bind(&changes.contact_person)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            write_error(
                e,
                "update client",
                "Client with this email or phone number already exists",
            )
        })?;

        client.ok_or_else(|| RuuError::NotFound(CLIENT_NOT_FOUND.to_string()))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE clients SET deleted_at = NOW() WHERE uuid = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| RuuError::DatabaseError(format!("Failed to delete client: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(RuuError::NotFound(CLIENT_NOT_FOUND.to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl FeatureRepository for PgStore {
    async fn create(&self, feature: NewFeature) -> Result<Feature> {
        sqlx::query_as(
            r#"
            INSERT INTO features (name, description)
            VALUES ($1, $2)
            RETURNING uuid, name, description, created_at, updated_at
            "#,
        )
        .bind(&feature.name)
        .bind(&feature.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RuuError::DatabaseError(format!("Failed to create feature: {e}")))
    }
}

#[async_trait]
impl PropertyRepository for PgStore {
    async fn create(&self, property: NewProperty) -> Result<Property> {
        sqlx::query_as(&format!(
            r#"
            INSERT INTO properties (name, description)
            VALUES ($1, $2)
            RETURNING {PROPERTY_COLUMNS}
            "#
        ))
        .bind(&property.name)
        .bind(&property.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RuuError::DatabaseError(format!("Failed to create property: {e}")))
    }

    async fn list(&self, query: &ResolvedQuery) -> Result<(Vec<Property>, PaginationMeta)> {
        let (properties, total) = self
            .fetch_page::<Property>(Property::TABLE, PROPERTY_COLUMNS, query)
            .await?;

        Ok((properties, query.meta(total)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::ListQuery;

    async fn store() -> PgStore {
        let config = DatabaseConfig::default();
        let store = PgStore::connect(&config).await.expect("database");
        store.migrate().await.expect("migrations");
        store
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn test_client_crud_round() {
        let store = store().await;
        let email = format!("{}@pg-test.local", Uuid::new_v4());

        let created = ClientRepository::create(
            &store,
            NewClient {
                name: "PT. Postgres".to_string(),
                email: email.clone(),
                phone_number: format!("+62{}", Uuid::new_v4().as_u128() % 1_000_000_000),
                address: "Jl. Database".to_string(),
                contact_person: "Dewi".to_string(),
            },
        )
        .await
        .unwrap();

        let search = ListQuery {
            search: Some(email.clone()),
            search_by: Some("email".to_string()),
            ..Default::default()
        };
        let (found, meta) = ClientRepository::list(&store, &search.resolve::<Client>())
            .await
            .unwrap();
        assert_eq!(meta.total, 1);
        assert_eq!(found[0].uuid, created.uuid);

        ClientRepository::delete(&store, created.uuid).await.unwrap();
        let err = ClientRepository::get(&store, created.uuid).await.unwrap_err();
        assert!(matches!(err, RuuError::NotFound(_)));
    }
}
