//! Business entities
//!
//! Every entity carries a UUID primary key, creation/update timestamps and a
//! soft-delete marker that lives only in the database (`deleted_at`); rows with
//! the marker set never leave the repository layer except through explicit
//! "unscoped" lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::query::{ColumnValue, Listable};
use crate::RuuError;

/// User role
///
/// A single role flag: `admin` may use the administrative endpoints,
/// everything else is open to `user`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    /// Convert role to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = RuuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            _ => Err(RuuError::validation(format!(
                "Invalid role '{s}'. Allowed values: user, admin"
            ))),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub uuid: Uuid,
    pub email: String,

    /// Argon2id PHC string; never serialized in API responses
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub name: String,
    pub phone_number: String,

    /// Path of the uploaded profile image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Data required to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub phone_number: String,
    pub image: Option<String>,
    pub role: UserRole,
}

/// Client record (a renter or buyer of properties)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Client {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub uuid: Uuid,
    #[schema(example = "PT. Sinar Jaya")]
    pub name: String,
    #[schema(example = "contact@sinarjaya.co.id")]
    pub email: String,
    #[schema(example = "+628123456789")]
    pub phone_number: String,
    #[schema(example = "Jl. Sudirman No. 1, Jakarta")]
    pub address: String,
    #[schema(example = "Budi Santoso")]
    pub contact_person: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to insert a client
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub address: String,
    pub contact_person: String,
}

/// Partial client update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct ClientChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub contact_person: Option<String>,
}

impl ClientChanges {
    /// Overwrite the fields that are set
    pub fn apply_to(&self, client: &mut Client) {
        if let Some(name) = &self.name {
            client.name = name.clone();
        }
        if let Some(email) = &self.email {
            client.email = email.clone();
        }
        if let Some(phone_number) = &self.phone_number {
            client.phone_number = phone_number.clone();
        }
        if let Some(address) = &self.address {
            client.address = address.clone();
        }
        if let Some(contact_person) = &self.contact_person {
            client.contact_person = contact_person.clone();
        }
    }
}

/// Property feature (amenity) such as "swimming pool"
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Feature {
    pub uuid: Uuid,
    #[schema(example = "Swimming pool")]
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeature {
    pub name: String,
    pub description: String,
}

/// Rentable property
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Property {
    pub uuid: Uuid,
    #[schema(example = "Villa Ubud")]
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProperty {
    pub name: String,
    pub description: String,
}

// ============================================================================
// List allow-lists
// ============================================================================

impl Listable for Client {
    const TABLE: &'static str = "clients";
    const SORTABLE: &'static [&'static str] = &["name", "email", "created_at", "updated_at"];
    const SEARCHABLE: &'static [&'static str] =
        &["name", "email", "phone_number", "contact_person"];

    fn key(&self) -> Uuid {
        self.uuid
    }

    fn column_value(&self, column: &str) -> Option<ColumnValue<'_>> {
        match column {
            "name" => Some(ColumnValue::Text(&self.name)),
            "email" => Some(ColumnValue::Text(&self.email)),
            "phone_number" => Some(ColumnValue::Text(&self.phone_number)),
            "contact_person" => Some(ColumnValue::Text(&self.contact_person)),
            "address" => Some(ColumnValue::Text(&self.address)),
            "created_at" => Some(ColumnValue::Timestamp(self.created_at)),
            "updated_at" => Some(ColumnValue::Timestamp(self.updated_at)),
            _ => None,
        }
    }
}

impl Listable for Property {
    const TABLE: &'static str = "properties";
    const SORTABLE: &'static [&'static str] = &["name", "created_at", "updated_at"];
    const SEARCHABLE: &'static [&'static str] = &["name", "description"];

    fn key(&self) -> Uuid {
        self.uuid
    }

    fn column_value(&self, column: &str) -> Option<ColumnValue<'_>> {
        match column {
            "name" => Some(ColumnValue::Text(&self.name)),
            "description" => Some(ColumnValue::Text(&self.description)),
            "created_at" => Some(ColumnValue::Timestamp(self.created_at)),
            "updated_at" => Some(ColumnValue::Timestamp(self.updated_at)),
            _ => None,
        }
    }
}

impl Listable for User {
    const TABLE: &'static str = "users";
    const SORTABLE: &'static [&'static str] = &["name", "email", "created_at", "updated_at"];
    const SEARCHABLE: &'static [&'static str] = &["name", "email", "phone_number"];

    fn key(&self) -> Uuid {
        self.uuid
    }

    fn column_value(&self, column: &str) -> Option<ColumnValue<'_>> {
        match column {
            "name" => Some(ColumnValue::Text(&self.name)),
            "email" => Some(ColumnValue::Text(&self.email)),
            "phone_number" => Some(ColumnValue::Text(&self.phone_number)),
            "created_at" => Some(ColumnValue::Timestamp(self.created_at)),
            "updated_at" => Some(ColumnValue::Timestamp(self.updated_at)),
            _ => None,
        }
    }
}
