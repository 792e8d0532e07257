//! In-memory repositories for tests
//!
//! Mirrors the PostgreSQL store: soft deletes, scoped reads, unscoped
//! uniqueness checks on user registration and the same list semantics via
//! [`ResolvedQuery::apply`].

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ClientRepository, FeatureRepository, PropertyRepository, UserRepository, CLIENT_NOT_FOUND,
};
use crate::models::{
    Client, ClientChanges, Feature, NewClient, NewFeature, NewProperty, NewUser, Property, User,
};
use crate::query::{PaginationMeta, ResolvedQuery};
use crate::{Result, RuuError};

#[derive(Debug, Clone)]
struct Stored<T> {
    item: T,
    deleted: bool,
}

impl<T> Stored<T> {
    fn live(item: T) -> Self {
        Self {
            item,
            deleted: false,
        }
    }
}

fn live_items<T: Clone>(rows: &[Stored<T>]) -> Vec<T> {
    rows.iter()
        .filter(|row| !row.deleted)
        .map(|row| row.item.clone())
        .collect()
}

/// In-memory store implementing every repository trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Vec<Stored<User>>>,
    clients: RwLock<Vec<Stored<Client>>>,
    features: RwLock<Vec<Stored<Feature>>>,
    properties: RwLock<Vec<Stored<Property>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Soft-delete a user, keeping the row for unscoped lookups
    pub async fn soft_delete_user(&self, id: Uuid) -> bool {
        let mut users = self.users.write().await;
        match users.iter_mut().find(|row| row.item.uuid == id && !row.deleted) {
            Some(row) => {
                row.deleted = true;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        if users.iter().any(|row| row.item.email == user.email) {
            return Err(RuuError::Conflict("Email already registered".to_string()));
        }
        if users
            .iter()
            .any(|row| row.item.phone_number == user.phone_number)
        {
            return Err(RuuError::Conflict(
                "Phone number already registered".to_string(),
            ));
        }

        let now = Utc::now();
        let created = User {
            uuid: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            name: user.name,
            phone_number: user.phone_number,
            image: user.image,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        users.push(Stored::live(created.clone()));

        Ok(created)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|row| !row.deleted && row.item.email == email)
            .map(|row| row.item.clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|row| !row.deleted && row.item.uuid == id)
            .map(|row| row.item.clone()))
    }

    async fn list(&self, query: &ResolvedQuery) -> Result<(Vec<User>, PaginationMeta)> {
        let users = self.users.read().await;
        Ok(query.apply(live_items(&users)))
    }
}

#[async_trait]
impl ClientRepository for MemoryStore {
    async fn create(&self, client: NewClient) -> Result<Client> {
        let mut clients = self.clients.write().await;

        let duplicate = clients.iter().any(|row| {
            !row.deleted
                && (row.item.email == client.email || row.item.phone_number == client.phone_number)
        });
        if duplicate {
            return Err(RuuError::Conflict(
                "Client with this email or phone number already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let created = Client {
            uuid: Uuid::new_v4(),
            name: client.name,
            email: client.email,
            phone_number: client.phone_number,
            address: client.address,
            contact_person: client.contact_person,
            created_at: now,
            updated_at: now,
        };
        clients.push(Stored::live(created.clone()));

        Ok(created)
    }

    async fn get(&self, id: Uuid) -> Result<Client> {
        let clients = self.clients.read().await;
        clients
            .iter()
            .find(|row| !row.deleted && row.item.uuid == id)
            .map(|row| row.item.clone())
            .ok_or_else(|| RuuError::NotFound(CLIENT_NOT_FOUND.to_string()))
    }

    async fn list(&self, query: &ResolvedQuery) -> Result<(Vec<Client>, PaginationMeta)> {
        let clients = self.clients.read().await;
        Ok(query.apply(live_items(&clients)))
    }

    async fn update(&self, id: Uuid, changes: ClientChanges) -> Result<Client> {
        let mut clients = self.clients.write().await;

        if !clients.iter().any(|row| !row.deleted && row.item.uuid == id) {
            return Err(RuuError::NotFound(CLIENT_NOT_FOUND.to_string()));
        }

        let clash = clients.iter().any(|row| {
            !row.deleted
                && row.item.uuid != id
                && (changes.email.as_deref() == Some(row.item.email.as_str())
                    || changes.phone_number.as_deref() == Some(row.item.phone_number.as_str()))
        });
        if clash {
            return Err(RuuError::Conflict(
                "Client with this email or phone number already exists".to_string(),
            ));
        }

        let row = clients
            .iter_mut()
            .find(|row| !row.deleted && row.item.uuid == id)
            .ok_or_else(|| RuuError::NotFound(CLIENT_NOT_FOUND.to_string()))?;

        changes.apply_to(&mut row.item);
        row.item.updated_at = Utc::now();

        Ok(row.item.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut clients = self.clients.write().await;
        let row = clients
            .iter_mut()
            .find(|row| !row.deleted && row.item.uuid == id)
            .ok_or_else(|| RuuError::NotFound(CLIENT_NOT_FOUND.to_string()))?;

        row.deleted = true;
        Ok(())
    }
}

#[async_trait]
impl FeatureRepository for MemoryStore {
    async fn create(&self, feature: NewFeature) -> Result<Feature> {
        let now = Utc::now();
        let created = Feature {
            uuid: Uuid::new_v4(),
            name: feature.name,
            description: feature.description,
            created_at: now,
            updated_at: now,
        };
        self.features
            .write()
            .await
            .push(Stored::live(created.clone()));

        Ok(created)
    }
}

#[async_trait]
impl PropertyRepository for MemoryStore {
    async fn create(&self, property: NewProperty) -> Result<Property> {
        let now = Utc::now();
        let created = Property {
            uuid: Uuid::new_v4(),
            name: property.name,
            description: property.description,
            created_at: now,
            updated_at: now,
        };
        self.properties
            .write()
            .await
            .push(Stored::live(created.clone()));

        Ok(created)
    }

    async fn list(&self, query: &ResolvedQuery) -> Result<(Vec<Property>, PaginationMeta)> {
        let properties = self.properties.read().await;
        Ok(query.apply(live_items(&properties)))
    }
}
