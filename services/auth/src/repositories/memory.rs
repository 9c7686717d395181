//! In-process user store, used for local development and tests

use async_trait::async_trait;
use chrono::Utc;
use common::error::DatabaseResult;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CreateOutcome, UserStore};
use crate::models::{NewUser, Role, User, normalize_email};

/// User store backed by a map
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Overwrite a stored user's role
    pub async fn set_role(&self, id: Uuid, role: Role) -> bool {
        match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.role = role;
                user.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn create_or_conflict(&self, new_user: &NewUser) -> DatabaseResult<CreateOutcome> {
        let email = normalize_email(&new_user.email);
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == email) {
            return Ok(CreateOutcome::Conflict { field: "email" });
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name.trim().to_string(),
            email,
            password_hash: new_user.password_hash.clone(),
            role: Role::User,
            totp_secret: None,
            totp_enabled: false,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(CreateOutcome::Created(user))
    }

    async fn update_totp(
        &self,
        id: Uuid,
        secret: Option<&str>,
        enabled: bool,
    ) -> DatabaseResult<bool> {
        match self.users.write().await.get_mut(&id) {
            Some(user) => {
                user.totp_secret = secret.map(str::to_string);
                user.totp_enabled = enabled;
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
