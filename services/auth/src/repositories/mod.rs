//! Persistence interface for user accounts

pub mod memory;
pub mod user;

use async_trait::async_trait;
use common::error::DatabaseResult;
use uuid::Uuid;

use crate::models::{NewUser, User};

pub use memory::MemoryUserStore;
pub use user::UserRepository;

/// Result of [`UserStore::create_or_conflict`]
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// The account was inserted
    Created(User),
    /// A unique key already exists; `field` names the offending column
    Conflict { field: &'static str },
}

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by email, ignoring case
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>>;

    /// Find a user by ID
    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>>;

    /// Insert a user with role `user`, or report the unique key it collides with
    async fn create_or_conflict(&self, new_user: &NewUser) -> DatabaseResult<CreateOutcome>;

    /// Replace the TOTP secret and enabled flag. Returns false if the user does not exist.
    async fn update_totp(
        &self,
        id: Uuid,
        secret: Option<&str>,
        enabled: bool,
    ) -> DatabaseResult<bool>;
}
