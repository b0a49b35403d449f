//! Datastore collaborator: accounts, users and rental history.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

mod memory;
pub mod models;
mod pg;

pub use memory::MemoryStore;
pub use models::*;
pub use pg::PgStore;

use crate::rental::Transition;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: Uuid },
    /// A guarded write found the row in an unexpected state.
    #[error("{0}")]
    Conflict(String),
    /// A paired write could not find its counterpart row; nothing was written.
    #[error("{0}")]
    Inconsistent(String),
    #[error(transparent)]
    Internal(sqlx::Error),
}

impl StoreError {
    pub(crate) fn account(id: Uuid) -> Self {
        Self::NotFound {
            resource: "account",
            id,
        }
    }

    pub(crate) fn user(id: Uuid) -> Self {
        Self::NotFound {
            resource: "user",
            id,
        }
    }
}

/// Row filter for account listings. Unset fields match everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccountFilter {
    pub available: Option<bool>,
    pub assigned_to: Option<Uuid>,
}

impl AccountFilter {
    pub fn available() -> Self {
        Self {
            available: Some(true),
            ..Self::default()
        }
    }

    pub fn rented_by(user_id: Uuid) -> Self {
        Self {
            assigned_to: Some(user_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, account: &Account) -> bool {
        self.available.map_or(true, |a| account.is_available == a)
            && self
                .assigned_to
                .map_or(true, |u| account.assigned_to == Some(u))
    }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub server: String,
    pub nickname: Option<String>,
    pub league: String,
    pub flex_league: Option<String>,
    pub solo_lp: Option<i32>,
    pub flex_lp: Option<i32>,
    pub notes: Option<String>,
    pub is_vip_only: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    /// Identity id issued by the auth provider.
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Everything the service needs from persistence.
///
/// Listings are ordered newest first (`created_at` / `assigned_at` descending).
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<()>;

    async fn account_by_id(&self, account_id: Uuid) -> Result<Account>;
    async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<Account>>;
    async fn create_account(&self, new_account: NewAccount) -> Result<Account>;
    /// Purges the account's history then the account, only while it is available.
    async fn delete_account(&self, account_id: Uuid) -> Result<()>;

    async fn user_by_id(&self, user_id: Uuid) -> Result<User>;
    async fn list_users(&self) -> Result<Vec<User>>;
    async fn create_user(&self, new_user: NewUser) -> Result<User>;
    async fn set_user_role(&self, user_id: Uuid, role: Role) -> Result<User>;
    /// Purges the user's history then the user, only while they rent nothing.
    async fn delete_user(&self, user_id: Uuid) -> Result<()>;

    async fn assignments_for_account(&self, account_id: Uuid) -> Result<Vec<Assignment>>;
    async fn assignments_for_user(&self, user_id: Uuid) -> Result<Vec<Assignment>>;

    /// Performs the account write and the assignment write of `transition` as one unit.
    ///
    /// Returns the account as stored afterwards. A guard mismatch yields
    /// [`StoreError::Conflict`], a missing open assignment on return yields
    /// [`StoreError::Inconsistent`]; in both cases nothing is written.
    async fn apply(&self, transition: Transition) -> Result<Account>;
}
