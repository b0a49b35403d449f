use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    Account, AccountFilter, Assignment, NewAccount, NewUser, Result, Role, Store, StoreError,
    User,
};
use crate::rental::Transition;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    accounts: Vec<Account>,
    assignments: Vec<Assignment>,
}

impl Tables {
    fn account_mut(&mut self, account_id: Uuid) -> Result<&mut Account> {
        self.accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(|| StoreError::account(account_id))
    }

    fn open_assignment(&mut self, account_id: Uuid, user_id: Uuid) -> Option<&mut Assignment> {
        self.assignments
            .iter_mut()
            .find(|a| a.account_id == account_id && a.user_id == user_id && a.is_open())
    }
}

/// In-process [`Store`] for development without Postgres and for tests.
///
/// Every method holds one lock for its whole duration, so paired writes are atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an account row verbatim, bypassing the rental rules.
    pub async fn insert_account(&self, account: Account) {
        self.tables.lock().await.accounts.push(account);
    }

    /// Inserts an assignment row verbatim.
    pub async fn insert_assignment(&self, assignment: Assignment) {
        self.tables.lock().await.assignments.push(assignment);
    }

    pub async fn all_assignments(&self) -> Vec<Assignment> {
        self.tables.lock().await.assignments.clone()
    }
}

fn newest_first<T>(mut rows: Vec<T>, key: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    rows.sort_by_key(|r| std::cmp::Reverse(key(r)));
    rows
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn account_by_id(&self, account_id: Uuid) -> Result<Account> {
        let tables = self.tables.lock().await;
        tables
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .cloned()
            .ok_or_else(|| StoreError::account(account_id))
    }

    async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<Account>> {
        let tables = self.tables.lock().await;
        let rows: Vec<Account> = tables
            .accounts
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        Ok(newest_first(rows, |a| a.created_at))
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<Account> {
        let account = Account {
            id: Uuid::new_v4(),
            username: new_account.username,
            password: new_account.password,
            server: new_account.server,
            nickname: new_account.nickname,
            league: new_account.league,
            flex_league: new_account.flex_league,
            solo_lp: new_account.solo_lp,
            flex_lp: new_account.flex_lp,
            is_available: true,
            assigned_to: None,
            notes: new_account.notes,
            is_vip_only: new_account.is_vip_only,
            created_at: Utc::now(),
        };
        self.tables.lock().await.accounts.push(account.clone());
        Ok(account)
    }

    async fn delete_account(&self, account_id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if !tables.account_mut(account_id)?.is_available {
            return Err(StoreError::Conflict(
                "account is currently rented and must be returned first".into(),
            ));
        }
        tables.assignments.retain(|a| a.account_id != account_id);
        tables.accounts.retain(|a| a.id != account_id);
        Ok(())
    }

    async fn user_by_id(&self, user_id: Uuid) -> Result<User> {
        let tables = self.tables.lock().await;
        tables
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::user(user_id))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = self.tables.lock().await.users.clone();
        Ok(newest_first(rows, |u| u.created_at))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .iter()
            .any(|u| u.id == new_user.id || u.email == new_user.email)
        {
            return Err(StoreError::Conflict(format!(
                "user {} already exists",
                new_user.email
            )));
        }
        let user = User {
            id: new_user.id,
            email: new_user.email,
            role: new_user.role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> Result<User> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| StoreError::user(user_id))?;
        user.role = role;
        Ok(user.clone())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if !tables.users.iter().any(|u| u.id == user_id) {
            return Err(StoreError::user(user_id));
        }
        if tables.accounts.iter().any(|a| a.assigned_to == Some(user_id)) {
            return Err(StoreError::Conflict(
                "user still rents accounts; return them first".into(),
            ));
        }
        tables.assignments.retain(|a| a.user_id != user_id);
        tables.users.retain(|u| u.id != user_id);
        Ok(())
    }

    async fn assignments_for_account(&self, account_id: Uuid) -> Result<Vec<Assignment>> {
        let tables = self.tables.lock().await;
        let rows: Vec<Assignment> = tables
            .assignments
            .iter()
            .filter(|a| a.account_id == account_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |a| a.assigned_at))
    }

    async fn assignments_for_user(&self, user_id: Uuid) -> Result<Vec<Assignment>> {
        let tables = self.tables.lock().await;
        let rows: Vec<Assignment> = tables
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |a| a.assigned_at))
    }

    async fn apply(&self, transition: Transition) -> Result<Account> {
        let mut tables = self.tables.lock().await;

        // Check every guard before the first write so a failure leaves no trace.
        match &transition {
            Transition::Rent {
                account_id,
                user_id,
                initial,
                at,
            } => {
                if !tables.account_mut(*account_id)?.is_available {
                    return Err(StoreError::Conflict("account is already rented".into()));
                }
                if tables
                    .assignments
                    .iter()
                    .any(|a| a.account_id == *account_id && a.is_open())
                {
                    return Err(StoreError::Conflict(
                        "account already has an open assignment".into(),
                    ));
                }

                let account = tables.account_mut(*account_id)?;
                account.is_available = false;
                account.assigned_to = Some(*user_id);
                tables.assignments.push(Assignment {
                    id: Uuid::new_v4(),
                    user_id: *user_id,
                    account_id: *account_id,
                    assigned_at: *at,
                    returned_at: None,
                    initial_league: Some(initial.league.clone()),
                    initial_flex_league: Some(initial.flex_league.clone()),
                    initial_solo_lp: Some(initial.solo_lp),
                    initial_flex_lp: Some(initial.flex_lp),
                    league_at_return: None,
                    flex_league_at_return: None,
                    solo_lp_at_return: None,
                    flex_lp_at_return: None,
                });
            }
            Transition::Return {
                account_id,
                user_id,
                stats,
                at,
            } => {
                if !tables.account_mut(*account_id)?.is_rented_by(*user_id) {
                    return Err(StoreError::Conflict("account is not rented by you".into()));
                }
                let assignment = tables
                    .open_assignment(*account_id, *user_id)
                    .ok_or_else(|| {
                        StoreError::Inconsistent(format!(
                            "no open assignment for account {account_id} and user {user_id}"
                        ))
                    })?;
                assignment.returned_at = Some(*at);
                assignment.league_at_return = Some(stats.league.clone());
                assignment.flex_league_at_return = Some(stats.flex_league.clone());
                assignment.solo_lp_at_return = Some(stats.solo_lp);
                assignment.flex_lp_at_return = Some(stats.flex_lp);

                let account = tables.account_mut(*account_id)?;
                account.is_available = true;
                account.assigned_to = None;
                account.league = stats.league.clone();
                account.flex_league = Some(stats.flex_league.clone());
                account.solo_lp = Some(stats.solo_lp);
                account.flex_lp = Some(stats.flex_lp);
            }
            Transition::Release {
                account_id,
                renter,
                at,
            } => {
                if !tables.account_mut(*account_id)?.is_rented_by(*renter) {
                    return Err(StoreError::Conflict("account is already available".into()));
                }
                match tables.open_assignment(*account_id, *renter) {
                    Some(assignment) => assignment.returned_at = Some(*at),
                    None => log::warn!(
                        "released account {account_id} had no open assignment for {renter}"
                    ),
                }

                let account = tables.account_mut(*account_id)?;
                account.is_available = true;
                account.assigned_to = None;
            }
        }

        Ok(tables.account_mut(transition.account_id())?.clone())
    }
}
