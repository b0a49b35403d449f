//! Rental lifecycle of a single account: `Available → Rented → Available`.
//!
//! Each operation validates against the stored account, then hands a [`Transition`] to
//! [`Store::apply`], which performs the account write and the assignment write as one unit.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{Account, LeagueSnapshot, Role, Store, StoreError};
use crate::error::{ServiceError, ServiceResult};

/// Highest LP value accepted on return.
pub const MAX_LP: i32 = 100;

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The paired writes of one state change.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Mark the account rented by `user_id` and open an assignment carrying `initial`.
    Rent {
        account_id: Uuid,
        user_id: Uuid,
        initial: LeagueSnapshot,
        at: DateTime<Utc>,
    },
    /// Free the account, overwrite its league data with `stats` and close the renter's
    /// open assignment with the same values.
    Return {
        account_id: Uuid,
        user_id: Uuid,
        stats: LeagueSnapshot,
        at: DateTime<Utc>,
    },
    /// Free the account without touching league data; the assignment closes with
    /// null return stats.
    Release {
        account_id: Uuid,
        renter: Uuid,
        at: DateTime<Utc>,
    },
}

impl Transition {
    pub fn account_id(&self) -> Uuid {
        match self {
            Transition::Rent { account_id, .. }
            | Transition::Return { account_id, .. }
            | Transition::Release { account_id, .. } => *account_id,
        }
    }
}

/// Final stats submitted by the renter.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnStats {
    pub return_league: String,
    pub return_flex_league: String,
    pub return_solo_lp: i32,
    pub return_flex_lp: i32,
}

impl ReturnStats {
    fn validate(self) -> ServiceResult<LeagueSnapshot> {
        let league = self.return_league.trim();
        let flex_league = self.return_flex_league.trim();
        if league.is_empty() || flex_league.is_empty() {
            return Err(ServiceError::validation("final solo and flex leagues are required"));
        }
        for lp in [self.return_solo_lp, self.return_flex_lp] {
            if !(0..=MAX_LP).contains(&lp) {
                return Err(ServiceError::validation(format!(
                    "LP must be between 0 and {MAX_LP}"
                )));
            }
        }
        Ok(LeagueSnapshot {
            league: league.to_owned(),
            flex_league: flex_league.to_owned(),
            solo_lp: self.return_solo_lp,
            flex_lp: self.return_flex_lp,
        })
    }
}

async fn load_account(store: &dyn Store, account_id: Uuid) -> ServiceResult<Account> {
    store.account_by_id(account_id).await.map_err(|e| {
        log::warn!("account lookup failed for {account_id}: {e}");
        ServiceError::from(e)
    })
}

/// Rents `account_id` to `actor`.
///
/// VIP-only accounts require the literal VIP role; admins are not implicitly eligible.
pub async fn rent(store: &dyn Store, actor: &CurrentUser, account_id: Uuid) -> ServiceResult<Account> {
    let account = load_account(store, account_id).await?;

    if !account.is_available {
        return Err(ServiceError::precondition("account is already rented"));
    }
    if account.is_vip_only && actor.role != Role::Vip {
        return Err(ServiceError::forbidden("a VIP membership is required to rent this account"));
    }

    let account = store
        .apply(Transition::Rent {
            account_id,
            user_id: actor.id,
            initial: LeagueSnapshot::of(&account),
            at: Utc::now(),
        })
        .await?;

    log::info!("account {account_id} rented by {}", actor.id);
    Ok(account)
}

/// Returns `account_id` on behalf of its current renter, recording the final stats.
pub async fn return_account(
    store: &dyn Store,
    actor: &CurrentUser,
    account_id: Uuid,
    stats: ReturnStats,
) -> ServiceResult<Account> {
    let stats = stats.validate()?;
    let account = load_account(store, account_id).await?;

    if account.is_available {
        return Err(ServiceError::precondition("account is not rented"));
    }
    if account.assigned_to != Some(actor.id) {
        return Err(ServiceError::forbidden("account is not rented by you"));
    }

    let account = store
        .apply(Transition::Return {
            account_id,
            user_id: actor.id,
            stats,
            at: Utc::now(),
        })
        .await
        .map_err(|e| {
            if let StoreError::Inconsistent(msg) = &e {
                log::error!("return of {account_id} by {} rolled back: {msg}", actor.id);
            }
            ServiceError::from(e)
        })?;

    log::info!("account {account_id} returned by {}", actor.id);
    Ok(account)
}

/// Frees a rented account without final stats. Callers must have checked admin rights.
pub async fn release(store: &dyn Store, account_id: Uuid) -> ServiceResult<Account> {
    let account = load_account(store, account_id).await?;

    if account.is_available {
        return Err(ServiceError::precondition("account is already available"));
    }
    let renter = account.assigned_to.ok_or_else(|| {
        ServiceError::Consistency(format!("account {account_id} is rented but has no renter"))
    })?;

    let account = store
        .apply(Transition::Release {
            account_id,
            renter,
            at: Utc::now(),
        })
        .await?;

    log::info!("account {account_id} released from {renter}");
    Ok(account)
}

/// Deletes an available account together with its rental history.
pub async fn delete(store: &dyn Store, account_id: Uuid) -> ServiceResult<()> {
    let account = load_account(store, account_id).await?;

    if !account.is_available {
        return Err(ServiceError::precondition(
            "account is currently rented and must be returned first",
        ));
    }

    store.delete_account(account_id).await?;
    log::info!("account {account_id} deleted");
    Ok(())
}
