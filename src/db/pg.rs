use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use uuid::Uuid;

use super::{
    Account, AccountFilter, Assignment, NewAccount, NewUser, Result, Role, Store, StoreError,
    User,
};
use crate::rental::Transition;

const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                StoreError::Conflict(db_err.message().to_owned())
            }
            e => StoreError::Internal(e),
        }
    }
}

/// Postgres-backed [`Store`]. Paired writes run in one transaction.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects (retrying with backoff while the database comes up) and runs migrations.
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let strategy = ExponentialBackoff::from_millis(200).map(jitter).take(5);
        let pool = Retry::start(strategy, || {
            PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(url)
        })
        .await
        .context("connecting to Postgres")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("running migrations")?;

        Ok(Self::new(pool))
    }

    async fn close_assignment(
        tx: &mut Transaction<'_, Postgres>,
        transition: &Transition,
    ) -> Result<u64> {
        let result = match transition {
            Transition::Return {
                account_id,
                user_id,
                stats,
                at,
            } => {
                sqlx::query(
                    "UPDATE account_assignments
                        SET returned_at           = $3,
                            league_at_return      = $4,
                            flex_league_at_return = $5,
                            solo_lp_at_return     = $6,
                            flex_lp_at_return     = $7
                      WHERE account_id = $1
                        AND user_id    = $2
                        AND returned_at IS NULL",
                )
                .bind(account_id)
                .bind(user_id)
                .bind(at)
                .bind(&stats.league)
                .bind(&stats.flex_league)
                .bind(stats.solo_lp)
                .bind(stats.flex_lp)
                .execute(&mut **tx)
                .await?
            }
            Transition::Release {
                account_id,
                renter,
                at,
            } => {
                sqlx::query(
                    "UPDATE account_assignments
                        SET returned_at = $3
                      WHERE account_id = $1
                        AND user_id    = $2
                        AND returned_at IS NULL",
                )
                .bind(account_id)
                .bind(renter)
                .bind(at)
                .execute(&mut **tx)
                .await?
            }
            Transition::Rent { .. } => return Ok(0),
        };
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn account_by_id(&self, account_id: Uuid) -> Result<Account> {
        sqlx::query_as::<_, Account>("SELECT * FROM game_accounts WHERE id = $1")
            .bind(account_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::account(account_id))
    }

    async fn list_accounts(&self, filter: AccountFilter) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, Account>(
            "SELECT *
               FROM game_accounts
              WHERE ($1::BOOLEAN IS NULL OR is_available = $1)
                AND ($2::UUID    IS NULL OR assigned_to  = $2)
              ORDER BY created_at DESC",
        )
        .bind(filter.available)
        .bind(filter.assigned_to)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_account(&self, new_account: NewAccount) -> Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"INSERT INTO game_accounts
                   (username, password, server, nickname, league, flex_league,
                    solo_lp, flex_lp, notes, is_vip_only, is_available, assigned_to)
               VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10, TRUE, NULL)
               RETURNING *"#,
        )
        .bind(&new_account.username)
        .bind(&new_account.password)
        .bind(&new_account.server)
        .bind(&new_account.nickname)
        .bind(&new_account.league)
        .bind(&new_account.flex_league)
        .bind(new_account.solo_lp)
        .bind(new_account.flex_lp)
        .bind(&new_account.notes)
        .bind(new_account.is_vip_only)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    async fn delete_account(&self, account_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let available: Option<bool> =
            sqlx::query_scalar("SELECT is_available FROM game_accounts WHERE id = $1 FOR UPDATE")
                .bind(account_id)
                .fetch_optional(&mut *tx)
                .await?;
        match available {
            None => return Err(StoreError::account(account_id)),
            Some(false) => {
                return Err(StoreError::Conflict(
                    "account is currently rented and must be returned first".into(),
                ))
            }
            Some(true) => {}
        }

        sqlx::query("DELETE FROM account_assignments WHERE account_id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM game_accounts WHERE id = $1")
            .bind(account_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn user_by_id(&self, user_id: Uuid) -> Result<User> {
        sqlx::query_as::<_, User>("SELECT id, email, role, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::user(user_id))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            "SELECT id, email, role, created_at FROM users ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (id, email, role)
               VALUES ($1, $2, $3)
               RETURNING id, email, role, created_at"#,
        )
        .bind(new_user.id)
        .bind(&new_user.email)
        .bind(new_user.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_user_role(&self, user_id: Uuid, role: Role) -> Result<User> {
        sqlx::query_as::<_, User>(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING id, email, role, created_at",
        )
        .bind(user_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::user(user_id))
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            return Err(StoreError::user(user_id));
        }

        let renting: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM game_accounts WHERE assigned_to = $1)",
        )
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        if renting {
            return Err(StoreError::Conflict(
                "user still rents accounts; return them first".into(),
            ));
        }

        sqlx::query("DELETE FROM account_assignments WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn assignments_for_account(&self, account_id: Uuid) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM account_assignments WHERE account_id = $1 ORDER BY assigned_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn assignments_for_user(&self, user_id: Uuid) -> Result<Vec<Assignment>> {
        let rows = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM account_assignments WHERE user_id = $1 ORDER BY assigned_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn apply(&self, transition: Transition) -> Result<Account> {
        let account_id = transition.account_id();
        // Dropping `tx` on any early return rolls back both writes.
        let mut tx = self.pool.begin().await?;

        let account = match &transition {
            Transition::Rent {
                account_id,
                user_id,
                initial,
                at,
            } => {
                let account = sqlx::query_as::<_, Account>(
                    "UPDATE game_accounts
                        SET is_available = FALSE,
                            assigned_to  = $2
                      WHERE id = $1
                        AND is_available
                  RETURNING *",
                )
                .bind(account_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::Conflict("account is already rented".into()))?;

                sqlx::query(
                    r#"INSERT INTO account_assignments
                           (user_id, account_id, assigned_at, initial_league,
                            initial_flex_league, initial_solo_lp, initial_flex_lp)
                       VALUES ($1,$2,$3,$4,$5,$6,$7)"#,
                )
                .bind(user_id)
                .bind(account_id)
                .bind(at)
                .bind(&initial.league)
                .bind(&initial.flex_league)
                .bind(initial.solo_lp)
                .bind(initial.flex_lp)
                .execute(&mut *tx)
                .await?;

                account
            }
            Transition::Return {
                account_id,
                user_id,
                stats,
                ..
            } => {
                let account = sqlx::query_as::<_, Account>(
                    "UPDATE game_accounts
                        SET is_available = TRUE,
                            assigned_to  = NULL,
                            league       = $3,
                            flex_league  = $4,
                            solo_lp      = $5,
                            flex_lp      = $6
                      WHERE id = $1
                        AND NOT is_available
                        AND assigned_to = $2
                  RETURNING *",
                )
                .bind(account_id)
                .bind(user_id)
                .bind(&stats.league)
                .bind(&stats.flex_league)
                .bind(stats.solo_lp)
                .bind(stats.flex_lp)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::Conflict("account is not rented by you".into()))?;

                if Self::close_assignment(&mut tx, &transition).await? == 0 {
                    return Err(StoreError::Inconsistent(format!(
                        "no open assignment for account {account_id} and user {user_id}"
                    )));
                }

                account
            }
            Transition::Release {
                account_id, renter, ..
            } => {
                let account = sqlx::query_as::<_, Account>(
                    "UPDATE game_accounts
                        SET is_available = TRUE,
                            assigned_to  = NULL
                      WHERE id = $1
                        AND NOT is_available
                        AND assigned_to = $2
                  RETURNING *",
                )
                .bind(account_id)
                .bind(renter)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| StoreError::Conflict("account is already available".into()))?;

                if Self::close_assignment(&mut tx, &transition).await? == 0 {
                    log::warn!("released account {account_id} had no open assignment for {renter}");
                }

                account
            }
        };

        tx.commit().await?;
        log::debug!("applied {transition:?} to {account_id}");
        Ok(account)
    }
}
