use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Flex league recorded when an account has none.
pub const UNRANKED: &str = "Unranked";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
    Vip,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
            Role::Vip => "VIP",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            "VIP" => Ok(Role::Vip),
            other => Err(format!("unknown role {other:?}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A rentable game login.
///
/// `assigned_to` is set exactly when `is_available` is false.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Server code as entered by admins (`TR`, `EUW`, ...).
    pub server: String,
    /// Linked Riot ID, `name#tag`.
    pub nickname: Option<String>,
    pub league: String,
    pub flex_league: Option<String>,
    pub solo_lp: Option<i32>,
    pub flex_lp: Option<i32>,
    pub is_available: bool,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub is_vip_only: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn is_rented_by(&self, user_id: Uuid) -> bool {
        !self.is_available && self.assigned_to == Some(user_id)
    }
}

/// One rental episode.
///
/// `returned_at` is null while the rental is open. The `*_at_return` columns stay null
/// when an admin released the account instead of the renter returning it.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub account_id: Uuid,
    pub assigned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub initial_league: Option<String>,
    pub initial_flex_league: Option<String>,
    pub initial_solo_lp: Option<i32>,
    pub initial_flex_lp: Option<i32>,
    pub league_at_return: Option<String>,
    pub flex_league_at_return: Option<String>,
    pub solo_lp_at_return: Option<i32>,
    pub flex_lp_at_return: Option<i32>,
}

impl Assignment {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }
}

/// Ranked state of both queues at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    pub league: String,
    pub flex_league: String,
    pub solo_lp: i32,
    pub flex_lp: i32,
}

impl LeagueSnapshot {
    /// Captures the stored league data of `account`, defaulting missing flex/LP values.
    pub fn of(account: &Account) -> Self {
        LeagueSnapshot {
            league: account.league.clone(),
            flex_league: account
                .flex_league
                .clone()
                .unwrap_or_else(|| UNRANKED.to_owned()),
            solo_lp: account.solo_lp.unwrap_or(0),
            flex_lp: account.flex_lp.unwrap_or(0),
        }
    }
}
