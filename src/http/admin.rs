//! Admin screens: account inventory, forced release and user management.

use actix_web::{delete, get, patch, post, web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::{NewAccount, NewUser, Role, UNRANKED};
use crate::error::{ServiceError, ServiceResult};
use crate::http::accounts::view;
use crate::http::auth::AdminUser;
use crate::http::{success, AccountIdRequest};
use crate::league::{league_rank, requires_vip};
use crate::rental::{self, MAX_LP};
use crate::riot::platform_for_server;
use crate::state::AppState;

//////////////////////////////////////////////////
// Data structs
//////////////////////////////////////////////////

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub username: String,
    pub password: String,
    pub server: String,
    pub nickname: Option<String>,
    pub league: Option<String>,
    pub flex_league: Option<String>,
    pub solo_lp: Option<i32>,
    pub flex_lp: Option<i32>,
    pub notes: Option<String>,
    /// Defaults to whether `league` is above the regular members' cap.
    pub is_vip_only: Option<bool>,
}

impl CreateAccountRequest {
    fn validate(self) -> ServiceResult<NewAccount> {
        let username = self.username.trim().to_owned();
        let server = self.server.trim().to_uppercase();
        if username.is_empty() || self.password.is_empty() {
            return Err(ServiceError::validation("username and password are required"));
        }
        if platform_for_server(&server).is_none() {
            return Err(ServiceError::validation(format!("unknown server {server:?}")));
        }

        let league = non_empty(self.league).unwrap_or_else(|| UNRANKED.to_owned());
        let flex_league = non_empty(self.flex_league);
        for l in std::iter::once(&league).chain(flex_league.as_ref()) {
            if l != UNRANKED && league_rank(l).is_none() {
                return Err(ServiceError::validation(format!("unknown league {l:?}")));
            }
        }
        for lp in [self.solo_lp, self.flex_lp].into_iter().flatten() {
            if !(0..=MAX_LP).contains(&lp) {
                return Err(ServiceError::validation(format!(
                    "LP must be between 0 and {MAX_LP}"
                )));
            }
        }

        let is_vip_only = self.is_vip_only.unwrap_or_else(|| requires_vip(&league));
        Ok(NewAccount {
            username,
            password: self.password,
            server,
            nickname: non_empty(self.nickname),
            league,
            flex_league,
            solo_lp: self.solo_lp,
            flex_lp: self.flex_lp,
            notes: non_empty(self.notes),
            is_vip_only,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Identity id issued by the auth provider.
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct RoleRequest {
    pub role: Role,
}

//////////////////////////////////////////////////
// Accounts
//////////////////////////////////////////////////

/// POST /api/admin/accounts
#[post("/admin/accounts")]
pub async fn create_account(
    AdminUser(admin): AdminUser,
    info: web::Json<CreateAccountRequest>,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let new_account = info.into_inner().validate()?;
    let account = state.store.create_account(new_account).await?;
    log::info!("account {} created by {}", account.id, admin.id);
    Ok(success("account created", Some(view(account, &admin))))
}

/// POST /api/admin/accounts/release
#[post("/admin/accounts/release")]
pub async fn release(
    AdminUser(admin): AdminUser,
    info: web::Json<AccountIdRequest>,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let account = rental::release(state.store.as_ref(), info.account_id).await?;
    Ok(success("account released", Some(view(account, &admin))))
}

/// DELETE /api/admin/accounts/{id}
#[delete("/admin/accounts/{id}")]
pub async fn delete_account(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    rental::delete(state.store.as_ref(), path.into_inner()).await?;
    Ok(success::<()>("account deleted", None))
}

//////////////////////////////////////////////////
// Users
//////////////////////////////////////////////////

/// GET /api/admin/users
#[get("/admin/users")]
pub async fn list_users(
    _admin: AdminUser,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.store.list_users().await?))
}

/// POST /api/admin/users: registers the row for an identity the auth provider created.
#[post("/admin/users")]
pub async fn create_user(
    _admin: AdminUser,
    info: web::Json<CreateUserRequest>,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let CreateUserRequest { id, email, role } = info.into_inner();
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(ServiceError::validation("a valid e-mail is required"));
    }

    let user = state.store.create_user(NewUser { id, email, role }).await?;
    Ok(HttpResponse::Created().json(user))
}

/// PATCH /api/admin/users/{id}/role
#[patch("/admin/users/{id}/role")]
pub async fn set_role(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    info: web::Json<RoleRequest>,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user = state
        .store
        .set_user_role(path.into_inner(), info.role)
        .await?;
    log::info!("user {} is now {}", user.id, user.role);
    Ok(HttpResponse::Ok().json(user))
}

/// DELETE /api/admin/users/{id}
#[delete("/admin/users/{id}")]
pub async fn delete_user(
    _admin: AdminUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = path.into_inner();
    state.store.delete_user(user_id).await?;
    log::info!("user {user_id} deleted");
    Ok(success::<()>("user deleted", None))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(create_account)
        .service(release)
        .service(delete_account)
        .service(list_users)
        .service(create_user)
        .service(set_role)
        .service(delete_user);
}
