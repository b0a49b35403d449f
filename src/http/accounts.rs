//! Renter-facing account routes: listings, detail, rent and return.

use std::collections::HashMap;

use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{Account, AccountFilter, Assignment};
use crate::enrich::EnrichedAccount;
use crate::error::ServiceResult;
use crate::http::auth::AdminUser;
use crate::http::{success, AccountIdRequest, AccountView};
use crate::rental::{self, CurrentUser, ReturnStats};
use crate::state::AppState;

//////////////////////////////////////////////////
// Data structs
//////////////////////////////////////////////////

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub account_id: Uuid,
    #[serde(flatten)]
    pub stats: ReturnStats,
}

/// Assignment row with the renter's e-mail, for the admin detail view.
#[derive(Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub user_email: Option<String>,
}

#[derive(Serialize)]
pub struct AccountDetail {
    #[serde(flatten)]
    pub account: AccountView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
}

#[derive(Serialize)]
pub struct AccountSummary {
    pub id: Uuid,
    pub username: String,
    pub server: String,
    pub nickname: Option<String>,
}

#[derive(Serialize)]
pub struct MyAssignment {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub account: Option<AccountSummary>,
}

#[derive(Serialize)]
pub struct Stats {
    pub total_accounts: usize,
    pub available_accounts: usize,
    pub my_accounts: usize,
}

fn views(accounts: Vec<EnrichedAccount>, viewer: &CurrentUser) -> Vec<AccountView> {
    accounts
        .into_iter()
        .map(|a| AccountView::for_viewer(a, viewer))
        .collect()
}

async fn user_emails(state: &AppState) -> ServiceResult<HashMap<Uuid, String>> {
    Ok(state
        .store
        .list_users()
        .await?
        .into_iter()
        .map(|u| (u.id, u.email))
        .collect())
}

//////////////////////////////////////////////////
// Listings
//////////////////////////////////////////////////

/// GET /api/accounts (admin): every account with its renter's e-mail.
#[get("/accounts")]
pub async fn list_all(
    AdminUser(admin): AdminUser,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let accounts = state.store.list_accounts(AccountFilter::default()).await?;
    let emails = user_emails(&state).await?;

    let mut out = views(state.enricher.enrich_all(accounts).await, &admin);
    for view in &mut out {
        view.renter_email = view
            .account
            .account
            .assigned_to
            .and_then(|id| emails.get(&id).cloned());
    }
    Ok(HttpResponse::Ok().json(out))
}

/// GET /api/accounts/available
#[get("/accounts/available")]
pub async fn list_available(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let accounts = state.store.list_accounts(AccountFilter::available()).await?;
    let enriched = state.enricher.enrich_all(accounts).await;
    Ok(HttpResponse::Ok().json(views(enriched, &user)))
}

/// GET /api/accounts/mine
#[get("/accounts/mine")]
pub async fn list_mine(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let accounts = state
        .store
        .list_accounts(AccountFilter::rented_by(user.id))
        .await?;
    let enriched = state.enricher.enrich_all(accounts).await;
    Ok(HttpResponse::Ok().json(views(enriched, &user)))
}

/// GET /api/accounts/{id}: detail with recent matches; admins also get the rental history.
#[get("/accounts/{id}")]
pub async fn detail(
    user: CurrentUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let account = state.store.account_by_id(path.into_inner()).await?;

    let history = if user.is_admin() {
        let emails = user_emails(&state).await?;
        let rows = state.store.assignments_for_account(account.id).await?;
        Some(
            rows.into_iter()
                .map(|assignment| HistoryEntry {
                    user_email: emails.get(&assignment.user_id).cloned(),
                    assignment,
                })
                .collect(),
        )
    } else {
        None
    };

    let enriched = state.enricher.enrich(account, true).await;
    Ok(HttpResponse::Ok().json(AccountDetail {
        account: AccountView::for_viewer(enriched, &user),
        history,
    }))
}

//////////////////////////////////////////////////
// Rent / return
//////////////////////////////////////////////////

/// POST /api/accounts/rent
#[post("/accounts/rent")]
pub async fn rent(
    user: CurrentUser,
    info: web::Json<AccountIdRequest>,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let account = rental::rent(state.store.as_ref(), &user, info.account_id).await?;
    Ok(success("account rented", Some(view(account, &user))))
}

/// POST /api/accounts/return
#[post("/accounts/return")]
pub async fn return_account(
    user: CurrentUser,
    info: web::Json<ReturnRequest>,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let ReturnRequest {
        account_id,
        stats: final_stats,
    } = info.into_inner();
    let account =
        rental::return_account(state.store.as_ref(), &user, account_id, final_stats).await?;
    Ok(success("account returned", Some(view(account, &user))))
}

pub(crate) fn view(account: Account, viewer: &CurrentUser) -> AccountView {
    AccountView::for_viewer(EnrichedAccount::plain(account), viewer)
}

//////////////////////////////////////////////////
// History & stats
//////////////////////////////////////////////////

/// GET /api/assignments/mine
#[get("/assignments/mine")]
pub async fn my_assignments(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let rows = state.store.assignments_for_user(user.id).await?;
    let accounts: HashMap<Uuid, Account> = state
        .store
        .list_accounts(AccountFilter::default())
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let out: Vec<MyAssignment> = rows
        .into_iter()
        .map(|assignment| MyAssignment {
            account: accounts.get(&assignment.account_id).map(|a| AccountSummary {
                id: a.id,
                username: a.username.clone(),
                server: a.server.clone(),
                nickname: a.nickname.clone(),
            }),
            assignment,
        })
        .collect();
    Ok(HttpResponse::Ok().json(out))
}

/// GET /api/stats
#[get("/stats")]
pub async fn stats(user: CurrentUser, state: web::Data<AppState>) -> ServiceResult<HttpResponse> {
    let accounts = state.store.list_accounts(AccountFilter::default()).await?;
    let available = accounts.iter().filter(|a| a.is_available).count();
    let mine = accounts.iter().filter(|a| a.is_rented_by(user.id)).count();

    Ok(HttpResponse::Ok().json(Stats {
        total_accounts: accounts.len(),
        available_accounts: available,
        my_accounts: mine,
    }))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    // literal segments before `{id}`
    cfg.service(list_all)
        .service(list_available)
        .service(list_mine)
        .service(rent)
        .service(return_account)
        .service(detail)
        .service(my_assignments)
        .service(stats);
}
