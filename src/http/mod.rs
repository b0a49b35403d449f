pub mod accounts;
pub mod admin;
pub mod auth;
pub mod health;
pub mod proxy;
pub mod routes;

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

use crate::enrich::EnrichedAccount;
use crate::rental::CurrentUser;

/// `{accountId}` body shared by rent and release.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountIdRequest {
    pub account_id: Uuid,
}

/// Account as shown to one viewer. The password is only present for admins and the renter.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct AccountView {
    #[serde(flatten)]
    pub account: EnrichedAccount,
    pub password: Option<String>,
    pub renter_email: Option<String>,
}

impl AccountView {
    pub fn for_viewer(account: EnrichedAccount, viewer: &CurrentUser) -> Self {
        let password = (viewer.is_admin() || account.account.is_rented_by(viewer.id))
            .then(|| account.account.password.clone());
        Self {
            account,
            password,
            renter_email: None,
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize)]
struct Success<T: Serialize> {
    success: bool,
    message: &'static str,
    account: Option<T>,
}

/// `{"success": true, "message", "account"}`
pub fn success<T: Serialize>(message: &'static str, account: Option<T>) -> HttpResponse {
    HttpResponse::Ok().json(Success {
        success: true,
        message,
        account,
    })
}
