//! Simple liveness / readiness probe

use actix_web::{get, web, HttpResponse, Responder};

use crate::state::AppState;

#[get("/healthz")]
pub async fn healthz(state: web::Data<AppState>) -> impl Responder {
    // Check the datastore
    if let Err(e) = state.store.ping().await {
        log::warn!("health check failed: {e}");
        return HttpResponse::ServiceUnavailable().body("db");
    }

    HttpResponse::Ok().body("ok")
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(healthz);
}
