use crate::{http, metrics};
use actix_web::web;

/// Mount every HTTP sub-module under `/api`.
pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(http::health::init_routes)
            .configure(http::proxy::init_routes)
            .configure(http::accounts::init_routes)
            .configure(http::admin::init_routes)
            .service(metrics::upstream_metrics),
    );
}
