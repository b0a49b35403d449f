use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use rental_server::{
    config::settings,
    db::{MemoryStore, PgStore, Store},
    enrich::Enricher,
    http, metrics,
    riot::{HttpTransport, UpstreamProxy},
    state::AppState,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cfg = settings();

    // Datastore
    let store: Arc<dyn Store> = match &cfg.database_url {
        Some(url) => Arc::new(PgStore::connect(url, cfg.db_max_connections).await?),
        None => {
            log::warn!("DATABASE_URL not set; using the in-memory store (data is lost on exit)");
            Arc::new(MemoryStore::new())
        }
    };

    // Upstream
    if cfg.riot_api_key.is_none() {
        log::warn!("RIOT_API_KEY not set; proxy requests will fail and enrichment is disabled");
    }
    if cfg.jwt_secret.is_none() {
        log::warn!("JWT_SECRET not set; every authenticated route will fail");
    }
    let transport =
        HttpTransport::new(cfg.upstream_timeout).context("building the upstream client")?;
    let proxy = Arc::new(UpstreamProxy::new(
        Arc::new(transport),
        cfg.riot_api_key.clone(),
        &cfg.riot_api_base,
    ));
    let enricher = Arc::new(Enricher::new(
        proxy.clone(),
        cfg.enrich_concurrency,
        cfg.match_history_count,
    ));

    let state = web::Data::new(
        AppState::new(store, proxy, enricher).with_jwt_secret(cfg.jwt_secret.clone()),
    );

    log::info!("listening on {}", cfg.server_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(metrics::METRICS.clone())
            .app_data(state.clone())
            .configure(http::routes::init_routes)
    })
    .bind(&cfg.server_addr)
    .with_context(|| format!("binding {}", cfg.server_addr))?
    .run()
    .await?;

    Ok(())
}
