//! Prometheus metrics & middleware helper.

use actix_web::{get, HttpResponse, Responder};
use actix_web_prom::{PrometheusMetrics, PrometheusMetricsBuilder};
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

/// Global Prometheus handle reused in tests.
pub static METRICS: Lazy<PrometheusMetrics> = Lazy::new(|| {
    PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics") // exposed URL
        .build()
        .expect("metrics builder")
});

/// Proxied upstream calls by kind and relayed status (`error` when unreachable).
pub static UPSTREAM_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "upstream_requests_total",
        "Calls forwarded to the Riot API",
        &["kind", "status"]
    )
    .expect("upstream counter")
});

pub fn record_upstream(kind: &str, status: &str) {
    UPSTREAM_REQUESTS.with_label_values(&[kind, status]).inc();
}

/// GET /api/metrics/upstream
#[get("/metrics/upstream")]
pub async fn upstream_metrics() -> impl Responder {
    Lazy::force(&UPSTREAM_REQUESTS);

    let mut buf = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buf) {
        log::error!("encoding metrics failed: {e}");
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok()
        .content_type(prometheus::TEXT_FORMAT)
        .body(buf)
}
