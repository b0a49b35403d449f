//! Browser-facing relay to the Riot API. The key stays on the server.

use actix_web::{get, http::StatusCode, web, HttpRequest, HttpResponse};

use crate::error::ServiceResult;
use crate::http::auth::JwtAuth;
use crate::riot::ProxyRequest;
use crate::state::AppState;

const PREFIX: &str = "/riot-proxy/";

/// GET /api/riot-proxy/{kind}/{platform}/{ids...}
#[get("/riot-proxy/{tail:.*}")]
pub async fn riot_proxy(
    req: HttpRequest,
    _auth: JwtAuth,
    state: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    state.proxy.credential()?;

    // raw path so encoded separators inside ids survive until decoding per segment
    let tail = req
        .path()
        .split_once(PREFIX)
        .map(|(_, tail)| tail)
        .unwrap_or_default();
    let request = ProxyRequest::parse(tail, req.query_string())?;

    let upstream = state.proxy.forward(&request).await?;
    let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response = HttpResponse::build(status);
    if let Some(content_type) = upstream.content_type {
        response.content_type(content_type);
    }
    Ok(response.body(upstream.body))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(riot_proxy);
}
