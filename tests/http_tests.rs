// tests/http_tests.rs

mod common;

use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use chrono::Utc;
use common::{account, fake_riot, user, MockTransport};
use jsonwebtoken::{encode, EncodingKey, Header};
use rental_server::db::{MemoryStore, Role, Store};
use rental_server::http::{self, auth::Claims};
use rental_server::state::AppState;
use secrecy::SecretString;
use serde_json::{json, Value};
use uuid::Uuid;

const SECRET: &str = "test-jwt-secret";

fn token(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 3_600) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn bearer(user_id: Uuid) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token(user_id)))
}

fn state(store: Arc<MemoryStore>, transport: Arc<MockTransport>) -> web::Data<AppState> {
    let proxy = common::proxy(transport.clone());
    let enricher = Arc::new(common::enricher(transport));
    web::Data::new(
        AppState::new(store, proxy, enricher)
            .with_jwt_secret(Some(SecretString::new(SECRET.to_owned()))),
    )
}

fn setup() -> (Arc<MemoryStore>, Arc<MockTransport>) {
    (
        Arc::new(MemoryStore::new()),
        Arc::new(MockTransport::new(fake_riot(None))),
    )
}

#[actix_rt::test]
async fn requests_without_a_token_are_unauthorized() {
    let (store, transport) = setup();
    let app = test::init_service(
        App::new()
            .app_data(state(store, transport))
            .configure(http::routes::init_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/accounts/available").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn unregistered_users_are_forbidden() {
    let (store, transport) = setup();
    let app = test::init_service(
        App::new()
            .app_data(state(store, transport))
            .configure(http::routes::init_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/stats")
        .insert_header(bearer(Uuid::new_v4()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn rent_and_return_over_http() {
    let (store, transport) = setup();
    let acc = account(None, "Gold 2");
    let id = acc.id;
    store.insert_account(acc).await;
    let renter = user(&store, Role::User).await;
    let app = test::init_service(
        App::new()
            .app_data(state(store.clone(), transport))
            .configure(http::routes::init_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/accounts/rent")
        .insert_header(bearer(renter.id))
        .set_json(json!({ "accountId": id }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["account"]["is_available"], false);
    // the renter sees the login
    assert_eq!(body["account"]["password"], "hunter2");

    let req = test::TestRequest::post()
        .uri("/api/accounts/rent")
        .insert_header(bearer(renter.id))
        .set_json(json!({ "accountId": id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let err: Value = test::read_body_json(resp).await;
    assert!(err["error"].is_string());

    let req = test::TestRequest::post()
        .uri("/api/accounts/return")
        .insert_header(bearer(renter.id))
        .set_json(json!({
            "accountId": id,
            "returnLeague": "Gold 4",
            "returnFlexLeague": "Silver 1",
            "returnSoloLp": 140,
            "returnFlexLp": 10
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/accounts/return")
        .insert_header(bearer(renter.id))
        .set_json(json!({
            "accountId": id,
            "returnLeague": "Gold 4",
            "returnFlexLeague": "Silver 1",
            "returnSoloLp": 40,
            "returnFlexLp": 10
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["account"]["league"], "Gold 4");
    assert!(body["account"].get("password").is_none());

    let stored = store.account_by_id(id).await.unwrap();
    assert!(stored.is_available);
    assert_eq!(stored.solo_lp, Some(40));
}

#[actix_rt::test]
async fn listings_hide_passwords_from_members() {
    let (store, transport) = setup();
    store.insert_account(account(Some("Faker#EUW"), "Gold 2")).await;
    let member = user(&store, Role::User).await;
    let admin = user(&store, Role::Admin).await;
    let app = test::init_service(
        App::new()
            .app_data(state(store, transport))
            .configure(http::routes::init_routes),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/api/accounts/available")
        .insert_header(bearer(member.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let first = &body.as_array().unwrap()[0];
    assert!(first.get("password").is_none());
    // enriched from the upstream ranked entries
    assert_eq!(first["league"], "Platinum 2");
    assert_eq!(first["summoner"]["summoner_level"], 312);

    let req = test::TestRequest::get()
        .uri("/api/accounts")
        .insert_header(bearer(admin.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body[0]["password"], "hunter2");
}

#[actix_rt::test]
async fn admin_routes_reject_members() {
    let (store, transport) = setup();
    let member = user(&store, Role::Vip).await;
    let app = test::init_service(
        App::new()
            .app_data(state(store, transport))
            .configure(http::routes::init_routes),
    )
    .await;

    for req in [
        test::TestRequest::get().uri("/api/accounts"),
        test::TestRequest::get().uri("/api/admin/users"),
        test::TestRequest::delete().uri(&format!("/api/admin/accounts/{}", Uuid::new_v4())),
    ] {
        let resp = test::call_service(&app, req.insert_header(bearer(member.id)).to_request()).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}

#[actix_rt::test]
async fn admin_manages_the_inventory() {
    let (store, transport) = setup();
    let admin = user(&store, Role::Admin).await;
    let renter = user(&store, Role::Vip).await;
    let app = test::init_service(
        App::new()
            .app_data(state(store.clone(), transport))
            .configure(http::routes::init_routes),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/admin/accounts")
        .insert_header(bearer(admin.id))
        .set_json(json!({
            "username": "smurf99",
            "password": "pw",
            "server": "tr",
            "league": "Master"
        }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let id: Uuid = serde_json::from_value(body["account"]["id"].clone()).unwrap();
    assert_eq!(body["account"]["server"], "TR");
    assert_eq!(body["account"]["is_vip_only"], true);

    let req = test::TestRequest::post()
        .uri("/api/accounts/rent")
        .insert_header(bearer(renter.id))
        .set_json(json!({ "accountId": id }))
        .to_request();
    assert!(test::call_service(&app, req).await.status().is_success());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/accounts/{id}"))
        .insert_header(bearer(admin.id))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri("/api/admin/accounts/release")
        .insert_header(bearer(admin.id))
        .set_json(json!({ "accountId": id }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["account"]["is_available"], true);
    assert_eq!(body["account"]["league"], "Master");

    let req = test::TestRequest::get()
        .uri(&format!("/api/accounts/{id}"))
        .insert_header(bearer(admin.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["user_email"], format!("{}@example.com", renter.id));
    assert!(history[0]["league_at_return"].is_null());

    let req = test::TestRequest::delete()
        .uri(&format!("/api/admin/accounts/{id}"))
        .insert_header(bearer(admin.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert!(store.account_by_id(id).await.is_err());
}

#[actix_rt::test]
async fn admin_changes_roles() {
    let (store, transport) = setup();
    let admin = user(&store, Role::Admin).await;
    let member = user(&store, Role::User).await;
    let app = test::init_service(
        App::new()
            .app_data(state(store.clone(), transport))
            .configure(http::routes::init_routes),
    )
    .await;

    let req = test::TestRequest::patch()
        .uri(&format!("/api/admin/users/{}/role", member.id))
        .insert_header(bearer(admin.id))
        .set_json(json!({ "role": "VIP" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["role"], "VIP");
    assert_eq!(store.user_by_id(member.id).await.unwrap().role, Role::Vip);
}

#[actix_rt::test]
async fn proxy_validates_before_calling_upstream() {
    let (store, transport) = setup();
    let member = user(&store, Role::User).await;
    let app = test::init_service(
        App::new()
            .app_data(state(store, transport.clone()))
            .configure(http::routes::init_routes),
    )
    .await;

    for uri in [
        "/api/riot-proxy/identity-lookup/euw1/Faker",
        "/api/riot-proxy/not-a-kind/euw1/x",
    ] {
        let req = test::TestRequest::get()
            .uri(uri)
            .insert_header(bearer(member.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
    assert_eq!(transport.call_count(), 0);

    let req = test::TestRequest::get()
        .uri("/api/riot-proxy/summoner/euw1/puuid-1")
        .insert_header(bearer(member.id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["id"], "sum-puuid-1");
    assert_eq!(transport.call_count(), 1);
}

#[actix_rt::test]
async fn health_and_stats() {
    let (store, transport) = setup();
    store.insert_account(account(None, "Gold 2")).await;
    let member = user(&store, Role::User).await;
    let app = test::init_service(
        App::new()
            .app_data(state(store, transport))
            .configure(http::routes::init_routes),
    )
    .await;

    let req = test::TestRequest::get().uri("/api/healthz").to_request();
    let body = test::call_and_read_body(&app, req).await;
    assert_eq!(body, "ok");

    let req = test::TestRequest::get()
        .uri("/api/stats")
        .insert_header(bearer(member.id))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body,
        json!({ "total_accounts": 1, "available_accounts": 1, "my_accounts": 0 })
    );
}
