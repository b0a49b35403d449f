// tests/common/mod.rs
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rental_server::db::{Account, MemoryStore, NewUser, Role, Store};
use rental_server::enrich::Enricher;
use rental_server::error::ServiceError;
use rental_server::rental::CurrentUser;
use rental_server::riot::{Transport, UpstreamProxy, UpstreamResponse};
use secrecy::SecretString;
use serde_json::{json, Value};
use url::Url;
use uuid::Uuid;

pub const API_KEY: &str = "RGAPI-test-key";
pub const BASE: &str = "https://{host}.api.test";

type Responder = Box<dyn Fn(&Url) -> UpstreamResponse + Send + Sync>;

/// Records every outbound call and answers from a closure.
pub struct MockTransport {
    responder: Responder,
    delay: Duration,
    pub calls: AtomicUsize,
    pub urls: Mutex<Vec<Url>>,
    pub keys: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub fn new(responder: impl Fn(&Url) -> UpstreamResponse + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            urls: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<Url> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: Url, api_key: &str) -> Result<UpstreamResponse, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.clone());
        self.keys.lock().unwrap().push(api_key.to_owned());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = (self.responder)(&url);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(response)
    }
}

pub fn json_response(status: u16, body: Value) -> UpstreamResponse {
    UpstreamResponse {
        status,
        content_type: Some("application/json;charset=utf-8".into()),
        body: serde_json::to_vec(&body).unwrap(),
    }
}

/// Decoded path segments of an upstream URL.
fn segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|s| {
            s.map(|seg| {
                percent_encoding::percent_decode_str(seg)
                    .decode_utf8_lossy()
                    .into_owned()
            })
            .collect()
        })
        .unwrap_or_default()
}

/// A small fake of the Riot API. Ranked lookups for summoners of `failing_name` answer 503.
pub fn fake_riot(
    failing_name: Option<&'static str>,
) -> impl Fn(&Url) -> UpstreamResponse + Send + Sync + 'static {
    move |url: &Url| {
        let seg = segments(url);
        let seg: Vec<&str> = seg.iter().map(String::as_str).collect();
        match seg.as_slice() {
            ["riot", "account", "v1", "accounts", "by-riot-id", name, tag] => json_response(
                200,
                json!({ "puuid": format!("puuid-{name}"), "gameName": name, "tagLine": tag }),
            ),
            ["lol", "summoner", "v4", "summoners", "by-puuid", puuid] => json_response(
                200,
                json!({
                    "id": format!("sum-{puuid}"),
                    "puuid": puuid,
                    "profileIconId": 29,
                    "summonerLevel": 312
                }),
            ),
            ["lol", "league", "v4", "entries", "by-summoner", id] => {
                if failing_name.is_some_and(|n| id.ends_with(&format!("puuid-{n}"))) {
                    return json_response(503, json!({ "status": { "message": "unavailable" } }));
                }
                json_response(
                    200,
                    json!([
                        { "queueType": "RANKED_SOLO_5x5", "tier": "PLATINUM", "rank": "II",
                          "leaguePoints": 61, "wins": 40, "losses": 35 },
                        { "queueType": "RANKED_FLEX_SR", "tier": "GOLD", "rank": "IV",
                          "leaguePoints": 3, "wins": 5, "losses": 9 }
                    ]),
                )
            }
            ["lol", "match", "v5", "matches", "by-puuid", _puuid, "ids"] => {
                json_response(200, json!(["EUW1_100", "EUW1_101"]))
            }
            ["lol", "match", "v5", "matches", match_id] => json_response(
                200,
                json!({
                    "metadata": { "matchId": match_id },
                    "info": {
                        "gameCreation": 1_700_000_000_000_i64,
                        "gameDuration": 1805,
                        "queueId": 420,
                        "gameMode": "CLASSIC",
                        "participants": [
                            { "puuid": "someone-else", "championName": "Ahri", "kills": 1,
                              "deaths": 1, "assists": 1, "totalMinionsKilled": 10, "win": false },
                            { "puuid": "puuid-Faker", "championName": "Azir", "kills": 7,
                              "deaths": 2, "assists": 9, "totalMinionsKilled": 231, "win": true }
                        ]
                    }
                }),
            ),
            _ => json_response(404, json!({ "status": { "message": "not found" } })),
        }
    }
}

pub fn proxy(transport: Arc<MockTransport>) -> Arc<UpstreamProxy> {
    Arc::new(UpstreamProxy::new(
        transport,
        Some(SecretString::new(API_KEY.to_owned())),
        BASE,
    ))
}

pub fn enricher(transport: Arc<MockTransport>) -> Enricher {
    Enricher::new(proxy(transport), 4, 5)
}

pub fn account(nickname: Option<&str>, league: &str) -> Account {
    Account {
        id: Uuid::new_v4(),
        username: "smurf01".into(),
        password: "hunter2".into(),
        server: "EUW".into(),
        nickname: nickname.map(str::to_owned),
        league: league.into(),
        flex_league: None,
        solo_lp: Some(20),
        flex_lp: None,
        is_available: true,
        assigned_to: None,
        notes: None,
        is_vip_only: false,
        created_at: Utc::now(),
    }
}

pub async fn user(store: &MemoryStore, role: Role) -> CurrentUser {
    let id = Uuid::new_v4();
    store
        .create_user(NewUser {
            id,
            email: format!("{id}@example.com"),
            role,
        })
        .await
        .unwrap();
    CurrentUser { id, role }
}
