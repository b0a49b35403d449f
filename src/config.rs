//! Runtime configuration for the rental server.

use once_cell::sync::Lazy;
use secrecy::SecretString;
use std::env;
use std::time::Duration;

/// Upstream host template used when `RIOT_API_BASE` is unset.
pub const DEFAULT_RIOT_API_BASE: &str = "https://{host}.api.riotgames.com";

#[derive(Debug)]
pub struct Settings {
    /// Postgres DSN. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Postgres pool size.
    pub db_max_connections: u32,
    /// HTTP bind address.
    pub server_addr: String,
    /// Server-held Riot API credential.
    pub riot_api_key: Option<SecretString>,
    /// Upstream URL template; `{host}` is replaced by a region or platform code.
    pub riot_api_base: String,
    /// Timeout for a single upstream call.
    pub upstream_timeout: Duration,
    /// Accounts enriched concurrently in list views.
    pub enrich_concurrency: usize,
    /// Match ids fetched for the account detail view.
    pub match_history_count: u32,
    /// HS256 secret for session tokens issued by the auth provider.
    pub jwt_secret: Option<SecretString>,
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn secret(name: &str) -> Option<SecretString> {
    env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(SecretString::new)
}

impl Settings {
    pub fn from_env() -> Self {
        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".into());
        let riot_api_base =
            env::var("RIOT_API_BASE").unwrap_or_else(|_| DEFAULT_RIOT_API_BASE.into());

        Settings {
            database_url,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 5),
            server_addr,
            riot_api_key: secret("RIOT_API_KEY"),
            riot_api_base,
            upstream_timeout: Duration::from_secs(parsed("UPSTREAM_TIMEOUT_SECS", 10)),
            // a zero limit would stall every list view
            enrich_concurrency: parsed("ENRICH_CONCURRENCY", 4).max(1),
            match_history_count: parsed("MATCH_HISTORY_COUNT", 5),
            jwt_secret: secret("JWT_SECRET"),
        }
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}
