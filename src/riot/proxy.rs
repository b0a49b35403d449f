//! Credential-holding relay to the Riot API.
//!
//! A [`ProxyRequest`] names one of a closed set of lookups. It is validated and turned into
//! an upstream URL before any network activity, then forwarded with the server-held key.
//! The upstream status and body are relayed untouched.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use url::Url;

use super::region::region_for;
use super::transport::{Transport, UpstreamResponse};
use crate::error::{ServiceError, ServiceResult};
use crate::metrics;

/// Platform used when a request names none.
pub const DEFAULT_PLATFORM: &str = "euw1";

const JSON: &str = "application/json";

/// Query parameters forwarded to the match-id listing.
const MATCH_LIST_PARAMS: [&str; 6] = ["start", "count", "queue", "type", "startTime", "endTime"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    /// Riot ID (`name`, `tag`) → account with PUUID. Cluster-scoped.
    IdentityLookup,
    /// PUUID → summoner profile. Platform-scoped.
    SummonerLookup,
    /// Summoner id → ranked entries per queue. Platform-scoped.
    RankedStatsLookup,
    /// PUUID → recent match ids, paginated by `start`/`count`. Cluster-scoped.
    MatchIdList,
    /// Match id → match details. Cluster-scoped.
    MatchDetail,
}

impl ProxyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyKind::IdentityLookup => "identity-lookup",
            ProxyKind::SummonerLookup => "summoner-lookup",
            ProxyKind::RankedStatsLookup => "ranked-stats-lookup",
            ProxyKind::MatchIdList => "match-id-list",
            ProxyKind::MatchDetail => "match-detail",
        }
    }

    fn required_params(&self) -> &'static [&'static str] {
        match self {
            ProxyKind::IdentityLookup => &["name", "tag"],
            ProxyKind::SummonerLookup | ProxyKind::MatchIdList => &["playerId"],
            ProxyKind::RankedStatsLookup => &["summonerId"],
            ProxyKind::MatchDetail => &["matchId"],
        }
    }

    fn is_cluster_scoped(&self) -> bool {
        matches!(
            self,
            ProxyKind::IdentityLookup | ProxyKind::MatchIdList | ProxyKind::MatchDetail
        )
    }

    fn api_path(&self) -> &'static [&'static str] {
        match self {
            ProxyKind::IdentityLookup => &["riot", "account", "v1", "accounts", "by-riot-id"],
            ProxyKind::SummonerLookup => &["lol", "summoner", "v4", "summoners", "by-puuid"],
            ProxyKind::RankedStatsLookup => &["lol", "league", "v4", "entries", "by-summoner"],
            ProxyKind::MatchIdList => &["lol", "match", "v5", "matches", "by-puuid"],
            ProxyKind::MatchDetail => &["lol", "match", "v5", "matches"],
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProxyKind {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity-lookup" | "account-by-riotid" => Ok(ProxyKind::IdentityLookup),
            "summoner-lookup" | "summoner" => Ok(ProxyKind::SummonerLookup),
            "ranked-stats-lookup" | "ranked" => Ok(ProxyKind::RankedStatsLookup),
            "match-id-list" | "matches" => Ok(ProxyKind::MatchIdList),
            "match-detail" | "match" => Ok(ProxyKind::MatchDetail),
            _ => Err(ServiceError::validation("invalid path")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub kind: ProxyKind,
    /// Lower-case platform code, or a cluster id passed through as-is.
    pub platform: String,
    /// Decoded path identifiers in kind order; empty strings count as missing.
    pub params: Vec<String>,
    pub query: Vec<(String, String)>,
}

impl ProxyRequest {
    pub fn new(kind: ProxyKind, platform: &str, params: Vec<String>) -> Self {
        Self {
            kind,
            platform: platform.to_lowercase(),
            params,
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_owned(), value.to_string()));
        self
    }

    /// Parses `{kind}/{platform}/{id}...` (segments percent-encoded) plus a raw query string.
    pub fn parse(path: &str, query: &str) -> ServiceResult<Self> {
        let mut segments = path.trim_start_matches('/').split('/');

        let kind: ProxyKind = segments.next().unwrap_or_default().parse()?;
        let platform = match segments.next().map(decode_segment).transpose()? {
            Some(p) if !p.is_empty() => p,
            _ => DEFAULT_PLATFORM.to_owned(),
        };
        let params = segments.map(decode_segment).collect::<ServiceResult<Vec<_>>>()?;
        let query = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .into_owned()
            .collect();

        Ok(Self::new(kind, &platform, params).with_query_pairs(query))
    }

    fn with_query_pairs(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// The required identifiers for this kind, or a validation error naming the first gap.
    ///
    /// `.` and `..` are rejected: URL path normalisation would drop them.
    fn required(&self) -> ServiceResult<Vec<&str>> {
        self.kind
            .required_params()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let value = self
                    .params
                    .get(i)
                    .map(|p| p.trim())
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| ServiceError::validation(format!("missing {name}")))?;
                if value == "." || value == ".." {
                    return Err(ServiceError::validation(format!("invalid {name}")));
                }
                Ok(value)
            })
            .collect()
    }

    /// Builds the upstream URL from `base` (`{host}` is replaced by the region or platform).
    pub fn target_url(&self, base: &str) -> ServiceResult<Url> {
        let params = self.required()?;

        if self.platform.is_empty() || !self.platform.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ServiceError::validation(format!(
                "invalid platform {:?}",
                self.platform
            )));
        }
        let host = if self.kind.is_cluster_scoped() {
            region_for(&self.platform)
        } else {
            self.platform.as_str()
        };

        let mut url = Url::parse(&base.replace("{host}", host))
            .map_err(|e| ServiceError::Configuration(format!("invalid upstream base URL: {e}")))?;
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ServiceError::Configuration("upstream base URL cannot carry a path".into())
            })?;
            path.pop_if_empty()
                .extend(self.kind.api_path())
                .extend(params);
            if self.kind == ProxyKind::MatchIdList {
                path.push("ids");
            }
        }

        if self.kind == ProxyKind::MatchIdList {
            let forwarded: Vec<_> = self
                .query
                .iter()
                .filter(|(k, _)| MATCH_LIST_PARAMS.contains(&k.as_str()))
                .collect();
            if !forwarded.is_empty() {
                url.query_pairs_mut()
                    .extend_pairs(forwarded.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            }
        }

        Ok(url)
    }
}

fn decode_segment(segment: &str) -> ServiceResult<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| ServiceError::validation("path segment is not valid UTF-8"))
}

pub struct UpstreamProxy {
    transport: Arc<dyn Transport>,
    api_key: Option<SecretString>,
    base: String,
}

impl UpstreamProxy {
    pub fn new(transport: Arc<dyn Transport>, api_key: Option<SecretString>, base: &str) -> Self {
        Self {
            transport,
            api_key,
            base: base.to_owned(),
        }
    }

    /// The server-held credential, or a configuration error when none is set.
    pub fn credential(&self) -> ServiceResult<&SecretString> {
        self.api_key
            .as_ref()
            .ok_or_else(|| ServiceError::Configuration("RIOT_API_KEY missing".into()))
    }

    /// Validates `request`, calls upstream and relays the answer.
    ///
    /// A missing credential or an invalid request fails before the transport is touched.
    /// Upstream non-2xx answers are returned as-is, not as errors.
    pub async fn forward(&self, request: &ProxyRequest) -> ServiceResult<UpstreamResponse> {
        let api_key = self.credential()?;
        let url = request.target_url(&self.base)?;
        log::debug!("proxying {} via {}", request.kind, url.host_str().unwrap_or("?"));

        let mut response = self
            .transport
            .get(url, api_key.expose_secret())
            .await
            .map_err(|e| {
                tracing::error!(kind = request.kind.as_str(), error = %e, "upstream call failed");
                metrics::record_upstream(request.kind.as_str(), "error");
                e
            })?;

        metrics::record_upstream(request.kind.as_str(), &response.status.to_string());
        if response.content_type.is_none() {
            response.content_type = Some(JSON.to_owned());
        }
        Ok(response)
    }

    /// Forwards `request` and decodes a successful JSON body.
    pub async fn fetch_json<T: DeserializeOwned>(&self, request: &ProxyRequest) -> ServiceResult<T> {
        let response = self.forward(request).await?;
        if !response.is_success() {
            return Err(ServiceError::Upstream {
                status: response.status,
            });
        }
        serde_json::from_slice(&response.body).map_err(|e| {
            ServiceError::Internal(format!("unexpected {} body: {e}", request.kind))
        })
    }
}
