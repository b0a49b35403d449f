//! Live ranked data for account views.
//!
//! Enrichment never fails the surrounding read: any upstream error leaves the stored
//! account untouched and is only logged. Results are display-only and never persisted.

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;

use crate::db::Account;
use crate::error::ServiceResult;
use crate::league::league_label;
use crate::riot::region::platform_for_server;
use crate::riot::types::{
    LeagueEntry, Match, RiotAccount, Summoner, RANKED_FLEX_SR, RANKED_SOLO_5X5,
};
use crate::riot::{ProxyKind, ProxyRequest, UpstreamProxy};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummonerProfile {
    pub puuid: String,
    pub summoner_id: String,
    pub profile_icon_id: i64,
    pub summoner_level: i64,
}

/// One match seen from the account's own participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub match_id: String,
    pub champion: String,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    pub cs: i32,
    pub win: bool,
    pub queue_id: i32,
    pub game_mode: String,
    /// Epoch milliseconds.
    pub game_creation: i64,
    /// Seconds.
    pub game_duration: i64,
}

impl MatchSummary {
    fn from_match(m: Match, puuid: &str) -> Option<Self> {
        let me = m.info.participants.into_iter().find(|p| p.puuid == puuid)?;
        Some(Self {
            match_id: m.metadata.match_id,
            champion: me.champion_name,
            kills: me.kills,
            deaths: me.deaths,
            assists: me.assists,
            cs: me.total_minions_killed,
            win: me.win,
            queue_id: m.info.queue_id,
            game_mode: m.info.game_mode,
            game_creation: m.info.game_creation,
            game_duration: m.info.game_duration,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedAccount {
    #[serde(flatten)]
    pub account: Account,
    pub summoner: Option<SummonerProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<Vec<MatchSummary>>,
}

impl EnrichedAccount {
    pub fn plain(account: Account) -> Self {
        Self {
            account,
            summoner: None,
            matches: None,
        }
    }
}

/// Upstream coordinates derived from an account's linked Riot ID.
struct Target<'a> {
    platform: &'static str,
    name: &'a str,
    tag: &'a str,
}

impl<'a> Target<'a> {
    fn of(account: &'a Account) -> Option<Self> {
        let (name, tag) = account.nickname.as_deref()?.split_once('#')?;
        let (name, tag) = (name.trim(), tag.trim().trim_start_matches('#'));
        if name.is_empty() || tag.is_empty() {
            return None;
        }
        Some(Self {
            platform: platform_for_server(&account.server)?,
            name,
            tag,
        })
    }
}

/// Result of the identity → summoner → ranked chain.
struct Ranked {
    profile: SummonerProfile,
    entries: Vec<LeagueEntry>,
}

impl Ranked {
    fn apply_to(self, enriched: &mut EnrichedAccount) {
        let account = &mut enriched.account;
        for entry in &self.entries {
            let label = league_label(&entry.tier, &entry.rank);
            match entry.queue_type.as_str() {
                RANKED_SOLO_5X5 => {
                    account.league = label;
                    account.solo_lp = Some(entry.league_points);
                }
                RANKED_FLEX_SR => {
                    account.flex_league = Some(label);
                    account.flex_lp = Some(entry.league_points);
                }
                _ => {}
            }
        }
        enriched.summoner = Some(self.profile);
    }
}

pub struct Enricher {
    proxy: Arc<UpstreamProxy>,
    concurrency: usize,
    match_count: u32,
}

impl Enricher {
    pub fn new(proxy: Arc<UpstreamProxy>, concurrency: usize, match_count: u32) -> Self {
        Self {
            proxy,
            concurrency: concurrency.max(1),
            match_count,
        }
    }

    /// Enriches one account. `with_matches` adds the recent match history.
    pub async fn enrich(&self, account: Account, with_matches: bool) -> EnrichedAccount {
        let mut enriched = EnrichedAccount::plain(account.clone());
        let Some(target) = Target::of(&account) else {
            return enriched;
        };

        match self.ranked(&target).await {
            Ok(ranked) => ranked.apply_to(&mut enriched),
            Err(e) => {
                log::warn!("ranked enrichment skipped for account {}: {e}", account.id);
                return enriched;
            }
        }

        if with_matches {
            let puuid = enriched
                .summoner
                .as_ref()
                .map(|s| s.puuid.clone())
                .unwrap_or_default();
            match self.matches(target.platform, &puuid).await {
                Ok(matches) => enriched.matches = Some(matches),
                Err(e) => log::warn!("match history skipped for account {}: {e}", account.id),
            }
        }

        enriched
    }

    /// Enriches `accounts` with at most `concurrency` in flight, preserving order.
    pub async fn enrich_all(&self, accounts: Vec<Account>) -> Vec<EnrichedAccount> {
        stream::iter(accounts)
            .map(|account| self.enrich(account, false))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn ranked(&self, target: &Target<'_>) -> ServiceResult<Ranked> {
        let riot: RiotAccount = self
            .proxy
            .fetch_json(&ProxyRequest::new(
                ProxyKind::IdentityLookup,
                target.platform,
                vec![target.name.to_owned(), target.tag.to_owned()],
            ))
            .await?;

        let summoner: Summoner = self
            .proxy
            .fetch_json(&ProxyRequest::new(
                ProxyKind::SummonerLookup,
                target.platform,
                vec![riot.puuid.clone()],
            ))
            .await?;

        let entries: Vec<LeagueEntry> = self
            .proxy
            .fetch_json(&ProxyRequest::new(
                ProxyKind::RankedStatsLookup,
                target.platform,
                vec![summoner.id.clone()],
            ))
            .await?;

        Ok(Ranked {
            profile: SummonerProfile {
                puuid: riot.puuid,
                summoner_id: summoner.id,
                profile_icon_id: summoner.profile_icon_id,
                summoner_level: summoner.summoner_level,
            },
            entries,
        })
    }

    async fn matches(&self, platform: &str, puuid: &str) -> ServiceResult<Vec<MatchSummary>> {
        let ids: Vec<String> = self
            .proxy
            .fetch_json(
                &ProxyRequest::new(ProxyKind::MatchIdList, platform, vec![puuid.to_owned()])
                    .with_query("start", 0)
                    .with_query("count", self.match_count),
            )
            .await?;

        let details: Vec<Match> = stream::iter(ids)
            .map(|id| async move {
                self.proxy
                    .fetch_json::<Match>(&ProxyRequest::new(
                        ProxyKind::MatchDetail,
                        platform,
                        vec![id],
                    ))
                    .await
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(details
            .into_iter()
            .filter_map(|m| MatchSummary::from_match(m, puuid))
            .collect())
    }
}
