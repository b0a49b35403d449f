//! Subset of the Riot API payloads the service reads. Unknown fields are ignored.

use serde::Deserialize;

pub const RANKED_SOLO_5X5: &str = "RANKED_SOLO_5x5";
pub const RANKED_FLEX_SR: &str = "RANKED_FLEX_SR";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiotAccount {
    pub puuid: String,
    pub game_name: String,
    pub tag_line: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Summoner {
    pub id: String,
    pub puuid: String,
    pub profile_icon_id: i64,
    pub summoner_level: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeagueEntry {
    pub queue_type: String,
    pub tier: String,
    /// Division within the tier (`I`..`IV`).
    pub rank: String,
    pub league_points: i32,
    pub wins: i32,
    pub losses: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Match {
    pub metadata: MatchMetadata,
    pub info: MatchInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchMetadata {
    pub match_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchInfo {
    /// Epoch milliseconds.
    pub game_creation: i64,
    /// Seconds.
    pub game_duration: i64,
    pub queue_id: i32,
    pub game_mode: String,
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Participant {
    pub puuid: String,
    pub champion_name: String,
    pub kills: i32,
    pub deaths: i32,
    pub assists: i32,
    pub total_minions_killed: i32,
    pub win: bool,
}
