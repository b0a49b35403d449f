//! Ranked ladder helpers.

/// Ladder from lowest to highest.
pub const LEAGUE_RANKS: [&str; 27] = [
    "Iron 4",
    "Iron 3",
    "Iron 2",
    "Iron 1",
    "Bronze 4",
    "Bronze 3",
    "Bronze 2",
    "Bronze 1",
    "Silver 4",
    "Silver 3",
    "Silver 2",
    "Silver 1",
    "Gold 4",
    "Gold 3",
    "Gold 2",
    "Gold 1",
    "Platinum 4",
    "Platinum 3",
    "Platinum 2",
    "Platinum 1",
    "Diamond 4",
    "Diamond 3",
    "Diamond 2",
    "Diamond 1",
    "Master",
    "Grandmaster",
    "Challenger",
];

/// Highest league regular members may rent without the account being VIP-only.
pub const NORMAL_USER_MAX_LEAGUE: &str = "Diamond 3";

/// Position of `league` on the ladder, `None` for unranked or unknown labels.
pub fn league_rank(league: &str) -> Option<usize> {
    LEAGUE_RANKS.iter().position(|l| *l == league)
}

/// Unknown leagues rank below every known one.
pub fn is_higher_league(league: &str, other: &str) -> bool {
    league_rank(league) > league_rank(other)
}

pub fn requires_vip(league: &str) -> bool {
    is_higher_league(league, NORMAL_USER_MAX_LEAGUE)
}

/// Formats an upstream ranked entry (`"GOLD"`, `"IV"`) as a ladder label (`"Gold 4"`).
pub fn league_label(tier: &str, division: &str) -> String {
    let mut chars = tier.chars();
    let tier = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    };

    if matches!(tier.as_str(), "Master" | "Grandmaster" | "Challenger") {
        return tier;
    }

    let division = match division {
        "I" => "1",
        "II" => "2",
        "III" => "3",
        "IV" => "4",
        other => other,
    };
    format!("{tier} {division}")
}
