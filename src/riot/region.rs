//! Static routing tables.

/// Platform code → regional cluster serving the account and match APIs.
const PLATFORM_REGIONS: [(&str, &str); 11] = [
    ("na1", "americas"),
    ("br1", "americas"),
    ("la1", "americas"),
    ("la2", "americas"),
    ("euw1", "europe"),
    ("eun1", "europe"),
    ("tr1", "europe"),
    ("ru", "europe"),
    ("kr", "asia"),
    ("jp1", "asia"),
    ("oc1", "sea"),
];

/// Server code used on account records → platform code.
const SERVER_PLATFORMS: [(&str, &str); 11] = [
    ("TR", "tr1"),
    ("EUW", "euw1"),
    ("EUNE", "eun1"),
    ("NA", "na1"),
    ("KR", "kr"),
    ("JP", "jp1"),
    ("BR", "br1"),
    ("LAN", "la1"),
    ("LAS", "la2"),
    ("OCE", "oc1"),
    ("RU", "ru"),
];

/// Regional cluster for a lower-case platform code.
///
/// Unknown input is returned unchanged so that an already-regional value routes to itself;
/// a bad value then fails upstream instead of here.
pub fn region_for(platform: &str) -> &str {
    PLATFORM_REGIONS
        .iter()
        .find(|(p, _)| *p == platform)
        .map_or(platform, |(_, region)| *region)
}

/// Platform for an account's server code (`"EUW"`), also accepting a platform code (`"euw1"`).
pub fn platform_for_server(server: &str) -> Option<&'static str> {
    let server = server.trim();
    SERVER_PLATFORMS
        .iter()
        .find(|(s, _)| s.eq_ignore_ascii_case(server))
        .or_else(|| {
            SERVER_PLATFORMS
                .iter()
                .find(|(_, p)| p.eq_ignore_ascii_case(server))
        })
        .map(|(_, platform)| *platform)
}
