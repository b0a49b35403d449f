// tests/enrich_tests.rs

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{account, enricher, fake_riot, MockTransport};
use rental_server::enrich::Enricher;

#[tokio::test]
async fn one_failing_ranked_call_spares_the_rest_of_the_batch() {
    let transport = Arc::new(MockTransport::new(fake_riot(Some("Broken"))));
    let enricher = enricher(transport);

    let names = ["Alpha", "Bravo", "Broken", "Delta", "Echo"];
    let accounts: Vec<_> = names
        .iter()
        .map(|n| account(Some(&format!("{n}#EUW")), "Silver 3"))
        .collect();
    let originals = accounts.clone();

    let enriched = enricher.enrich_all(accounts).await;
    assert_eq!(enriched.len(), 5);

    for (out, original) in enriched.iter().zip(&originals) {
        // order is preserved
        assert_eq!(out.account.id, original.id);

        if original.nickname.as_deref() == Some("Broken#EUW") {
            assert_eq!(out.account, *original);
            assert!(out.summoner.is_none());
        } else {
            assert_eq!(out.account.league, "Platinum 2");
            assert_eq!(out.account.solo_lp, Some(61));
            assert_eq!(out.account.flex_league.as_deref(), Some("Gold 4"));
            assert_eq!(out.account.flex_lp, Some(3));
            let summoner = out.summoner.as_ref().unwrap();
            assert_eq!(summoner.profile_icon_id, 29);
        }
        assert!(out.matches.is_none());
    }
}

#[tokio::test]
async fn accounts_without_a_riot_id_are_left_alone() {
    let transport = Arc::new(MockTransport::new(fake_riot(None)));
    let enricher = enricher(transport.clone());

    let mut unknown_server = account(Some("Faker#KR1"), "Gold 1");
    unknown_server.server = "PBE".into();
    let batch = vec![
        account(None, "Gold 1"),
        account(Some("no-tag"), "Gold 1"),
        account(Some("#"), "Gold 1"),
        unknown_server,
    ];

    let enriched = enricher.enrich_all(batch.clone()).await;
    for (out, original) in enriched.iter().zip(&batch) {
        assert_eq!(out.account, *original);
        assert!(out.summoner.is_none());
    }
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn tag_may_carry_a_leading_hash() {
    let transport = Arc::new(MockTransport::new(fake_riot(None)));
    let enricher = enricher(transport.clone());

    let out = enricher
        .enrich(account(Some("Faker# #EUW"), "Gold 1"), false)
        .await;
    assert!(out.summoner.is_some());
    assert!(transport.urls()[0].path().ends_with("/by-riot-id/Faker/EUW"));
}

#[tokio::test]
async fn detail_view_adds_match_history() {
    let transport = Arc::new(MockTransport::new(fake_riot(None)));
    let enricher = enricher(transport.clone());

    let out = enricher.enrich(account(Some("Faker#EUW"), "Gold 1"), true).await;

    let matches = out.matches.expect("match history");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].match_id, "EUW1_100");
    assert_eq!(matches[0].champion, "Azir");
    assert_eq!((matches[0].kills, matches[0].deaths, matches[0].assists), (7, 2, 9));
    assert_eq!(matches[0].cs, 231);
    assert!(matches[0].win);

    let list = transport
        .urls()
        .into_iter()
        .find(|u| u.path().ends_with("/ids"))
        .unwrap();
    assert_eq!(list.host_str(), Some("europe.api.test"));
    assert_eq!(list.query(), Some("start=0&count=5"));
}

#[tokio::test]
async fn failed_match_history_keeps_ranked_data() {
    let riot = fake_riot(None);
    let transport = Arc::new(MockTransport::new(move |url| {
        if url.path().starts_with("/lol/match/") {
            common::json_response(500, serde_json::json!({}))
        } else {
            riot(url)
        }
    }));
    let enricher = enricher(transport);

    let out = enricher.enrich(account(Some("Faker#EUW"), "Gold 1"), true).await;
    assert!(out.matches.is_none());
    assert_eq!(out.account.league, "Platinum 2");
}

#[tokio::test]
async fn fan_out_is_bounded() {
    let transport = Arc::new(
        MockTransport::new(fake_riot(None)).with_delay(Duration::from_millis(20)),
    );
    let enricher = Enricher::new(common::proxy(transport.clone()), 4, 5);

    let batch: Vec<_> = (0..12)
        .map(|i| account(Some(&format!("Player{i}#EUW")), "Gold 1"))
        .collect();
    let enriched = enricher.enrich_all(batch).await;

    assert!(enriched.iter().all(|e| e.summoner.is_some()));
    let peak = transport.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 4, "peak {peak}");
    assert!(peak > 1, "accounts were enriched one by one");
    assert_eq!(transport.call_count(), 12 * 3);
}

#[tokio::test]
async fn match_details_respect_the_concurrency_bound() {
    let riot = fake_riot(None);
    let transport = Arc::new(
        MockTransport::new(move |url| {
            if url.path().ends_with("/ids") {
                let ids: Vec<String> = (0..20).map(|i| format!("EUW1_{i}")).collect();
                common::json_response(200, serde_json::json!(ids))
            } else {
                riot(url)
            }
        })
        .with_delay(Duration::from_millis(20)),
    );
    let enricher = Enricher::new(common::proxy(transport.clone()), 4, 20);

    let out = enricher.enrich(account(Some("Faker#EUW"), "Gold 1"), true).await;

    assert_eq!(out.matches.map(|m| m.len()), Some(20));
    let peak = transport.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 4, "peak {peak}");
    // identity, summoner, ranked, id list, then one call per match
    assert_eq!(transport.call_count(), 4 + 20);
}
