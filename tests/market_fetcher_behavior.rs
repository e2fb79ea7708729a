//! Behavior-driven tests for the market-data fetcher
//!
//! These tests run the fetcher against a local HTTP server and verify what
//! a dashboard screen observes: validated ids, rate limiting, sentinel
//! failures and the series fallback of the price history.

use std::sync::Arc;
use std::time::Duration;

use coinwatch_core::{
    ChartSeries, HistoryDays, ManualClock, MarketClient, RateLimitConfig, RateLimiter,
    ReqwestHttpClient, ScriptedHttpClient, ServiceErrorKind,
};
use mockito::Matcher;

fn market_for(base_url: &str) -> MarketClient {
    let limiter = RateLimiter::new(RateLimitConfig::api(), Arc::new(ManualClock::new(0)));
    MarketClient::new(Arc::new(ReqwestHttpClient::new()), Arc::new(limiter), base_url)
}

// =============================================================================
// Listing and detail
// =============================================================================

#[tokio::test]
async fn user_sees_top_coins_ranked_by_market_cap() {
    // Given: The API answers the markets listing
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/coins/markets")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
            Matcher::UrlEncoded("order".into(), "market_cap_desc".into()),
            Matcher::UrlEncoded("per_page".into(), "100".into()),
            Matcher::UrlEncoded("page".into(), "1".into()),
            Matcher::UrlEncoded("sparkline".into(), "false".into()),
        ]))
        .with_status(200)
        .with_body(
            r#"[
                {"id":"bitcoin","symbol":"btc","name":"Bitcoin","current_price":67000.5,"market_cap_rank":1},
                {"id":"ethereum","symbol":"eth","name":"Ethereum","current_price":3500.0,"market_cap_rank":2}
            ]"#,
        )
        .create_async()
        .await;

    // When: The dashboard lists the first page
    let coins = market_for(&server.url())
        .top_coins(100, 1)
        .await
        .expect("listing succeeds");

    // Then: Both rows arrive in order with their figures
    mock.assert_async().await;
    assert_eq!(coins.len(), 2);
    assert_eq!(coins[0].id, "bitcoin");
    assert_eq!(coins[0].current_price, Some(67000.5));
    assert_eq!(coins[1].market_cap_rank, Some(2));
}

#[tokio::test]
async fn uppercase_ids_are_normalized_before_the_request() {
    // Given: The API only knows the lowercase id
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/coins/bitcoin")
        .with_status(200)
        .with_body(
            r#"{"id":"bitcoin","symbol":"btc","name":"Bitcoin",
                "description":{"en":"Peer-to-peer cash"},
                "market_data":{"current_price":{"usd":67000.0}}}"#,
        )
        .create_async()
        .await;

    // When: A user asks for "BITCOIN"
    let detail = market_for(&server.url())
        .coin_detail("BITCOIN")
        .await
        .expect("detail succeeds");

    // Then: The lowercase resource is fetched
    mock.assert_async().await;
    assert_eq!(detail.price_in("usd"), Some(67000.0));
    assert_eq!(detail.english_description(), Some("Peer-to-peer cash"));
}

// =============================================================================
// Input validation and rate limiting
// =============================================================================

#[tokio::test]
async fn path_traversal_ids_never_reach_the_network() {
    // Given: A transport that records every request
    let http = Arc::new(ScriptedHttpClient::default());
    let limiter = RateLimiter::new(RateLimitConfig::api(), Arc::new(ManualClock::new(0)));
    let market = MarketClient::new(http.clone(), Arc::new(limiter), "https://api.test");

    // When: The id contains path characters or is too long
    let traversal = market.coin_detail("../../etc").await.unwrap_err();
    let long = market.coin_detail(&"a".repeat(51)).await.unwrap_err();

    // Then: Both fail as invalid input and no request was sent
    assert_eq!(traversal.kind(), ServiceErrorKind::InvalidInput);
    assert_eq!(long.kind(), ServiceErrorKind::InvalidInput);
    assert_eq!(http.request_count(), 0);
}

#[tokio::test]
async fn thirty_first_detail_call_in_a_minute_is_rate_limited() {
    // Given: A frozen clock and a server that always answers
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/coins/bitcoin")
        .with_status(200)
        .with_body(r#"{"id":"bitcoin","symbol":"btc","name":"Bitcoin"}"#)
        .expect(30)
        .create_async()
        .await;
    let clock = Arc::new(ManualClock::new(0));
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::api(), clock.clone()));
    let market = MarketClient::new(Arc::new(ReqwestHttpClient::new()), limiter, server.url());

    // When: The same coin is requested 31 times within the window
    for _ in 0..30 {
        market.coin_detail("bitcoin").await.expect("within budget");
    }
    let rejected = market.coin_detail("bitcoin").await.unwrap_err();

    // Then: Only 30 requests hit the server and the last call was limited
    mock.assert_async().await;
    assert_eq!(rejected.kind(), ServiceErrorKind::RateLimited);

    // And: Capacity returns once the window has passed
    clock.advance(Duration::from_secs(60));
    assert_eq!(market.limiter().remaining("getCoinData_bitcoin"), 30);
}

// =============================================================================
// Failures and price history
// =============================================================================

#[tokio::test]
async fn server_errors_surface_as_network_failures() {
    // Given: The API is down
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/coins/ethereum")
        .with_status(503)
        .create_async()
        .await;

    // When: The detail screen loads
    let error = market_for(&server.url())
        .coin_detail("ethereum")
        .await
        .unwrap_err();

    // Then: The caller gets a retryable network failure, not a panic
    assert_eq!(error.kind(), ServiceErrorKind::NetworkFailure);
    assert!(error.retryable());
    assert!(error.message().contains("503"));
}

#[tokio::test]
async fn price_history_clamps_days_and_falls_back_to_prices() {
    // Given: A chart body without market caps
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/coins/solana/market_chart")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
            Matcher::UrlEncoded("days".into(), "365".into()),
            Matcher::UrlEncoded("interval".into(), "daily".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"prices":[[1700000000000,55.5],[1700086400000,57.25]]}"#)
        .create_async()
        .await;

    // When: The user asks for 1000 days of an unknown series kind
    let points = market_for(&server.url())
        .price_history(
            "solana",
            HistoryDays::parse("1000"),
            ChartSeries::parse_or_default("candles"),
        )
        .await
        .expect("history succeeds");

    // Then: Days were capped at 365 and the prices series came back
    mock.assert_async().await;
    assert_eq!(points, vec![[1_700_000_000_000.0, 55.5], [1_700_086_400_000.0, 57.25]]);
}
