use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::domain::{ChartPoint, ChartSeries, CoinDetail, CoinId, CoinMarket, HistoryDays, MarketChart};
use crate::error::ServiceError;
use crate::http_client::{fetch_json, HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::rate_limit::RateLimiter;
use crate::security::{secure_log, LogLevel};

pub const DEFAULT_API_BASE: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_PER_PAGE: u32 = 100;
pub const MAX_PER_PAGE: u32 = 250;

/// Market-data fetcher: validates input, consults the rate limiter, then
/// issues one GET with a fixed timeout. Every outcome is audit-logged.
#[derive(Clone)]
pub struct MarketClient {
    http: Arc<dyn HttpClient>,
    limiter: Arc<RateLimiter>,
    base_url: String,
    timeout: Duration,
}

impl MarketClient {
    pub fn new(http: Arc<dyn HttpClient>, limiter: Arc<RateLimiter>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            http,
            limiter,
            base_url,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn markets_url(&self, per_page: u32, page: u32) -> String {
        format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={}&page={}&sparkline=false",
            self.base_url,
            per_page.clamp(1, MAX_PER_PAGE),
            page.max(1)
        )
    }

    pub fn coin_url(&self, id: &CoinId) -> String {
        format!("{}/coins/{}", self.base_url, id)
    }

    pub fn chart_url(&self, id: &CoinId, days: HistoryDays) -> String {
        format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}&interval=daily",
            self.base_url,
            id,
            days.get()
        )
    }

    /// Top coins by market cap. A body that is not an array yields an empty list.
    pub async fn top_coins(&self, per_page: u32, page: u32) -> Result<Vec<CoinMarket>, ServiceError> {
        self.check_rate(&format!("listCoins_{}", page.max(1)))?;

        let url = self.markets_url(per_page, page);
        let body = self.get(&url, "coin list").await?;
        if !body.is_array() {
            secure_log(
                LogLevel::Warn,
                "Coin list response was not an array",
                Some(json!({ "url": url })),
            );
            return Ok(Vec::new());
        }

        let coins: Vec<CoinMarket> = decode(body, "coin list")?;
        secure_log(
            LogLevel::Info,
            "Successfully fetched coin list",
            Some(json!({ "count": coins.len() })),
        );
        Ok(coins)
    }

    pub async fn coin_detail(&self, raw_id: &str) -> Result<CoinDetail, ServiceError> {
        let id = validate(raw_id)?;
        self.check_rate(&format!("getCoinData_{id}"))?;

        let body = self.get(&self.coin_url(&id), "coin data").await?;
        let detail: CoinDetail = decode(body, "coin data")?;
        secure_log(
            LogLevel::Info,
            "Successfully fetched coin data",
            Some(json!({ "coinId": id.as_str() })),
        );
        Ok(detail)
    }

    /// Full chart body for `raw_id` over `days`.
    pub async fn market_chart(&self, raw_id: &str, days: HistoryDays) -> Result<MarketChart, ServiceError> {
        let id = validate(raw_id)?;
        self.check_rate(&format!("getPrices_{id}"))?;

        let body = self.get(&self.chart_url(&id, days), "price data").await?;
        let chart: MarketChart = decode(body, "price data")?;
        secure_log(
            LogLevel::Info,
            "Successfully fetched price data",
            Some(json!({ "coinId": id.as_str(), "days": days.get() })),
        );
        Ok(chart)
    }

    /// One series of the chart; falls back to `prices` when the body lacks it.
    pub async fn price_history(
        &self,
        raw_id: &str,
        days: HistoryDays,
        series: ChartSeries,
    ) -> Result<Vec<ChartPoint>, ServiceError> {
        let chart = self.market_chart(raw_id, days).await?;
        Ok(chart.series(series))
    }

    fn check_rate(&self, key: &str) -> Result<(), ServiceError> {
        if self.limiter.is_allowed(key) {
            return Ok(());
        }
        secure_log(
            LogLevel::Warn,
            "Rate limit exceeded",
            Some(json!({ "key": key })),
        );
        Err(ServiceError::rate_limited(format!(
            "rate limit exceeded for {key}; try again later"
        )))
    }

    async fn get(&self, url: &str, what: &str) -> Result<Value, ServiceError> {
        let request = HttpRequest::get(url).with_timeout(self.timeout);
        fetch_json(self.http.as_ref(), request).await.inspect_err(|error| {
            secure_log(
                LogLevel::Error,
                &format!("Failed to fetch {what}"),
                Some(json!({ "url": url, "error": error.message() })),
            );
        })
    }
}

fn validate(raw_id: &str) -> Result<CoinId, ServiceError> {
    CoinId::parse(raw_id).map_err(|error| {
        secure_log(
            LogLevel::Warn,
            "Invalid coin ID provided",
            Some(json!({ "coinId": raw_id, "reason": error.to_string() })),
        );
        ServiceError::from(error)
    })
}

fn decode<T: DeserializeOwned>(body: Value, what: &str) -> Result<T, ServiceError> {
    serde_json::from_value(body).map_err(|error| {
        secure_log(
            LogLevel::Error,
            &format!("Unexpected {what} shape"),
            Some(json!({ "error": error.to_string() })),
        );
        ServiceError::network(format!("unexpected {what} shape: {error}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::ServiceErrorKind;
    use crate::http_client::{HttpResponse, ScriptedHttpClient};
    use crate::rate_limit::RateLimitConfig;

    fn client(http: Arc<ScriptedHttpClient>, max_requests: usize) -> MarketClient {
        let limiter = RateLimiter::new(
            RateLimitConfig {
                max_requests,
                window: Duration::from_secs(60),
            },
            Arc::new(ManualClock::new(0)),
        );
        MarketClient::new(http, Arc::new(limiter), "https://api.test/v3/")
    }

    #[test]
    fn urls_follow_the_public_api_layout() {
        let market = client(Arc::new(ScriptedHttpClient::default()), 30);
        let id = CoinId::parse("Bitcoin").expect("valid id");

        assert_eq!(
            market.markets_url(1_000, 0),
            "https://api.test/v3/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=250&page=1&sparkline=false"
        );
        assert_eq!(market.coin_url(&id), "https://api.test/v3/coins/bitcoin");
        assert_eq!(
            market.chart_url(&id, HistoryDays::new(400)),
            "https://api.test/v3/coins/bitcoin/market_chart?vs_currency=usd&days=365&interval=daily"
        );
    }

    #[tokio::test]
    async fn listing_pages_are_limited_independently() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json("[]"))]));
        let market = client(http.clone(), 1);

        market.top_coins(100, 1).await.expect("first page");
        let limited = market.top_coins(100, 1).await.unwrap_err();
        market.top_coins(100, 2).await.expect("second page has its own window");

        assert_eq!(limited.kind(), ServiceErrorKind::RateLimited);
        assert_eq!(market.limiter().remaining("listCoins_1"), 0);
        assert_eq!(market.limiter().remaining("listCoins_2"), 0);
        assert_eq!(http.request_count(), 2);
    }

    #[tokio::test]
    async fn non_array_listing_is_an_empty_list() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"status":{"error_code":429}}"#,
        ))]));
        let market = client(http, 30);

        assert_eq!(market.top_coins(100, 1).await, Ok(Vec::new()));
    }

    #[tokio::test]
    async fn rate_limit_is_keyed_per_operation_and_coin() {
        let http = Arc::new(ScriptedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"prices":[[1,2.0]]}"#,
        ))]));
        let market = client(http.clone(), 1);

        assert!(market.price_history("bitcoin", HistoryDays::default(), ChartSeries::Prices).await.is_ok());
        let limited = market
            .price_history("bitcoin", HistoryDays::default(), ChartSeries::Prices)
            .await
            .unwrap_err();
        assert_eq!(limited.kind(), ServiceErrorKind::RateLimited);
        assert!(market.price_history("ethereum", HistoryDays::default(), ChartSeries::Prices).await.is_ok());
        assert_eq!(http.request_count(), 2);
    }
}
