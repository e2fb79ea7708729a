use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Row of the `/coins/markets` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub price_change_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoinImage {
    #[serde(default)]
    pub thumb: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
    #[serde(default)]
    pub large: Option<String>,
}

/// Per-currency figures inside `market_data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    #[serde(default)]
    pub current_price: BTreeMap<String, f64>,
    #[serde(default)]
    pub market_cap: BTreeMap<String, f64>,
    #[serde(default)]
    pub total_volume: BTreeMap<String, f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_7d: Option<f64>,
    #[serde(default)]
    pub circulating_supply: Option<f64>,
}

/// Body of `/coins/{id}`; fields the dashboard does not render are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinDetail {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub description: BTreeMap<String, String>,
    #[serde(default)]
    pub image: CoinImage,
    #[serde(default)]
    pub market_cap_rank: Option<u32>,
    #[serde(default)]
    pub market_data: Option<MarketData>,
}

impl CoinDetail {
    pub fn price_in(&self, currency: &str) -> Option<f64> {
        self.market_data
            .as_ref()
            .and_then(|data| data.current_price.get(currency).copied())
    }

    pub fn english_description(&self) -> Option<&str> {
        self.description.get("en").map(String::as_str)
    }
}

/// `[timestamp_ms, value]` pair.
pub type ChartPoint = [f64; 2];

/// Body of `/coins/{id}/market_chart`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Option<Vec<ChartPoint>>,
    #[serde(default)]
    pub market_caps: Option<Vec<ChartPoint>>,
    #[serde(default)]
    pub total_volumes: Option<Vec<ChartPoint>>,
}

impl MarketChart {
    /// The requested series, or `prices` when the body lacks it.
    pub fn series(&self, kind: ChartSeries) -> Vec<ChartPoint> {
        let requested = match kind {
            ChartSeries::Prices => &self.prices,
            ChartSeries::MarketCaps => &self.market_caps,
            ChartSeries::TotalVolumes => &self.total_volumes,
        };
        requested
            .as_ref()
            .or(self.prices.as_ref())
            .cloned()
            .unwrap_or_default()
    }
}

/// Which series of a market chart to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSeries {
    #[default]
    Prices,
    MarketCaps,
    TotalVolumes,
}

impl ChartSeries {
    /// Unrecognized names fall back to [`ChartSeries::Prices`].
    pub fn parse_or_default(input: &str) -> Self {
        match input {
            "market_caps" => Self::MarketCaps,
            "total_volumes" => Self::TotalVolumes,
            _ => Self::Prices,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Prices => "prices",
            Self::MarketCaps => "market_caps",
            Self::TotalVolumes => "total_volumes",
        }
    }
}

impl Display for ChartSeries {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Look-back for price history, clamped into `[1, 365]` days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HistoryDays(u16);

impl HistoryDays {
    pub const DEFAULT: u16 = 7;
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 365;

    /// Zero means "unset" and yields the default look-back.
    pub fn new(days: i64) -> Self {
        if days == 0 {
            return Self(Self::DEFAULT);
        }
        Self(days.clamp(i64::from(Self::MIN), i64::from(Self::MAX)) as u16)
    }

    /// Parses a leading integer (`"30d"` reads as 30); anything else is the default.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let sign_len = usize::from(trimmed.starts_with('-') || trimmed.starts_with('+'));
        let digits_end = trimmed[sign_len..]
            .find(|ch: char| !ch.is_ascii_digit())
            .map_or(trimmed.len(), |offset| sign_len + offset);

        match trimmed[..digits_end].parse::<i64>() {
            Ok(days) => Self::new(days),
            Err(_) if digits_end > sign_len => {
                // Digits that overflow i64 are clearly above the cap.
                if trimmed.starts_with('-') {
                    Self(Self::MIN)
                } else {
                    Self(Self::MAX)
                }
            }
            Err(_) => Self(Self::DEFAULT),
        }
    }

    pub const fn get(self) -> u16 {
        self.0
    }
}

impl Default for HistoryDays {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn days_are_clamped() {
        assert_eq!(HistoryDays::new(-3).get(), 1);
        assert_eq!(HistoryDays::new(0).get(), 7);
        assert_eq!(HistoryDays::new(30).get(), 30);
        assert_eq!(HistoryDays::new(10_000).get(), 365);
    }

    #[test]
    fn days_parse_like_a_leading_integer() {
        assert_eq!(HistoryDays::parse("90").get(), 90);
        assert_eq!(HistoryDays::parse("30d").get(), 30);
        assert_eq!(HistoryDays::parse("max").get(), 7);
        assert_eq!(HistoryDays::parse("").get(), 7);
        assert_eq!(HistoryDays::parse("-12").get(), 1);
        assert_eq!(HistoryDays::parse("99999999999999999999999").get(), 365);
    }

    #[test]
    fn unknown_series_defaults_to_prices() {
        assert_eq!(ChartSeries::parse_or_default("market_caps"), ChartSeries::MarketCaps);
        assert_eq!(ChartSeries::parse_or_default("total_volumes"), ChartSeries::TotalVolumes);
        assert_eq!(ChartSeries::parse_or_default("volume"), ChartSeries::Prices);
    }

    #[test]
    fn missing_series_falls_back_to_prices() {
        let chart: MarketChart = serde_json::from_value(json!({
            "prices": [[1_700_000_000_000.0, 42_000.5]]
        }))
        .expect("chart");

        assert_eq!(
            chart.series(ChartSeries::TotalVolumes),
            vec![[1_700_000_000_000.0, 42_000.5]]
        );
    }

    #[test]
    fn coin_detail_ignores_unrendered_fields() {
        let detail: CoinDetail = serde_json::from_value(json!({
            "id": "bitcoin",
            "symbol": "btc",
            "name": "Bitcoin",
            "description": { "en": "Digital gold" },
            "tickers": [],
            "market_data": { "current_price": { "usd": 65000.0 } }
        }))
        .expect("detail");

        assert_eq!(detail.price_in("usd"), Some(65_000.0));
        assert_eq!(detail.english_description(), Some("Digital gold"));
    }
}
