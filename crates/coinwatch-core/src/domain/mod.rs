//! # Domain Models
//!
//! Validated identifiers and the market-data payload shapes.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`CoinId`] | Validated, lowercased coin identifier |
//! | [`CoinMarket`] | Row of the top-coins listing |
//! | [`CoinDetail`] | Coin detail with `market_data` and description |
//! | [`MarketChart`] | Price, market-cap and volume series |
//! | [`ChartSeries`] | Series selector with a `prices` fallback |
//! | [`HistoryDays`] | Look-back clamped into `[1, 365]` |
//! | [`UserKey`] | Signed-in user or the shared `guest` bucket |
//! | [`Theme`] | Persisted dark/light preference |

mod coin_id;
mod market;
mod theme;
mod user;

pub use coin_id::{CoinId, MAX_COIN_ID_LEN};
pub use market::{
    ChartPoint, ChartSeries, CoinDetail, CoinImage, CoinMarket, HistoryDays, MarketChart,
    MarketData,
};
pub use theme::Theme;
pub use user::{UserKey, GUEST_ID};
