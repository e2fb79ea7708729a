//! CLI argument definitions for coinwatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `markets` | Top coins by market cap |
//! | `coin` | Detail for one coin |
//! | `history` | Price history series for one coin |
//! | `fetch` | Cached fetch of an arbitrary API URL |
//! | `watchlist` | List, add or remove watched coins |
//! | `sync` | Reconcile the local watchlist with the remote snapshot |
//! | `favorites` | Favorites stored in the user profile |
//! | `profile` | Show, register or update the user profile |
//! | `theme` | Read or change the colour scheme |
//! | `cache` | Prune or clear cached API responses |
//! | `reset` | Clear all local state |
//! | `status` | Effective configuration and local state summary |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--home` | `$COINWATCH_HOME` | Directory holding the local store |
//! | `--user` | `$COINWATCH_USER` | Signed-in user id (guest when unset) |
//! | `--api-base` | CoinGecko v3 | Market-data API base URL |
//! | `--merge-policy` | `last-non-empty` | Boot-sync merge policy |
//! | `--no-guest-sync` | `false` | Keep guest watchlists on the device |
//! | `--yes` | `false` | Answer yes to confirmations |
//! | `--log-json` | `false` | Emit logs on stderr as JSON |
//!
//! # Examples
//!
//! ```bash
//! # Top ten coins
//! coinwatch markets --per-page 10 --pretty
//!
//! # 30 days of market caps
//! coinwatch history bitcoin --days 30 --series market_caps
//!
//! # Watch a coin as a signed-in user and push it upstream
//! coinwatch --user u1 watchlist add solana
//! coinwatch --user u1 sync
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use coinwatch_core::{AppConfig, MergePolicy, Theme, UserKey, ValidationError};

/// Coinwatch - cryptocurrency market dashboard CLI
///
/// Browse market data with a local response cache and keep a watchlist
/// that follows you across devices.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "coinwatch",
    author,
    version,
    about = "Cryptocurrency market dashboard CLI",
    long_about = "Coinwatch reads market data from a CoinGecko-compatible API and keeps a \
watchlist on the device. Features include:\n\
\n\
  • Rate-limited, validated market-data requests\n\
  • Five-minute response cache with linear retry\n\
  • Watchlist sync through a Firebase Realtime Database\n\
  • Local-only mode when no backend is configured\n\
\n\
Use 'coinwatch <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Directory holding the local store (overrides COINWATCH_HOME).
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Signed-in user id (overrides COINWATCH_USER).
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Market-data API base URL (overrides COINWATCH_API_BASE).
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// How boot-time sync reconciles local and remote watchlists.
    ///
    /// - last-non-empty: the non-empty side wins, local preferred
    /// - union: keep coins from both sides
    #[arg(long, global = true)]
    pub merge_policy: Option<MergePolicy>,

    /// Never read or write the shared guest bucket on the remote store.
    #[arg(long, global = true, default_value_t = false)]
    pub no_guest_sync: bool,

    /// Answer yes to every confirmation prompt.
    #[arg(long, short = 'y', global = true, default_value_t = false)]
    pub yes: bool,

    /// Emit logs as JSON lines on stderr. Verbosity comes from COINWATCH_LOG.
    #[arg(long, global = true, default_value_t = false)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn app_config(&self) -> Result<AppConfig, ValidationError> {
        let mut config = AppConfig::from_env()?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(home) = &self.home {
            config.home = home.clone();
        }
        if let Some(user) = &self.user {
            config.user = UserKey::from_option(Some(user));
        }
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.clone();
        }
        if let Some(policy) = self.merge_policy {
            config.merge_policy = policy;
        }
        if self.no_guest_sync {
            config.guest_sync = false;
        }
    }
}

/// Top-level commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 📈 List top coins ranked by market cap.
    ///
    /// # Examples
    ///
    ///   coinwatch markets
    ///   coinwatch markets --per-page 25 --page 2
    Markets(MarketsArgs),

    /// 🪙 Show detail for one coin.
    ///
    /// Ids are lowercased and may contain letters, digits, '-' and '_'.
    ///
    /// # Examples
    ///
    ///   coinwatch coin bitcoin
    Coin(CoinArgs),

    /// 📉 Show a price history series.
    ///
    /// # Examples
    ///
    ///   coinwatch history ethereum --days 90
    ///   coinwatch history solana --series total_volumes
    History(HistoryArgs),

    /// 🌐 Fetch any API URL through the response cache.
    ///
    /// Fresh cached responses (under five minutes old) are served without a
    /// network call. Failed requests are retried with linear backoff.
    ///
    /// # Examples
    ///
    ///   coinwatch fetch https://api.coingecko.com/api/v3/ping
    ///   coinwatch fetch https://api.coingecko.com/api/v3/ping --refresh
    Fetch(FetchArgs),

    /// ⭐ Manage the watchlist.
    Watchlist(WatchlistArgs),

    /// 🔄 Reconcile the local watchlist with the remote snapshot.
    ///
    /// Skipped when no backend is configured or the guest bucket is disabled.
    Sync,

    /// 💛 Manage favorites stored in the user profile.
    Favorites(FavoritesArgs),

    /// 👤 Show, register or update the user profile.
    Profile(ProfileArgs),

    /// 🎨 Read or change the colour scheme.
    Theme(ThemeArgs),

    /// 📦 Cache management commands.
    Cache(CacheArgs),

    /// 🧹 Clear all local state (watchlist, theme, cached responses).
    Reset,

    /// 🔌 Show effective configuration and local state.
    Status,
}

/// Arguments for the `markets` command.
#[derive(Debug, Clone, Args)]
pub struct MarketsArgs {
    /// Rows per page (clamped to 1..=250).
    #[arg(long, default_value_t = 100)]
    pub per_page: u32,

    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,
}

/// Arguments for the `coin` command.
#[derive(Debug, Clone, Args)]
pub struct CoinArgs {
    /// Coin id (e.g., bitcoin).
    pub id: String,
}

/// Arguments for the `history` command.
#[derive(Debug, Clone, Args)]
pub struct HistoryArgs {
    /// Coin id (e.g., bitcoin).
    pub id: String,

    /// Look-back in days, clamped to 1..=365.
    #[arg(long, default_value = "7", allow_hyphen_values = true)]
    pub days: String,

    /// Series to return.
    ///
    /// - prices (default)
    /// - market_caps
    /// - total_volumes
    #[arg(long, default_value = "prices")]
    pub series: String,
}

/// Arguments for the `fetch` command.
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Absolute URL to fetch.
    pub url: String,

    /// Drop any cached response and fetch again.
    #[arg(long, default_value_t = false, conflicts_with = "no_cache")]
    pub refresh: bool,

    /// Neither read nor write the response cache.
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Total attempts before giving up.
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Backoff step in milliseconds; the n-th failure waits n steps.
    #[arg(long, default_value_t = 1_000)]
    pub retry_delay_ms: u64,
}

/// Arguments for the `watchlist` command group.
#[derive(Debug, Clone, Args)]
pub struct WatchlistArgs {
    #[command(subcommand)]
    pub command: WatchlistCommand,
}

/// Watchlist subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum WatchlistCommand {
    /// Show watched coin ids in insertion order.
    List,

    /// Add a coin id.
    Add(CoinArgs),

    /// Remove a coin id after confirmation.
    Remove(CoinArgs),
}

/// Arguments for the `favorites` command group.
#[derive(Debug, Clone, Args)]
pub struct FavoritesArgs {
    #[command(subcommand)]
    pub command: FavoritesCommand,
}

/// Favorites subcommands. All of them need `--user`.
#[derive(Debug, Clone, Subcommand)]
pub enum FavoritesCommand {
    List,
    Add(CoinArgs),
    Remove(CoinArgs),
}

/// Arguments for the `profile` command group.
#[derive(Debug, Clone, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

/// Profile subcommands. All of them need `--user`.
#[derive(Debug, Clone, Subcommand)]
pub enum ProfileCommand {
    /// Show the stored profile, creating it with defaults on first access.
    Show,

    /// Create the profile for a new account.
    Register(RegisterArgs),

    /// Change profile fields.
    Update(ProfileUpdateArgs),
}

/// Arguments for `profile register`.
#[derive(Debug, Clone, Args)]
pub struct RegisterArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub password: String,

    #[arg(long)]
    pub confirm_password: String,

    #[arg(long)]
    pub display_name: Option<String>,
}

/// Arguments for `profile update`.
#[derive(Debug, Clone, Args)]
pub struct ProfileUpdateArgs {
    #[arg(long)]
    pub display_name: Option<String>,

    /// Preferred colour scheme (dark, light).
    #[arg(long)]
    pub theme: Option<Theme>,

    /// Preferred quote currency (e.g., usd, eur).
    #[arg(long)]
    pub currency: Option<String>,

    /// Enable or disable notifications.
    #[arg(long)]
    pub notifications: Option<bool>,
}

/// Arguments for the `theme` command group.
#[derive(Debug, Clone, Args)]
pub struct ThemeArgs {
    #[command(subcommand)]
    pub command: ThemeCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ThemeCommand {
    Get,
    Set(ThemeSetArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ThemeSetArgs {
    /// dark or light.
    pub theme: Theme,
}

/// Arguments for the `cache` command group.
#[derive(Debug, Clone, Args)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub command: CacheCommand,
}

/// Cache management subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum CacheCommand {
    /// Drop cached responses older than five minutes.
    Prune,

    /// Drop every cached response.
    Clear,
}
