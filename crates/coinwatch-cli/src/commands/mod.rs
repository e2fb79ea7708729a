mod fetch;
mod local;
mod market;
mod profile;
mod sync;
mod watchlist;

use coinwatch_core::{Dashboard, Notice};
use serde_json::Value;

use crate::cli::Command;
use crate::error::CliError;

pub use watchlist::StdinConfirm;

pub struct CommandOutput {
    pub command: &'static str,
    pub data: Value,
    pub notice: Option<Notice>,
}

impl CommandOutput {
    pub fn ok(command: &'static str, data: Value) -> Self {
        Self {
            command,
            data,
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }
}

pub async fn run(
    dashboard: &Dashboard,
    command: &Command,
    confirm: &StdinConfirm,
) -> Result<CommandOutput, CliError> {
    match command {
        Command::Markets(args) => market::markets(args, dashboard).await,
        Command::Coin(args) => market::coin(args, dashboard).await,
        Command::History(args) => market::history(args, dashboard).await,
        Command::Fetch(args) => fetch::run(args, dashboard).await,
        Command::Watchlist(args) => watchlist::run(args, dashboard, confirm).await,
        Command::Sync => sync::run(dashboard).await,
        Command::Favorites(args) => profile::favorites(args, dashboard).await,
        Command::Profile(args) => profile::run(args, dashboard).await,
        Command::Theme(args) => local::theme(args, dashboard),
        Command::Cache(args) => Ok(local::cache(args, dashboard)),
        Command::Reset => local::reset(dashboard, confirm),
        Command::Status => local::status(dashboard),
    }
}
