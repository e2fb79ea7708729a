use coinwatch_core::{Confirm, Dashboard, Notice, NoticeKind};
use serde_json::json;

use crate::cli::{CacheArgs, CacheCommand, ThemeArgs, ThemeCommand};
use crate::error::CliError;

use super::CommandOutput;

const RESET_PROMPT: &str = "Clear the watchlist, theme and cached responses on this device?";

pub fn theme(args: &ThemeArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    match &args.command {
        ThemeCommand::Get => Ok(CommandOutput::ok(
            "theme.get",
            json!({ "theme": dashboard.theme()? }),
        )),
        ThemeCommand::Set(set) => {
            dashboard.set_theme(set.theme)?;
            Ok(CommandOutput::ok("theme.set", json!({ "theme": set.theme })))
        }
    }
}

pub fn cache(args: &CacheArgs, dashboard: &Dashboard) -> CommandOutput {
    match &args.command {
        CacheCommand::Prune => {
            let removed = dashboard.cache().clear_expired();
            CommandOutput::ok(
                "cache.prune",
                json!({ "removed": removed, "remaining": dashboard.cache().len() }),
            )
        }
        CacheCommand::Clear => CommandOutput::ok(
            "cache.clear",
            json!({ "removed": dashboard.cache().clear() }),
        ),
    }
}

pub fn reset(dashboard: &Dashboard, confirm: &dyn Confirm) -> Result<CommandOutput, CliError> {
    if !confirm.confirm(RESET_PROMPT) {
        return Ok(CommandOutput::ok("reset", json!({ "cleared": false })).with_notice(Notice {
            kind: NoticeKind::Info,
            text: String::from("Local state left untouched"),
        }));
    }

    dashboard.reset_local()?;
    Ok(CommandOutput::ok("reset", json!({ "cleared": true })).with_notice(Notice {
        kind: NoticeKind::Success,
        text: String::from("Local state cleared"),
    }))
}

pub fn status(dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let config = dashboard.config();
    let watchlist = dashboard.watchlist().load()?;

    Ok(CommandOutput::ok(
        "status",
        json!({
            "user": config.user.as_str(),
            "home": config.home.display().to_string(),
            "api_base": config.api_base,
            "backend_configured": config.backend.is_configured(),
            "remote_sync": dashboard.sync().is_enabled_for(&config.user),
            "guest_sync": config.guest_sync,
            "merge_policy": config.merge_policy,
            "theme": dashboard.theme()?,
            "watchlist_size": watchlist.len(),
            "cached_responses": dashboard.cache().len(),
        }),
    ))
}
