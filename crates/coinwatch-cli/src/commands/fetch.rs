use std::time::Duration;

use coinwatch_core::{CacheMode, Dashboard, QueryOptions, ValidationError};
use serde_json::json;

use crate::cli::FetchArgs;
use crate::error::CliError;

use super::CommandOutput;

fn cache_mode(args: &FetchArgs) -> CacheMode {
    if args.no_cache {
        CacheMode::Bypass
    } else if args.refresh {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    }
}

fn query_options(args: &FetchArgs, mode: CacheMode) -> QueryOptions {
    QueryOptions {
        cache: mode.writes(),
        retries: args.retries,
        retry_delay: Duration::from_millis(args.retry_delay_ms),
        ..QueryOptions::default()
    }
}

pub async fn run(args: &FetchArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let url = args.url.trim();
    if url.is_empty() {
        return Err(ValidationError::EmptyUrl.into());
    }

    let mode = cache_mode(args);
    let query = dashboard.query(url, query_options(args, mode));
    let state = match mode {
        CacheMode::Refresh => query.refetch().await,
        CacheMode::Use | CacheMode::Bypass => query.run().await,
    };

    if let Some(error) = state.error {
        return Err(error.into());
    }

    Ok(CommandOutput::ok(
        "fetch",
        json!({
            "url": url,
            "from_cache": state.from_cache,
            "attempts": state.attempts,
            "data": state.data,
        }),
    ))
}
