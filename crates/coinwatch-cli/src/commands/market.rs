use coinwatch_core::{ChartSeries, CoinId, Dashboard, HistoryDays};
use serde_json::json;

use crate::cli::{CoinArgs, HistoryArgs, MarketsArgs};
use crate::error::CliError;

use super::CommandOutput;

pub async fn markets(args: &MarketsArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let coins = dashboard.market().top_coins(args.per_page, args.page).await?;
    Ok(CommandOutput::ok("markets", serde_json::to_value(coins)?))
}

pub async fn coin(args: &CoinArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let detail = dashboard.market().coin_detail(&args.id).await?;
    Ok(CommandOutput::ok("coin", serde_json::to_value(detail)?))
}

pub async fn history(args: &HistoryArgs, dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let id = CoinId::parse(&args.id)?;
    let days = HistoryDays::parse(&args.days);
    let series = ChartSeries::parse_or_default(&args.series);

    let points = dashboard
        .market()
        .price_history(id.as_str(), days, series)
        .await?;

    Ok(CommandOutput::ok(
        "history",
        json!({
            "id": id.as_str(),
            "days": days,
            "series": series,
            "points": points,
        }),
    ))
}
