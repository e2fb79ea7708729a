use coinwatch_core::Dashboard;

use crate::error::CliError;

use super::CommandOutput;

pub async fn run(dashboard: &Dashboard) -> Result<CommandOutput, CliError> {
    let report = dashboard
        .coordinator()
        .sync_on_boot(&dashboard.config().user)
        .await?;
    Ok(CommandOutput::ok("sync", serde_json::to_value(report)?))
}
