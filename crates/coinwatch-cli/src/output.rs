use std::io::Write;

use coinwatch_core::Notice;
use serde::Serialize;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::commands::CommandOutput;
use crate::error::CliError;

/// Wire shape of every successful command on stdout.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub request_id: Uuid,
    pub generated_at: String,
    pub command: &'static str,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl Envelope {
    pub fn from_output(output: CommandOutput) -> Result<Self, CliError> {
        let generated_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|error| CliError::Command(format!("failed to format timestamp: {error}")))?;

        Ok(Self {
            request_id: Uuid::new_v4(),
            generated_at,
            command: output.command,
            data: output.data,
            notice: output.notice,
        })
    }
}

pub fn render(envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write_envelope(&mut handle, envelope, pretty)
}

fn write_envelope(out: &mut impl Write, envelope: &Envelope, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(&mut *out, envelope)?;
    } else {
        serde_json::to_writer(&mut *out, envelope)?;
    }
    writeln!(out)?;
    Ok(())
}
