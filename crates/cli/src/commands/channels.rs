use chanprice_core::domain::channel::display_precision;
use chanprice_core::ApplicationError;
use serde::Serialize;
use tracing::warn;

use crate::commands::{load_config, store, CommandResult, DataPaths};

#[derive(Debug, Serialize)]
struct ChannelCheck {
    id: String,
    name: String,
    channel_type: Option<&'static str>,
    display_precision: u32,
    status: &'static str,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChannelsReport {
    total: usize,
    invalid: usize,
    channels: Vec<ChannelCheck>,
}

/// Validates every channel in the directory. Exit code 4 when any is unusable.
pub fn run(paths: DataPaths) -> CommandResult {
    match execute(&paths) {
        Ok(report) if report.invalid == 0 => CommandResult::report("channels", "ok", 0, &report),
        Ok(report) => CommandResult::report("channels", "invalid", 4, &report),
        Err(error) => CommandResult::from_error("channels", &error),
    }
}

fn execute(paths: &DataPaths) -> Result<ChannelsReport, ApplicationError> {
    let config = load_config(paths)?;
    let directory = store::read_directory(&config.data.channels_path)?;

    let channels = directory
        .channels()
        .iter()
        .map(|channel| {
            let outcome = channel.validate();
            if let Err(error) = &outcome {
                warn!(
                    event_name = "cli.channels.invalid",
                    channel_id = %channel.id,
                    error = %error,
                    "channel configuration is unusable"
                );
            }
            ChannelCheck {
                id: channel.id.to_string(),
                name: channel.name.clone(),
                channel_type: channel.channel_type.map(|channel_type| channel_type.as_str()),
                display_precision: display_precision(channel.currency.as_deref()),
                status: if outcome.is_ok() { "ok" } else { "invalid" },
                error: outcome.err().map(|error| error.to_string()),
            }
        })
        .collect::<Vec<_>>();

    Ok(ChannelsReport {
        total: channels.len(),
        invalid: channels.iter().filter(|check| check.error.is_some()).count(),
        channels,
    })
}
