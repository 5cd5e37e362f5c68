pub mod apply_tier;
pub mod channels;
pub mod config;
pub mod price;
pub mod revert;
pub mod store;

use std::collections::BTreeSet;
use std::path::PathBuf;

use chanprice_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use chanprice_core::domain::divider::validate_dividers;
use chanprice_core::{
    ApplicationError, ChannelDirectory, DomainError, PricingContext, PricingSession, ProductId,
};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct CommandReport<'a, T: Serialize> {
    command: &'a str,
    status: &'a str,
    #[serde(flatten)]
    data: &'a T,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// A structured result: `data`'s fields sit next to `command` and `status`.
    pub fn report<T: Serialize>(command: &str, status: &str, exit_code: u8, data: &T) -> Self {
        let payload = CommandReport { command, status, data };
        match serde_json::to_string_pretty(&payload) {
            Ok(output) => Self { exit_code, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), exit_code_for(error))
    }
}

/// Paths a command may take from its flags instead of the configuration.
#[derive(Debug, Clone, Default)]
pub struct DataPaths {
    pub session: Option<PathBuf>,
    pub channels: Option<PathBuf>,
    pub snapshot_dir: Option<PathBuf>,
}

pub fn load_config(paths: &DataPaths) -> Result<AppConfig, ApplicationError> {
    AppConfig::load(LoadOptions {
        overrides: ConfigOverrides {
            session_path: paths.session.clone(),
            channels_path: paths.channels.clone(),
            snapshot_dir: paths.snapshot_dir.clone(),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    })
    .map_err(|error| ApplicationError::Configuration(error.to_string()))
}

/// Configuration, the stored session, and the pricing context it describes.
pub struct Workspace {
    pub config: AppConfig,
    pub session: PricingSession,
    pub context: PricingContext,
}

impl Workspace {
    pub fn open(paths: &DataPaths) -> Result<Self, ApplicationError> {
        let config = load_config(paths)?;
        let session = store::read_session(&config.data.session_path)?;
        validate_dividers(&session.dividers)?;

        let directory = if session.channel_id.is_some() {
            store::read_directory(&config.data.channels_path)?
        } else {
            ChannelDirectory::default()
        };
        let context = PricingContext::from_session(
            &session,
            &directory,
            config.pricing_overrides(),
            config.pricing.clone(),
        )?;

        Ok(Self { config, session, context })
    }

    pub fn save(&self) -> Result<(), ApplicationError> {
        store::write_session(&self.config.data.session_path, &self.session)
    }

    /// Rejects ids the session does not hold.
    pub fn require_products(&self, ids: &BTreeSet<ProductId>) -> Result<(), ApplicationError> {
        let unknown = ids
            .iter()
            .find(|id| !self.session.products.iter().any(|product| &product.id == *id));
        match unknown {
            Some(id) => Err(DomainError::UnknownProduct(id.clone()).into()),
            None => Ok(()),
        }
    }
}

/// Splits a comma-separated id list; blanks are ignored.
pub fn parse_ids(raw: &str) -> BTreeSet<ProductId> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| ProductId(id.to_string()))
        .collect()
}

fn exit_code_for(error: &ApplicationError) -> u8 {
    match error {
        ApplicationError::Configuration(_) => 2,
        ApplicationError::Persistence(_) => 3,
        ApplicationError::Domain(_) => 4,
        ApplicationError::Snapshot(_) => 5,
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

#[cfg(test)]
mod tests {
    use chanprice_core::{ApplicationError, ProductId, SnapshotError};
    use serde::Serialize;
    use serde_json::Value;

    use super::{parse_ids, CommandResult};

    #[test]
    fn parse_ids_trims_and_drops_blanks() {
        let ids = parse_ids(" sku-2, sku-1,,sku-2 ");
        let ids = ids.into_iter().map(|id| id.0).collect::<Vec<_>>();
        assert_eq!(ids, vec!["sku-1".to_string(), "sku-2".to_string()]);
    }

    #[test]
    fn report_flattens_data_beside_status() {
        #[derive(Serialize)]
        struct Summary {
            applied: usize,
        }

        let result = CommandResult::report("apply-tier", "ok", 0, &Summary { applied: 3 });
        let payload: Value = serde_json::from_str(&result.output).expect("valid json");
        assert_eq!(payload["command"], "apply-tier");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["applied"], 3);
    }

    #[test]
    fn snapshot_errors_map_to_their_own_exit_code() {
        let error = ApplicationError::from(SnapshotError::MissingEntries {
            missing: vec![ProductId("sku-9".to_string())],
        });
        let result = CommandResult::from_error("revert", &error);
        let payload: Value = serde_json::from_str(&result.output).expect("valid json");

        assert_eq!(result.exit_code, 5);
        assert_eq!(payload["error_class"], "snapshot");
        assert!(payload["message"].as_str().unwrap_or_default().contains("sku-9"));
    }
}
