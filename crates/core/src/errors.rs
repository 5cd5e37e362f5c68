use thiserror::Error;

use crate::domain::channel::ChannelId;
use crate::domain::product::ProductId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("channel `{channel_id}` is missing required field `{field}`")]
    MissingChannelField { channel_id: ChannelId, field: &'static str },
    #[error("channel `{channel_id}` has non-numeric `{field}`: `{value}`")]
    InvalidChannelField { channel_id: ChannelId, field: &'static str, value: String },
    #[error("unknown channel `{0}`")]
    UnknownChannel(ChannelId),
    #[error("unknown product `{0}`")]
    UnknownProduct(ProductId),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot format version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("snapshot does not cover selected products: {}", join_ids(.missing))]
    MissingEntries { missing: Vec<ProductId> },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable classifier surfaced to operators and automation.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::MissingChannelField { .. })
            | Self::Domain(DomainError::InvalidChannelField { .. }) => "channel_config",
            Self::Domain(DomainError::UnknownChannel(_))
            | Self::Domain(DomainError::UnknownProduct(_)) => "unknown_reference",
            Self::Domain(DomainError::InvariantViolation(_)) => "domain_validation",
            Self::Snapshot(_) => "snapshot",
            Self::Persistence(_) => "persistence",
            Self::Configuration(_) => "config_validation",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(_) | Self::Snapshot(_) => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Persistence(_) => "Results were computed but could not be saved. Please retry.",
            Self::Configuration(_) => "The tool is misconfigured. Check the configuration file.",
        }
    }
}

fn join_ids(ids: &[ProductId]) -> String {
    ids.iter().map(|id| id.0.as_str()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use crate::domain::channel::ChannelId;
    use crate::domain::product::ProductId;
    use crate::errors::{ApplicationError, DomainError, SnapshotError};

    #[test]
    fn channel_field_errors_classify_as_channel_config() {
        let error = ApplicationError::from(DomainError::MissingChannelField {
            channel_id: ChannelId::new("amazon-us"),
            field: "rounddown",
        });

        assert_eq!(error.error_class(), "channel_config");
        assert_eq!(
            error.to_string(),
            "channel `amazon-us` is missing required field `rounddown`"
        );
    }

    #[test]
    fn snapshot_errors_list_missing_products() {
        let error = ApplicationError::from(SnapshotError::MissingEntries {
            missing: vec![ProductId("sku-1".to_string()), ProductId("sku-9".to_string())],
        });

        assert_eq!(error.error_class(), "snapshot");
        assert_eq!(error.to_string(), "snapshot does not cover selected products: sku-1, sku-9");
    }

    #[test]
    fn persistence_error_has_user_safe_message() {
        let error = ApplicationError::Persistence("disk full".to_string());
        assert_eq!(
            error.user_message(),
            "Results were computed but could not be saved. Please retry."
        );
    }
}
