use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chanprice_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use toml::Value;

use crate::commands::CommandResult;

#[derive(Debug, Serialize)]
struct ConfigEntry {
    key: String,
    value: String,
    source: String,
}

#[derive(Debug, Serialize)]
struct ConfigReport {
    precedence: &'static str,
    entries: Vec<ConfigEntry>,
    overrides: Vec<ConfigEntry>,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries = vec![
        entry(
            "pricing.domestic_vat_divisor",
            config.pricing.domestic_vat_divisor.to_string(),
            source(
                "pricing.domestic_vat_divisor",
                &["CHANPRICE_PRICING_DOMESTIC_VAT_DIVISOR"],
            ),
        ),
        entry(
            "pricing.fee_discount_points",
            config.pricing.fee_discount_points.to_string(),
            source("pricing.fee_discount_points", &["CHANPRICE_PRICING_FEE_DISCOUNT_POINTS"]),
        ),
        entry(
            "data.session_path",
            config.data.session_path.display().to_string(),
            source("data.session_path", &["CHANPRICE_DATA_SESSION_PATH"]),
        ),
        entry(
            "data.channels_path",
            config.data.channels_path.display().to_string(),
            source("data.channels_path", &["CHANPRICE_DATA_CHANNELS_PATH"]),
        ),
        entry(
            "data.snapshot_dir",
            config.data.snapshot_dir.display().to_string(),
            source("data.snapshot_dir", &["CHANPRICE_DATA_SNAPSHOT_DIR"]),
        ),
        entry(
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["CHANPRICE_LOGGING_LEVEL", "CHANPRICE_LOG_LEVEL"]),
        ),
        entry(
            "logging.format",
            config.logging.format.as_str().to_string(),
            source("logging.format", &["CHANPRICE_LOGGING_FORMAT", "CHANPRICE_LOG_FORMAT"]),
        ),
    ];

    let configured = config
        .overrides
        .iter()
        .map(|override_entry| override_entry.channel_id.clone())
        .collect::<Vec<_>>();
    let overrides = config
        .pricing_overrides()
        .iter()
        .map(|(channel_id, adjustments)| {
            let source = if configured.contains(channel_id) {
                let file_path = config_file_path
                    .as_deref()
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                format!("file ({file_path})")
            } else {
                "default".to_string()
            };
            entry(&format!("overrides.{channel_id}"), describe_override(adjustments), source)
        })
        .collect();

    CommandResult::report(
        "config",
        "ok",
        0,
        &ConfigReport { precedence: "override > env > file > default", entries, overrides },
    )
}

fn describe_override(adjustments: &chanprice_core::ChannelOverride) -> String {
    let mut parts = Vec::new();
    if let Some(multiplier) = adjustments.price_multiplier {
        parts.push(format!("price_multiplier={multiplier}"));
    }
    if adjustments.includes_amazon_shipping {
        parts.push("includes_amazon_shipping".to_string());
    }
    if adjustments.amazon_logistics {
        parts.push("amazon_logistics".to_string());
    }
    if parts.is_empty() {
        return "<none>".to_string();
    }
    parts.join(", ")
}

fn entry(key: &str, value: String, source: String) -> ConfigEntry {
    ConfigEntry { key: key.to_string(), value, source }
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("chanprice.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/chanprice.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

#[cfg(test)]
mod tests {
    use chanprice_core::ChannelOverride;
    use rust_decimal::Decimal;
    use toml::Value;

    use super::{contains_path, describe_override};

    #[test]
    fn nested_keys_are_found_in_the_file_document() {
        let doc = "[pricing]\nfee_discount_points = \"2\"\n".parse::<Value>().expect("valid toml");
        assert!(contains_path(&doc, "pricing.fee_discount_points"));
        assert!(!contains_path(&doc, "pricing.domestic_vat_divisor"));
        assert!(!contains_path(&doc, "logging.level"));
    }

    #[test]
    fn overrides_are_described_by_their_active_flags() {
        assert_eq!(
            describe_override(&ChannelOverride::amazon()),
            "includes_amazon_shipping, amazon_logistics"
        );
        assert_eq!(
            describe_override(&ChannelOverride::multiplier(Decimal::new(93, 2))),
            "price_multiplier=0.93"
        );
        assert_eq!(describe_override(&ChannelOverride::default()), "<none>");
    }
}
