use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::channel::ChannelId;
use crate::pricing::overrides::{ChannelOverride, PricingOverrides};
use crate::pricing::PricingSettings;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub pricing: PricingSettings,
    pub overrides: Vec<ChannelOverrideEntry>,
    pub data: DataConfig,
    pub logging: LoggingConfig,
}

/// One `[[overrides]]` table: a channel identity plus what it changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOverrideEntry {
    pub channel_id: ChannelId,
    #[serde(flatten)]
    pub adjustments: ChannelOverride,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub session_path: PathBuf,
    pub channels_path: PathBuf,
    pub snapshot_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub session_path: Option<PathBuf>,
    pub channels_path: Option<PathBuf>,
    pub snapshot_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pricing: PricingSettings::default(),
            overrides: Vec::new(),
            data: DataConfig {
                session_path: PathBuf::from("session.json"),
                channels_path: PathBuf::from("channels.json"),
                snapshot_dir: PathBuf::from("snapshots"),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("chanprice.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// The built-in registry with every configured entry layered on top.
    /// A configured entry replaces a built-in one for the same channel.
    pub fn pricing_overrides(&self) -> PricingOverrides {
        let mut registry = PricingOverrides::standard();
        for entry in &self.overrides {
            registry.register(entry.channel_id.clone(), entry.adjustments.clone());
        }
        registry
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(pricing) = patch.pricing {
            if let Some(domestic_vat_divisor) = pricing.domestic_vat_divisor {
                self.pricing.domestic_vat_divisor = domestic_vat_divisor;
            }
            if let Some(fee_discount_points) = pricing.fee_discount_points {
                self.pricing.fee_discount_points = fee_discount_points;
            }
        }

        if let Some(overrides) = patch.overrides {
            self.overrides = overrides;
        }

        if let Some(data) = patch.data {
            if let Some(session_path) = data.session_path {
                self.data.session_path = session_path;
            }
            if let Some(channels_path) = data.channels_path {
                self.data.channels_path = channels_path;
            }
            if let Some(snapshot_dir) = data.snapshot_dir {
                self.data.snapshot_dir = snapshot_dir;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("CHANPRICE_PRICING_DOMESTIC_VAT_DIVISOR") {
            self.pricing.domestic_vat_divisor =
                parse_decimal("CHANPRICE_PRICING_DOMESTIC_VAT_DIVISOR", &value)?;
        }
        if let Some(value) = read_env("CHANPRICE_PRICING_FEE_DISCOUNT_POINTS") {
            self.pricing.fee_discount_points =
                parse_decimal("CHANPRICE_PRICING_FEE_DISCOUNT_POINTS", &value)?;
        }

        if let Some(value) = read_env("CHANPRICE_DATA_SESSION_PATH") {
            self.data.session_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("CHANPRICE_DATA_CHANNELS_PATH") {
            self.data.channels_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("CHANPRICE_DATA_SNAPSHOT_DIR") {
            self.data.snapshot_dir = PathBuf::from(value);
        }

        let log_level =
            read_env("CHANPRICE_LOGGING_LEVEL").or_else(|| read_env("CHANPRICE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CHANPRICE_LOGGING_FORMAT").or_else(|| read_env("CHANPRICE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(session_path) = overrides.session_path {
            self.data.session_path = session_path;
        }
        if let Some(channels_path) = overrides.channels_path {
            self.data.channels_path = channels_path;
        }
        if let Some(snapshot_dir) = overrides.snapshot_dir {
            self.data.snapshot_dir = snapshot_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pricing(&self.pricing)?;
        validate_overrides(&self.overrides)?;
        validate_data(&self.data)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("chanprice.toml"), PathBuf::from("config/chanprice.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_pricing(pricing: &PricingSettings) -> Result<(), ConfigError> {
    if pricing.domestic_vat_divisor <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.domestic_vat_divisor must be greater than zero".to_string(),
        ));
    }

    if pricing.fee_discount_points < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "pricing.fee_discount_points must not be negative".to_string(),
        ));
    }

    Ok(())
}

fn validate_overrides(overrides: &[ChannelOverrideEntry]) -> Result<(), ConfigError> {
    for entry in overrides {
        if entry.channel_id.0.trim().is_empty() {
            return Err(ConfigError::Validation(
                "overrides.channel_id must not be empty".to_string(),
            ));
        }
        if let Some(multiplier) = entry.adjustments.price_multiplier {
            if multiplier <= Decimal::ZERO {
                return Err(ConfigError::Validation(format!(
                    "overrides.price_multiplier for `{}` must be greater than zero",
                    entry.channel_id
                )));
            }
        }
    }

    Ok(())
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    let paths = [
        ("data.session_path", &data.session_path),
        ("data.channels_path", &data.channels_path),
        ("data.snapshot_dir", &data.snapshot_dir),
    ];
    for (key, path) in paths {
        if path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(format!("{key} must not be empty")));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    pricing: Option<PricingPatch>,
    overrides: Option<Vec<ChannelOverrideEntry>>,
    data: Option<DataPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    domestic_vat_divisor: Option<Decimal>,
    fee_discount_points: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    session_path: Option<PathBuf>,
    channels_path: Option<PathBuf>,
    snapshot_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::channel::ChannelId;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_cover_pricing_settings_and_amazon_override() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            config.pricing.domestic_vat_divisor == Decimal::new(11, 1),
            "default VAT divisor should be 1.1",
        )?;
        ensure(config.pricing.fee_discount_points == Decimal::ONE, "fee discount is one point")?;
        ensure(
            config.pricing_overrides().amazon_logistics(&ChannelId::new("amazon-us")),
            "amazon-us should be registered by default",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_CHANPRICE_DATA_ROOT", "/srv/pricing");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("chanprice.toml");
            fs::write(
                &path,
                r#"
[data]
session_path = "${TEST_CHANPRICE_DATA_ROOT}/session.json"
channels_path = "${TEST_CHANPRICE_DATA_ROOT}/channels.json"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.session_path == PathBuf::from("/srv/pricing/session.json"),
                "session path should be interpolated from environment",
            )?;
            ensure(
                config.data.channels_path == PathBuf::from("/srv/pricing/channels.json"),
                "channels path should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_CHANPRICE_DATA_ROOT"]);
        result
    }

    #[test]
    fn configured_overrides_layer_on_the_builtin_registry() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("chanprice.toml");
        fs::write(
            &path,
            r#"
[[overrides]]
channel_id = "shop-sg"
price_multiplier = "0.93"

[[overrides]]
channel_id = "amazon-jp"
includes_amazon_shipping = true
"#,
        )
        .map_err(|err| err.to_string())?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;
        let registry = config.pricing_overrides();

        ensure(
            registry.price_multiplier(&ChannelId::new("shop-sg")) == Some(Decimal::new(93, 2)),
            "configured multiplier should be registered",
        )?;
        ensure(
            registry.includes_amazon_shipping(&ChannelId::new("amazon-jp")),
            "configured amazon shipping flag should be registered",
        )?;
        ensure(
            !registry.amazon_logistics(&ChannelId::new("amazon-jp")),
            "unset flags should default to false",
        )?;
        ensure(
            registry.amazon_logistics(&ChannelId::new("amazon-us")),
            "builtin entries should survive configured ones",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CHANPRICE_LOG_LEVEL", "warn");
        env::set_var("CHANPRICE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["CHANPRICE_LOG_LEVEL", "CHANPRICE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CHANPRICE_DATA_SESSION_PATH", "from-env.json");
        env::set_var("CHANPRICE_PRICING_FEE_DISCOUNT_POINTS", "2");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("chanprice.toml");
            fs::write(
                &path,
                r#"
[pricing]
domestic_vat_divisor = "1.08"
fee_discount_points = "0.5"

[data]
session_path = "from-file.json"
snapshot_dir = "file-snapshots"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    snapshot_dir: Some(PathBuf::from("override-snapshots")),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.pricing.domestic_vat_divisor == Decimal::new(108, 2),
                "file VAT divisor should win over the default",
            )?;
            ensure(
                config.pricing.fee_discount_points == Decimal::TWO,
                "env fee points should win over the file",
            )?;
            ensure(
                config.data.session_path == PathBuf::from("from-env.json"),
                "env session path should win over the file",
            )?;
            ensure(
                config.data.snapshot_dir == PathBuf::from("override-snapshots"),
                "override snapshot dir should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            Ok(())
        })();

        clear_vars(&["CHANPRICE_DATA_SESSION_PATH", "CHANPRICE_PRICING_FEE_DISCOUNT_POINTS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CHANPRICE_PRICING_DOMESTIC_VAT_DIVISOR", "0");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("domestic_vat_divisor")
            );
            ensure(has_message, "validation failure should mention domestic_vat_divisor")
        })();

        clear_vars(&["CHANPRICE_PRICING_DOMESTIC_VAT_DIVISOR"]);
        result
    }

    #[test]
    fn malformed_env_number_is_reported_with_its_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("CHANPRICE_PRICING_FEE_DISCOUNT_POINTS", "one");

        let result = (|| -> Result<(), String> {
            match AppConfig::load(LoadOptions::default()) {
                Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                    key == "CHANPRICE_PRICING_FEE_DISCOUNT_POINTS",
                    "error should name the offending variable",
                ),
                Err(other) => Err(format!("unexpected error: {other}")),
                Ok(_) => Err("expected an invalid env override error".to_string()),
            }
        })();

        clear_vars(&["CHANPRICE_PRICING_FEE_DISCOUNT_POINTS"]);
        result
    }
}
