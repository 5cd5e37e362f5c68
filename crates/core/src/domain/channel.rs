use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::pricing::numeric::{parse_loose_decimal, PRECISION_RANGE};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Domestic,
    Overseas,
    #[serde(alias = "japan", alias = "own_shop")]
    JapanOrOwnShop,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Domestic => "domestic",
            Self::Overseas => "overseas",
            Self::JapanOrOwnShop => "japan_or_own_shop",
        }
    }
}

/// A channel numeric field as stored upstream: either a plain number or
/// operator-entered text that may carry thousands separators.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(Decimal),
    Text(String),
}

impl LooseNumber {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(raw) => parse_loose_decimal(raw),
        }
    }

    pub fn raw(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(raw) => raw.clone(),
        }
    }
}

impl From<Decimal> for LooseNumber {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for LooseNumber {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: ChannelId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub channel_type: Option<ChannelType>,
    #[serde(default)]
    pub markup_ratio: Option<LooseNumber>,
    #[serde(default)]
    pub applied_exchange_rate: Option<LooseNumber>,
    /// Decimal precision for floor rounding; `None` leaves the channel unpriced
    /// for overseas and japan/own-shop channels.
    #[serde(default)]
    pub rounddown: Option<i32>,
    #[serde(default)]
    pub digit_adjustment: Option<Decimal>,
    /// Baseline commission, in percent.
    #[serde(default)]
    pub average_fee_rate: Option<Decimal>,
    #[serde(default)]
    pub free_shipping: Option<Decimal>,
    #[serde(default)]
    pub conditional_shipping: Option<Decimal>,
    #[serde(default)]
    pub amazon_shipping_cost: Option<Decimal>,
    #[serde(default)]
    pub min_price: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl ChannelConfig {
    pub fn new(id: impl Into<String>, channel_type: ChannelType) -> Self {
        Self {
            id: ChannelId(id.into()),
            name: String::new(),
            channel_type: Some(channel_type),
            markup_ratio: None,
            applied_exchange_rate: None,
            rounddown: None,
            digit_adjustment: None,
            average_fee_rate: None,
            free_shipping: None,
            conditional_shipping: None,
            amazon_shipping_cost: None,
            min_price: None,
            currency: None,
        }
    }

    pub fn markup_ratio(&self) -> Option<Decimal> {
        self.markup_ratio.as_ref().and_then(LooseNumber::value)
    }

    pub fn exchange_rate(&self) -> Option<Decimal> {
        self.applied_exchange_rate.as_ref().and_then(LooseNumber::value)
    }

    pub fn digit_adjustment(&self) -> Decimal {
        self.digit_adjustment.unwrap_or(Decimal::ZERO)
    }

    pub fn is_domestic(&self) -> bool {
        self.channel_type == Some(ChannelType::Domestic)
    }

    /// Strict check for operator tooling. Pricing itself never calls this and
    /// degrades to "unpriced" instead.
    pub fn validate(&self) -> Result<(), DomainError> {
        let channel_type = self.channel_type.ok_or_else(|| DomainError::MissingChannelField {
            channel_id: self.id.clone(),
            field: "type",
        })?;

        self.require_number("markup_ratio", self.markup_ratio.as_ref())?;
        let exchange_rate =
            self.require_number("applied_exchange_rate", self.applied_exchange_rate.as_ref())?;
        if exchange_rate.is_zero() {
            return Err(DomainError::InvalidChannelField {
                channel_id: self.id.clone(),
                field: "applied_exchange_rate",
                value: exchange_rate.to_string(),
            });
        }

        if channel_type != ChannelType::Domestic && self.rounddown.is_none() {
            return Err(DomainError::MissingChannelField {
                channel_id: self.id.clone(),
                field: "rounddown",
            });
        }
        if let Some(rounddown) = self.rounddown.filter(|value| !PRECISION_RANGE.contains(value)) {
            return Err(DomainError::InvalidChannelField {
                channel_id: self.id.clone(),
                field: "rounddown",
                value: rounddown.to_string(),
            });
        }

        if self.average_fee_rate.is_none() {
            return Err(DomainError::MissingChannelField {
                channel_id: self.id.clone(),
                field: "average_fee_rate",
            });
        }

        Ok(())
    }

    fn require_number(
        &self,
        field: &'static str,
        value: Option<&LooseNumber>,
    ) -> Result<Decimal, DomainError> {
        let value = value.ok_or_else(|| DomainError::MissingChannelField {
            channel_id: self.id.clone(),
            field,
        })?;
        value.value().ok_or_else(|| DomainError::InvalidChannelField {
            channel_id: self.id.clone(),
            field,
            value: value.raw(),
        })
    }
}

/// The channel-directory collaborator's resolved output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelDirectory {
    channels: Vec<ChannelConfig>,
}

impl ChannelDirectory {
    pub fn new(channels: Vec<ChannelConfig>) -> Self {
        Self { channels }
    }

    pub fn find(&self, channel_id: &ChannelId) -> Option<&ChannelConfig> {
        self.channels.iter().find(|channel| &channel.id == channel_id)
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    #[default]
    Free,
    Conditional,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Conditional => "conditional",
        }
    }
}

impl std::str::FromStr for DeliveryType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "conditional" => Ok(Self::Conditional),
            other => Err(DomainError::InvariantViolation(format!(
                "unsupported delivery type `{other}` (expected free|conditional)"
            ))),
        }
    }
}

/// Number of decimals shown for amounts in a channel currency.
pub fn display_precision(currency: Option<&str>) -> u32 {
    match currency.map(|code| code.trim().to_ascii_uppercase()).as_deref() {
        Some("KRW" | "JPY" | "TWD" | "VND" | "IDR") => 0,
        _ => 2,
    }
}
