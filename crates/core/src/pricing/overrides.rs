use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::channel::ChannelId;

pub const AMAZON_US_CHANNEL: &str = "amazon-us";

/// Identity-keyed adjustments layered on top of the general channel formulas.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelOverride {
    /// Applied to overseas prices after rounding.
    #[serde(default)]
    pub price_multiplier: Option<Decimal>,
    /// Adds the channel's `amazon_shipping_cost` to the japan/own-shop price.
    #[serde(default)]
    pub includes_amazon_shipping: bool,
    /// Switches logistics to the Amazon per-unit shipping rules.
    #[serde(default)]
    pub amazon_logistics: bool,
}

impl ChannelOverride {
    pub fn multiplier(price_multiplier: Decimal) -> Self {
        Self { price_multiplier: Some(price_multiplier), ..Self::default() }
    }

    pub fn amazon() -> Self {
        Self { price_multiplier: None, includes_amazon_shipping: true, amazon_logistics: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PricingOverrides {
    entries: BTreeMap<ChannelId, ChannelOverride>,
}

impl PricingOverrides {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The Amazon-US registration every deployment carries.
    pub fn standard() -> Self {
        let mut overrides = Self::empty();
        overrides.register(ChannelId::new(AMAZON_US_CHANNEL), ChannelOverride::amazon());
        overrides
    }

    pub fn register(&mut self, channel_id: ChannelId, channel_override: ChannelOverride) {
        self.entries.insert(channel_id, channel_override);
    }

    pub fn get(&self, channel_id: &ChannelId) -> Option<&ChannelOverride> {
        self.entries.get(channel_id)
    }

    pub fn price_multiplier(&self, channel_id: &ChannelId) -> Option<Decimal> {
        self.get(channel_id).and_then(|entry| entry.price_multiplier)
    }

    pub fn includes_amazon_shipping(&self, channel_id: &ChannelId) -> bool {
        self.get(channel_id).is_some_and(|entry| entry.includes_amazon_shipping)
    }

    pub fn amazon_logistics(&self, channel_id: &ChannelId) -> bool {
        self.get(channel_id).is_some_and(|entry| entry.amazon_logistics)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChannelId, &ChannelOverride)> {
        self.entries.iter()
    }
}
