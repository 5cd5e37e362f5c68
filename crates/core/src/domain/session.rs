use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::channel::{ChannelId, DeliveryType};
use crate::domain::discount::CascadePlan;
use crate::domain::divider::DividerRule;
use crate::domain::product::Product;

/// The per-operator document exchanged with the document store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingSession {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub fee_discount_enabled: bool,
    #[serde(default)]
    pub amazon_shipping_override: Option<Decimal>,
    #[serde(default)]
    pub plan: CascadePlan,
    #[serde(default)]
    pub dividers: Vec<DividerRule>,
}
