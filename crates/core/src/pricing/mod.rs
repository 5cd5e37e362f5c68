pub mod cascade;
pub mod channel_price;
pub mod logistics;
pub mod margin;
pub mod numeric;
pub mod overrides;
pub mod snapshot;

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::channel::{ChannelConfig, ChannelDirectory, DeliveryType};
use crate::domain::discount::{CascadePlan, DiscountTierConfig, TierSlot};
use crate::domain::product::{Product, ProductId};
use crate::domain::session::PricingSession;
use crate::errors::DomainError;

use self::{
    cascade::{apply_discount_tier, apply_discount_tier_with_report, TierApplication},
    channel_price::resolve_channel_price,
    logistics::resolve_logistics_cost,
    margin::compute_metrics,
    overrides::PricingOverrides,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSettings {
    /// Divisor turning a VAT-inclusive domestic cost into a net cost.
    pub domestic_vat_divisor: Decimal,
    /// Percentage points taken off the commission rate when the fee discount is on.
    pub fee_discount_points: Decimal,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self { domestic_vat_divisor: Decimal::new(11, 1), fee_discount_points: Decimal::ONE }
    }
}

/// Everything outside the product rows that pricing depends on.
#[derive(Clone, Debug, PartialEq)]
pub struct PricingContext {
    pub channel: Option<ChannelConfig>,
    pub delivery_type: DeliveryType,
    pub fee_discount_enabled: bool,
    pub amazon_shipping_override: Option<Decimal>,
    pub overrides: PricingOverrides,
    pub settings: PricingSettings,
}

impl PricingContext {
    pub fn new(channel: Option<ChannelConfig>) -> Self {
        Self {
            channel,
            delivery_type: DeliveryType::default(),
            fee_discount_enabled: false,
            amazon_shipping_override: None,
            overrides: PricingOverrides::standard(),
            settings: PricingSettings::default(),
        }
    }

    /// Builds the context a stored session describes. A session that names a
    /// channel the directory does not know is rejected; one without a channel
    /// yields an unpriced context.
    pub fn from_session(
        session: &PricingSession,
        directory: &ChannelDirectory,
        overrides: PricingOverrides,
        settings: PricingSettings,
    ) -> Result<Self, DomainError> {
        let channel = match &session.channel_id {
            Some(channel_id) => Some(
                directory
                    .find(channel_id)
                    .cloned()
                    .ok_or_else(|| DomainError::UnknownChannel(channel_id.clone()))?,
            ),
            None => None,
        };

        Ok(Self {
            channel,
            delivery_type: session.delivery_type,
            fee_discount_enabled: session.fee_discount_enabled,
            amazon_shipping_override: session.amazon_shipping_override,
            overrides,
            settings,
        })
    }

    pub fn with_delivery_type(mut self, delivery_type: DeliveryType) -> Self {
        self.delivery_type = delivery_type;
        self
    }

    pub fn with_fee_discount(mut self, enabled: bool) -> Self {
        self.fee_discount_enabled = enabled;
        self
    }

    pub fn with_amazon_shipping_override(mut self, shipping: Option<Decimal>) -> Self {
        self.amazon_shipping_override = shipping;
        self
    }

    pub fn with_overrides(mut self, overrides: PricingOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_settings(mut self, settings: PricingSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn channel(&self) -> Option<&ChannelConfig> {
        self.channel.as_ref()
    }

    pub fn channel_price(&self, product: &Product) -> Option<Decimal> {
        resolve_channel_price(product, self.channel()?, &self.overrides)
    }

    pub fn logistics_cost(&self) -> Option<Decimal> {
        resolve_logistics_cost(
            self.channel()?,
            self.delivery_type,
            self.amazon_shipping_override,
            &self.overrides,
        )
    }
}

pub trait PricingEngine: Send + Sync {
    fn recompute_all(
        &self,
        products: &[Product],
        context: &PricingContext,
        plan: &CascadePlan,
    ) -> Vec<Product>;

    fn apply_tier(
        &self,
        products: &[Product],
        selected: &BTreeSet<ProductId>,
        tier: &DiscountTierConfig,
        slot: TierSlot,
        context: &PricingContext,
    ) -> TierApplication;
}

#[derive(Default)]
pub struct DeterministicPricingEngine;

impl PricingEngine for DeterministicPricingEngine {
    fn recompute_all(
        &self,
        products: &[Product],
        context: &PricingContext,
        plan: &CascadePlan,
    ) -> Vec<Product> {
        recompute_all(products, context, plan)
    }

    fn apply_tier(
        &self,
        products: &[Product],
        selected: &BTreeSet<ProductId>,
        tier: &DiscountTierConfig,
        slot: TierSlot,
        context: &PricingContext,
    ) -> TierApplication {
        apply_tier_with_metrics(products, selected, tier, slot, context)
    }
}

/// Rebuilds every derived field: channel price, the cascade plan replayed in
/// order, logistics, and the margin metrics.
pub fn recompute_all(
    products: &[Product],
    context: &PricingContext,
    plan: &CascadePlan,
) -> Vec<Product> {
    let mut repriced = products
        .iter()
        .map(|product| {
            let mut next = product.clone();
            next.metrics.clear_cascade();
            next.metrics.pricing_price = context.channel_price(&next);
            next
        })
        .collect::<Vec<_>>();

    for step in plan.steps() {
        repriced = apply_discount_tier(&repriced, &step.targets, &step.config, step.slot);
    }

    for product in &mut repriced {
        product.metrics = compute_metrics(product, context);
    }

    info!(
        event_name = "pricing.recompute.completed",
        channel_id = context.channel().map(|channel| channel.id.0.as_str()).unwrap_or("none"),
        delivery_type = context.delivery_type.as_str(),
        fee_discount_enabled = context.fee_discount_enabled,
        products = repriced.len(),
        unpriced = repriced.iter().filter(|p| p.metrics.pricing_price.is_none()).count(),
        plan_steps = plan.len(),
        "pricing recomputed"
    );
    repriced
}

/// One tier application followed by a metrics refresh of the products it changed.
pub fn apply_tier_with_metrics(
    products: &[Product],
    selected: &BTreeSet<ProductId>,
    tier: &DiscountTierConfig,
    slot: TierSlot,
    context: &PricingContext,
) -> TierApplication {
    let mut application = apply_discount_tier_with_report(products, selected, tier, slot);
    let touched = application.touched_ids();
    for product in &mut application.products {
        if touched.contains(&product.id) {
            product.metrics = compute_metrics(product, context);
        }
    }
    application
}
