use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::domain::channel::{ChannelConfig, ChannelType, LooseNumber};
use crate::domain::product::Product;
use crate::pricing::numeric::floor_to;
use crate::pricing::overrides::PricingOverrides;

/// Channel list price for `product`, or `None` when the channel cannot price it.
pub fn resolve_channel_price(
    product: &Product,
    channel: &ChannelConfig,
    overrides: &PricingOverrides,
) -> Option<Decimal> {
    let Some(channel_type) = channel.channel_type else {
        return unpriced(channel, "missing type");
    };
    let markup_ratio = required_number(channel, "markup_ratio", channel.markup_ratio.as_ref())?;
    let exchange_rate =
        required_number(channel, "applied_exchange_rate", channel.applied_exchange_rate.as_ref())?;

    let price = match channel_type {
        ChannelType::Domestic => product.shop_price.checked_add(markup_ratio),
        ChannelType::JapanOrOwnShop => {
            let Some(precision) = channel.rounddown else {
                return unpriced(channel, "rounddown disabled");
            };
            let Some(converted) = product.global_price.checked_div(exchange_rate) else {
                return unpriced(channel, "zero exchange rate");
            };
            let shipping = if overrides.includes_amazon_shipping(&channel.id) {
                channel.amazon_shipping_cost.unwrap_or(Decimal::ZERO)
            } else {
                Decimal::ZERO
            };
            floor_to(converted, precision)
                .and_then(|price| price.checked_add(channel.digit_adjustment()))
                .and_then(|price| price.checked_add(shipping))
        }
        ChannelType::Overseas => {
            let Some(precision) = channel.rounddown else {
                return unpriced(channel, "rounddown disabled");
            };
            let Some(scaled) = product.shop_price.checked_mul(markup_ratio) else {
                return unpriced(channel, "amount out of range");
            };
            let Some(converted) = scaled.checked_div(exchange_rate) else {
                return unpriced(channel, "zero exchange rate");
            };
            let adjusted = floor_to(converted, precision)
                .and_then(|price| price.checked_add(channel.digit_adjustment()));
            match overrides.price_multiplier(&channel.id) {
                Some(multiplier) => adjusted
                    .and_then(|price| price.checked_mul(multiplier))
                    .and_then(|price| floor_to(price, precision)),
                None => adjusted,
            }
        }
    };
    let Some(price) = price else {
        return unpriced(channel, "amount out of range");
    };

    Some(match channel.min_price {
        Some(min_price) => price.max(min_price),
        None => price,
    })
}

fn required_number(
    channel: &ChannelConfig,
    field: &'static str,
    value: Option<&LooseNumber>,
) -> Option<Decimal> {
    let Some(value) = value else {
        debug!(
            event_name = "pricing.channel_price.unpriced",
            channel_id = %channel.id,
            field,
            "channel field missing; price left unset"
        );
        return None;
    };

    let parsed = value.value();
    if parsed.is_none() {
        warn!(
            event_name = "pricing.channel_price.invalid_number",
            channel_id = %channel.id,
            field,
            raw = %value.raw(),
            "channel field is not numeric; price left unset"
        );
    }
    parsed
}

fn unpriced(channel: &ChannelConfig, reason: &'static str) -> Option<Decimal> {
    debug!(
        event_name = "pricing.channel_price.unpriced",
        channel_id = %channel.id,
        reason,
        "channel cannot price products"
    );
    None
}
