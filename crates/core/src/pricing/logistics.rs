use rust_decimal::Decimal;

use crate::domain::channel::{ChannelConfig, DeliveryType};
use crate::pricing::overrides::PricingOverrides;

/// Per-unit shipping cost in the channel currency.
///
/// Amazon-registered channels charge `amazon_override` (falling back to the
/// channel's own `amazon_shipping_cost`) once for conditional delivery and
/// twice for free delivery. Every other channel converts its configured
/// shipping cost with the applied exchange rate. A missing shipping amount
/// counts as zero; a missing or zero exchange rate makes the cost uncomputable.
pub fn resolve_logistics_cost(
    channel: &ChannelConfig,
    delivery_type: DeliveryType,
    amazon_override: Option<Decimal>,
    overrides: &PricingOverrides,
) -> Option<Decimal> {
    if overrides.amazon_logistics(&channel.id) {
        let shipping =
            amazon_override.or(channel.amazon_shipping_cost).unwrap_or(Decimal::ZERO);
        return match delivery_type {
            DeliveryType::Free => shipping.checked_mul(Decimal::TWO),
            DeliveryType::Conditional => Some(shipping),
        };
    }

    let shipping = match delivery_type {
        DeliveryType::Free => channel.free_shipping,
        DeliveryType::Conditional => channel.conditional_shipping,
    }
    .unwrap_or(Decimal::ZERO);

    shipping.checked_div(channel.exchange_rate()?)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::resolve_logistics_cost;
    use crate::domain::channel::{ChannelConfig, ChannelType, DeliveryType, LooseNumber};
    use crate::pricing::overrides::{PricingOverrides, AMAZON_US_CHANNEL};

    fn overseas() -> ChannelConfig {
        let mut channel = ChannelConfig::new("shop-sg", ChannelType::Overseas);
        channel.applied_exchange_rate = Some(LooseNumber::from("1,000"));
        channel.free_shipping = Some(Decimal::from(5_000));
        channel.conditional_shipping = Some(Decimal::from(3_000));
        channel
    }

    #[test]
    fn regular_channels_convert_shipping_by_exchange_rate() {
        let overrides = PricingOverrides::standard();
        assert_eq!(
            resolve_logistics_cost(&overseas(), DeliveryType::Free, None, &overrides),
            Some(Decimal::from(5))
        );
        assert_eq!(
            resolve_logistics_cost(&overseas(), DeliveryType::Conditional, None, &overrides),
            Some(Decimal::from(3))
        );
    }

    #[test]
    fn amazon_free_delivery_doubles_the_override() {
        let mut amazon = ChannelConfig::new(AMAZON_US_CHANNEL, ChannelType::JapanOrOwnShop);
        amazon.amazon_shipping_cost = Some(Decimal::new(450, 2));
        let overrides = PricingOverrides::standard();

        assert_eq!(
            resolve_logistics_cost(&amazon, DeliveryType::Free, Some(Decimal::from(6)), &overrides),
            Some(Decimal::from(12))
        );
        assert_eq!(
            resolve_logistics_cost(
                &amazon,
                DeliveryType::Conditional,
                Some(Decimal::from(6)),
                &overrides
            ),
            Some(Decimal::from(6))
        );
        assert_eq!(
            resolve_logistics_cost(&amazon, DeliveryType::Conditional, None, &overrides),
            Some(Decimal::new(450, 2))
        );
    }

    #[test]
    fn zero_or_missing_exchange_rate_is_uncomputable() {
        let mut channel = overseas();
        channel.applied_exchange_rate = Some(LooseNumber::from("0"));
        assert_eq!(
            resolve_logistics_cost(&channel, DeliveryType::Free, None, &PricingOverrides::empty()),
            None
        );

        channel.applied_exchange_rate = None;
        assert_eq!(
            resolve_logistics_cost(&channel, DeliveryType::Free, None, &PricingOverrides::empty()),
            None
        );
    }
}
