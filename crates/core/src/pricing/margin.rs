use rust_decimal::Decimal;

use crate::domain::product::{ComputedMetrics, Product};
use crate::pricing::numeric::{percent_of, ratio_or_zero};
use crate::pricing::PricingContext;

/// `org_price` converted to the channel currency.
pub fn base_cost(product: &Product, context: &PricingContext) -> Option<Decimal> {
    let channel = context.channel()?;
    let divisor = if channel.is_domestic() {
        context.settings.domestic_vat_divisor
    } else {
        channel.exchange_rate()?
    };
    product.org_price.checked_div(divisor)
}

/// The operator's manual cost when set, otherwise the converted base cost.
pub fn adjusted_cost(product: &Product, context: &PricingContext) -> Option<Decimal> {
    product.adjusted_cost.or_else(|| base_cost(product, context))
}

/// Commission percentage after the optional fee discount, never below zero.
pub fn effective_fee_rate(context: &PricingContext) -> Option<Decimal> {
    let average_fee_rate = context.channel()?.average_fee_rate?;
    if context.fee_discount_enabled {
        let discounted = average_fee_rate.checked_sub(context.settings.fee_discount_points)?;
        return Some(discounted.max(Decimal::ZERO));
    }
    Some(average_fee_rate)
}

pub fn compute_commission_fee(product: &Product, context: &PricingContext) -> Option<Decimal> {
    percent_of(product.final_price()?, effective_fee_rate(context)?)
}

pub fn compute_settlement_amount(product: &Product, context: &PricingContext) -> Option<Decimal> {
    product.final_price()?.checked_sub(compute_commission_fee(product, context)?)
}

pub fn compute_net_profit(product: &Product, context: &PricingContext) -> Option<Decimal> {
    let settlement = compute_settlement_amount(product, context)?;
    settlement
        .checked_sub(adjusted_cost(product, context)?)?
        .checked_sub(context.logistics_cost()?)
}

/// Net profit over final price; zero when the final price is zero.
pub fn compute_profit_margin(product: &Product, context: &PricingContext) -> Option<Decimal> {
    let net_profit = compute_net_profit(product, context)?;
    let final_price = product.final_price()?;
    if final_price.is_zero() {
        return Some(Decimal::ZERO);
    }
    Some(ratio_or_zero(net_profit, final_price))
}

/// Adjusted cost over the price left after the coupon self-burden; zero when
/// the final price is zero.
pub fn compute_cost_ratio(product: &Product, context: &PricingContext) -> Option<Decimal> {
    context.channel()?;
    let cost = adjusted_cost(product, context)?;
    let final_price = product.final_price()?;
    if final_price.is_zero() {
        return Some(Decimal::ZERO);
    }
    let burden = product.metrics.discount_burden_amount.unwrap_or(Decimal::ZERO);
    Some(ratio_or_zero(cost, final_price.checked_sub(burden)?))
}

/// Rebuilds logistics and every margin metric; cascade fields are kept as they are.
pub fn compute_metrics(product: &Product, context: &PricingContext) -> ComputedMetrics {
    let mut metrics = product.metrics.clone();
    metrics.logistics_cost = context.logistics_cost();
    metrics.expected_commission_fee_rate = effective_fee_rate(context);
    metrics.expected_commission_fee = compute_commission_fee(product, context);
    metrics.expected_settlement_amount = compute_settlement_amount(product, context);
    metrics.expected_net_profit = compute_net_profit(product, context);
    metrics.expected_net_profit_margin = compute_profit_margin(product, context);
    metrics.cost_ratio = compute_cost_ratio(product, context);
    metrics
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{
        adjusted_cost, base_cost, compute_commission_fee, compute_cost_ratio, compute_metrics,
        compute_net_profit, compute_profit_margin, compute_settlement_amount, effective_fee_rate,
    };
    use crate::domain::channel::{ChannelConfig, ChannelType, DeliveryType, LooseNumber};
    use crate::domain::product::Product;
    use crate::pricing::PricingContext;

    fn domestic() -> ChannelConfig {
        let mut channel = ChannelConfig::new("home-mall", ChannelType::Domestic);
        channel.markup_ratio = Some(LooseNumber::from("3,000"));
        channel.applied_exchange_rate = Some(LooseNumber::from("1"));
        channel.average_fee_rate = Some(Decimal::from(10));
        channel.free_shipping = Some(Decimal::from(3_000));
        channel.conditional_shipping = Some(Decimal::from(2_500));
        channel
    }

    fn product(final_price: i64) -> Product {
        let mut product = Product::new("sku-1", Decimal::from(11_000), Decimal::from(29_000));
        product.metrics.pricing_price = Some(Decimal::from(32_000));
        product.metrics.coupon_price_1 = Some(Decimal::from(final_price));
        product
    }

    #[test]
    fn domestic_cost_strips_vat() {
        let context = PricingContext::new(Some(domestic()));
        assert_eq!(base_cost(&product(28_800), &context), Some(Decimal::from(10_000)));
    }

    #[test]
    fn overseas_cost_uses_exchange_rate() {
        let mut channel = ChannelConfig::new("shop-sg", ChannelType::Overseas);
        channel.applied_exchange_rate = Some(LooseNumber::from("1,000"));
        let context = PricingContext::new(Some(channel));
        assert_eq!(base_cost(&product(28_800), &context), Some(Decimal::from(11)));
    }

    #[test]
    fn manual_cost_wins_over_base_cost() {
        let context = PricingContext::new(Some(domestic()));
        let mut product = product(28_800);
        product.adjusted_cost = Some(Decimal::from(9_000));
        assert_eq!(adjusted_cost(&product, &context), Some(Decimal::from(9_000)));
    }

    #[test]
    fn fee_discount_lowers_the_rate_but_not_below_zero() {
        let context = PricingContext::new(Some(domestic())).with_fee_discount(true);
        assert_eq!(effective_fee_rate(&context), Some(Decimal::from(9)));

        let mut channel = domestic();
        channel.average_fee_rate = Some(Decimal::new(5, 1));
        let context = PricingContext::new(Some(channel)).with_fee_discount(true);
        assert_eq!(effective_fee_rate(&context), Some(Decimal::ZERO));
    }

    #[test]
    fn settlement_and_net_profit_chain_from_final_price() {
        let context = PricingContext::new(Some(domestic()));
        let product = product(28_800);

        assert_eq!(compute_commission_fee(&product, &context), Some(Decimal::from(2_880)));
        assert_eq!(compute_settlement_amount(&product, &context), Some(Decimal::from(25_920)));
        // 25920 - 10000 - 3000
        assert_eq!(compute_net_profit(&product, &context), Some(Decimal::from(12_920)));

        let conditional = context.with_delivery_type(DeliveryType::Conditional);
        assert_eq!(compute_net_profit(&product, &conditional), Some(Decimal::from(13_420)));
    }

    #[test]
    fn margin_and_cost_ratio_guard_zero_price() {
        let context = PricingContext::new(Some(domestic()));
        let product = product(0);

        assert_eq!(compute_profit_margin(&product, &context), Some(Decimal::ZERO));
        assert_eq!(compute_cost_ratio(&product, &context), Some(Decimal::ZERO));
    }

    #[test]
    fn zero_final_price_with_a_coupon_burden_keeps_ratios_at_zero() {
        let context = PricingContext::new(Some(domestic()));
        let mut product = product(0);
        product.metrics.self_burden_1 = Some(Decimal::from(500));
        product.metrics.discount_burden_amount = Some(Decimal::from(500));

        assert_eq!(compute_profit_margin(&product, &context), Some(Decimal::ZERO));
        assert_eq!(compute_cost_ratio(&product, &context), Some(Decimal::ZERO));
    }

    #[test]
    fn oversized_amounts_leave_metrics_unset() {
        let context = PricingContext::new(Some(domestic()));
        let mut product = product(0);
        product.metrics.coupon_price_1 = Some(Decimal::MIN);

        assert_eq!(compute_commission_fee(&product, &context), None);
        assert_eq!(compute_net_profit(&product, &context), None);
    }

    #[test]
    fn cost_ratio_nets_out_the_coupon_burden() {
        let context = PricingContext::new(Some(domestic()));
        let mut product = product(20_500);
        product.metrics.discount_burden_amount = Some(Decimal::from(500));
        assert_eq!(compute_cost_ratio(&product, &context), Some(Decimal::new(5, 1)));
    }

    #[test]
    fn missing_channel_leaves_every_metric_unset() {
        let context = PricingContext::new(None);
        let metrics = compute_metrics(&product(28_800), &context);

        assert_eq!(metrics.expected_commission_fee, None);
        assert_eq!(metrics.expected_net_profit, None);
        assert_eq!(metrics.expected_net_profit_margin, None);
        assert_eq!(metrics.cost_ratio, None);
        assert_eq!(metrics.logistics_cost, None);
        assert_eq!(metrics.coupon_price_1, Some(Decimal::from(28_800)));
    }
}
