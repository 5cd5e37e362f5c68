use chanprice_core::domain::channel::display_precision;
use chanprice_core::domain::divider::{label_for_row, DividerRule};
use chanprice_core::{
    ApplicationError, ComputedMetrics, DeterministicPricingEngine, PricingEngine, Product,
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::commands::{CommandResult, DataPaths, Workspace};

const RATIO_DECIMALS: u32 = 4;

#[derive(Debug, Serialize)]
pub struct ProductRow {
    pub row: usize,
    pub product_id: String,
    pub name: String,
    pub divider: Option<String>,
    pub final_price: Option<Decimal>,
    pub metrics: ComputedMetrics,
}

#[derive(Debug, Serialize)]
struct PriceReport {
    channel_id: Option<String>,
    delivery_type: &'static str,
    fee_discount_enabled: bool,
    display_precision: u32,
    plan_steps: usize,
    unpriced: usize,
    products: Vec<ProductRow>,
}

pub fn run(paths: DataPaths) -> CommandResult {
    match execute(&paths) {
        Ok(report) => CommandResult::report("price", "ok", 0, &report),
        Err(error) => CommandResult::from_error("price", &error),
    }
}

fn execute(paths: &DataPaths) -> Result<PriceReport, ApplicationError> {
    let mut workspace = Workspace::open(paths)?;
    let engine = DeterministicPricingEngine;
    workspace.session.products = engine.recompute_all(
        &workspace.session.products,
        &workspace.context,
        &workspace.session.plan,
    );
    workspace.save()?;

    let precision = currency_precision(&workspace);
    let session = &workspace.session;
    let products = product_rows(&session.products, &session.dividers, precision);
    Ok(PriceReport {
        channel_id: session.channel_id.as_ref().map(ToString::to_string),
        delivery_type: workspace.context.delivery_type.as_str(),
        fee_discount_enabled: workspace.context.fee_discount_enabled,
        display_precision: precision,
        plan_steps: session.plan.len(),
        unpriced: products.iter().filter(|row| row.metrics.pricing_price.is_none()).count(),
        products,
    })
}

pub fn currency_precision(workspace: &Workspace) -> u32 {
    display_precision(workspace.context.channel().and_then(|channel| channel.currency.as_deref()))
}

/// Rows are numbered from 1 in session order, the numbering dividers refer to.
pub fn product_rows(
    products: &[Product],
    dividers: &[DividerRule],
    precision: u32,
) -> Vec<ProductRow> {
    products
        .iter()
        .enumerate()
        .map(|(index, product)| {
            let row = index + 1;
            ProductRow {
                row,
                product_id: product.id.to_string(),
                name: product.name.clone(),
                divider: label_for_row(dividers, row).map(|rule| rule.label.clone()),
                final_price: product.final_price().map(|value| money(value, precision)),
                metrics: for_display(&product.metrics, precision),
            }
        })
        .collect()
}

/// Amounts are rounded to the currency precision and ratios to four places.
/// Stored values stay unrounded.
pub fn for_display(metrics: &ComputedMetrics, precision: u32) -> ComputedMetrics {
    let amount = |value: Option<Decimal>| value.map(|value| money(value, precision));
    let ratio = |value: Option<Decimal>| value.map(|value| money(value, RATIO_DECIMALS));

    ComputedMetrics {
        pricing_price: amount(metrics.pricing_price),
        discount_price: amount(metrics.discount_price),
        coupon_price_1: amount(metrics.coupon_price_1),
        coupon_price_2: amount(metrics.coupon_price_2),
        coupon_price_3: amount(metrics.coupon_price_3),
        immediate_self_burden: amount(metrics.immediate_self_burden),
        self_burden_1: amount(metrics.self_burden_1),
        self_burden_2: amount(metrics.self_burden_2),
        self_burden_3: amount(metrics.self_burden_3),
        discount_burden_amount: amount(metrics.discount_burden_amount),
        logistics_cost: amount(metrics.logistics_cost),
        expected_commission_fee: amount(metrics.expected_commission_fee),
        expected_commission_fee_rate: ratio(metrics.expected_commission_fee_rate),
        expected_settlement_amount: amount(metrics.expected_settlement_amount),
        expected_net_profit: amount(metrics.expected_net_profit),
        expected_net_profit_margin: ratio(metrics.expected_net_profit_margin),
        cost_ratio: ratio(metrics.cost_ratio),
    }
}

fn money(value: Decimal, precision: u32) -> Decimal {
    value.round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero).normalize()
}
