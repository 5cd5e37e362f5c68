use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::product::{ComputedMetrics, ProductId};

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Fields a snapshot never freezes. Logistics follows the live delivery selection.
pub const EXCLUDED_FIELDS: &[&str] = &["logistics_cost"];

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotId(pub String);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Every `ComputedMetrics` field except the excluded ones.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrozenMetrics {
    pub pricing_price: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    pub coupon_price_1: Option<Decimal>,
    pub coupon_price_2: Option<Decimal>,
    pub coupon_price_3: Option<Decimal>,
    pub immediate_self_burden: Option<Decimal>,
    pub self_burden_1: Option<Decimal>,
    pub self_burden_2: Option<Decimal>,
    pub self_burden_3: Option<Decimal>,
    pub discount_burden_amount: Option<Decimal>,
    pub expected_commission_fee: Option<Decimal>,
    pub expected_commission_fee_rate: Option<Decimal>,
    pub expected_settlement_amount: Option<Decimal>,
    pub expected_net_profit: Option<Decimal>,
    pub expected_net_profit_margin: Option<Decimal>,
    pub cost_ratio: Option<Decimal>,
}

impl From<&ComputedMetrics> for FrozenMetrics {
    fn from(metrics: &ComputedMetrics) -> Self {
        Self {
            pricing_price: metrics.pricing_price,
            discount_price: metrics.discount_price,
            coupon_price_1: metrics.coupon_price_1,
            coupon_price_2: metrics.coupon_price_2,
            coupon_price_3: metrics.coupon_price_3,
            immediate_self_burden: metrics.immediate_self_burden,
            self_burden_1: metrics.self_burden_1,
            self_burden_2: metrics.self_burden_2,
            self_burden_3: metrics.self_burden_3,
            discount_burden_amount: metrics.discount_burden_amount,
            expected_commission_fee: metrics.expected_commission_fee,
            expected_commission_fee_rate: metrics.expected_commission_fee_rate,
            expected_settlement_amount: metrics.expected_settlement_amount,
            expected_net_profit: metrics.expected_net_profit,
            expected_net_profit_margin: metrics.expected_net_profit_margin,
            cost_ratio: metrics.cost_ratio,
        }
    }
}

impl FrozenMetrics {
    /// Writes the frozen fields back; `logistics_cost` is left for the caller.
    pub fn restore_into(&self, metrics: &mut ComputedMetrics) {
        metrics.pricing_price = self.pricing_price;
        metrics.discount_price = self.discount_price;
        metrics.coupon_price_1 = self.coupon_price_1;
        metrics.coupon_price_2 = self.coupon_price_2;
        metrics.coupon_price_3 = self.coupon_price_3;
        metrics.immediate_self_burden = self.immediate_self_burden;
        metrics.self_burden_1 = self.self_burden_1;
        metrics.self_burden_2 = self.self_burden_2;
        metrics.self_burden_3 = self.self_burden_3;
        metrics.discount_burden_amount = self.discount_burden_amount;
        metrics.expected_commission_fee = self.expected_commission_fee;
        metrics.expected_commission_fee_rate = self.expected_commission_fee_rate;
        metrics.expected_settlement_amount = self.expected_settlement_amount;
        metrics.expected_net_profit = self.expected_net_profit;
        metrics.expected_net_profit_margin = self.expected_net_profit_margin;
        metrics.cost_ratio = self.cost_ratio;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub id: SnapshotId,
    pub version: u32,
    pub captured_at: DateTime<Utc>,
    /// Cascade plan length when the snapshot was taken.
    #[serde(default)]
    pub plan_position: usize,
    pub entries: BTreeMap<ProductId, FrozenMetrics>,
}

impl PricingSnapshot {
    pub fn covers(&self, product_id: &ProductId) -> bool {
        self.entries.contains_key(product_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use std::collections::BTreeSet;

    use super::{FrozenMetrics, EXCLUDED_FIELDS};
    use crate::domain::product::ComputedMetrics;

    fn field_names<T: serde::Serialize>(value: &T) -> BTreeSet<String> {
        match serde_json::to_value(value).expect("metrics should serialize") {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            other => panic!("expected an object, got {other}"),
        }
    }

    #[test]
    fn frozen_metrics_cover_every_field_but_the_excluded_ones() {
        let live = field_names(&ComputedMetrics::default());
        let frozen = field_names(&FrozenMetrics::default());

        for excluded in EXCLUDED_FIELDS {
            assert!(live.contains(*excluded), "`{excluded}` is a computed field");
            assert!(!frozen.contains(*excluded), "`{excluded}` must not be frozen");
        }
        let expected = live
            .into_iter()
            .filter(|field| !EXCLUDED_FIELDS.contains(&field.as_str()))
            .collect::<BTreeSet<_>>();
        assert_eq!(frozen, expected);
    }

    #[test]
    fn restore_leaves_logistics_untouched() {
        let original = ComputedMetrics {
            pricing_price: Some(Decimal::from(32_000)),
            coupon_price_1: Some(Decimal::from(28_800)),
            logistics_cost: Some(Decimal::from(3_000)),
            ..ComputedMetrics::default()
        };
        let frozen = FrozenMetrics::from(&original);

        let mut live = ComputedMetrics {
            coupon_price_1: Some(Decimal::from(20_000)),
            logistics_cost: Some(Decimal::from(4_500)),
            ..ComputedMetrics::default()
        };
        frozen.restore_into(&mut live);

        assert_eq!(live.coupon_price_1, Some(Decimal::from(28_800)));
        assert_eq!(live.pricing_price, Some(Decimal::from(32_000)));
        assert_eq!(live.logistics_cost, Some(Decimal::from(4_500)));
    }
}
