use std::collections::BTreeSet;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::product::{PriceField, ProductId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierSlot {
    Immediate,
    Coupon1,
    Coupon2,
    Coupon3,
}

impl TierSlot {
    pub const ORDERED: [TierSlot; 4] =
        [Self::Immediate, Self::Coupon1, Self::Coupon2, Self::Coupon3];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Coupon1 => "coupon1",
            Self::Coupon2 => "coupon2",
            Self::Coupon3 => "coupon3",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "immediate" => Some(Self::Immediate),
            "coupon1" => Some(Self::Coupon1),
            "coupon2" => Some(Self::Coupon2),
            "coupon3" => Some(Self::Coupon3),
            _ => None,
        }
    }

    pub fn output_field(&self) -> PriceField {
        match self {
            Self::Immediate => PriceField::DiscountPrice,
            Self::Coupon1 => PriceField::CouponPrice1,
            Self::Coupon2 => PriceField::CouponPrice2,
            Self::Coupon3 => PriceField::CouponPrice3,
        }
    }

    /// Double-coupon mode is a coupon feature; the immediate discount has no second definition.
    pub fn supports_second_coupon(&self) -> bool {
        !matches!(self, Self::Immediate)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Amount,
    Rate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    #[default]
    Floor,
    Ceil,
    Round,
}

impl RoundType {
    pub fn strategy(&self) -> RoundingStrategy {
        match self {
            Self::Floor => RoundingStrategy::ToNegativeInfinity,
            Self::Ceil => RoundingStrategy::ToPositiveInfinity,
            Self::Round => RoundingStrategy::MidpointAwayFromZero,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapType {
    /// The cap bounds the discount amount from above; a zero cap means uncapped.
    #[default]
    Max,
    /// A computed discount at or below the cap is replaced by exactly the cap.
    Fixed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountDefinition {
    #[serde(default)]
    pub hurdle_target: Option<PriceField>,
    #[serde(default)]
    pub hurdle_amount: Decimal,
    pub discount_base: PriceField,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    /// `None` skips rounding after the rate multiplication.
    #[serde(default)]
    pub decimal_point: Option<i32>,
    #[serde(default)]
    pub round_type: RoundType,
    #[serde(default)]
    pub discount_cap: Decimal,
    #[serde(default)]
    pub discount_cap_type: CapType,
}

impl DiscountDefinition {
    pub fn amount(discount_base: PriceField, discount_value: Decimal) -> Self {
        Self {
            hurdle_target: None,
            hurdle_amount: Decimal::ZERO,
            discount_base,
            discount_type: DiscountType::Amount,
            discount_value,
            decimal_point: None,
            round_type: RoundType::Floor,
            discount_cap: Decimal::ZERO,
            discount_cap_type: CapType::Max,
        }
    }

    pub fn rate(discount_base: PriceField, discount_value: Decimal) -> Self {
        Self { discount_type: DiscountType::Rate, ..Self::amount(discount_base, discount_value) }
    }

    pub fn with_hurdle(mut self, hurdle_amount: Decimal) -> Self {
        self.hurdle_amount = hurdle_amount;
        self
    }

    pub fn with_cap(mut self, discount_cap: Decimal, discount_cap_type: CapType) -> Self {
        self.discount_cap = discount_cap;
        self.discount_cap_type = discount_cap_type;
        self
    }

    pub fn with_rounding(mut self, decimal_point: i32, round_type: RoundType) -> Self {
        self.decimal_point = Some(decimal_point);
        self.round_type = round_type;
        self
    }

    /// Field checked against `hurdle_amount`; defaults to the discount base.
    pub fn hurdle_field(&self) -> PriceField {
        self.hurdle_target.unwrap_or(self.discount_base)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountTierConfig {
    #[serde(flatten)]
    pub definition: DiscountDefinition,
    /// Percent of the discount the merchant absorbs.
    #[serde(default)]
    pub self_ratio: Decimal,
    #[serde(default)]
    pub second_coupon: Option<DiscountDefinition>,
}

impl DiscountTierConfig {
    pub fn new(definition: DiscountDefinition) -> Self {
        Self { definition, self_ratio: Decimal::ZERO, second_coupon: None }
    }

    pub fn with_self_ratio(mut self, self_ratio: Decimal) -> Self {
        self.self_ratio = self_ratio;
        self
    }

    pub fn with_second_coupon(mut self, second_coupon: DiscountDefinition) -> Self {
        self.second_coupon = Some(second_coupon);
        self
    }
}

/// One recorded tier application: which products it targeted and with what policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedTier {
    pub slot: TierSlot,
    pub config: DiscountTierConfig,
    pub targets: BTreeSet<ProductId>,
}

/// Ordered tier applications. Replaying the plan over freshly priced products
/// rebuilds every cascade output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CascadePlan {
    steps: Vec<PlannedTier>,
}

impl CascadePlan {
    pub fn new(steps: Vec<PlannedTier>) -> Self {
        Self { steps }
    }

    pub fn push(
        &mut self,
        slot: TierSlot,
        config: DiscountTierConfig,
        targets: BTreeSet<ProductId>,
    ) {
        self.steps.push(PlannedTier { slot, config, targets });
    }

    pub fn steps(&self) -> &[PlannedTier] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Removes `product_ids` from every step recorded at or after `position`,
    /// dropping steps left without targets.
    pub fn forget_targets_from(&mut self, position: usize, product_ids: &BTreeSet<ProductId>) {
        let mut index = 0;
        self.steps.retain_mut(|step| {
            let keep = if index >= position {
                step.targets.retain(|id| !product_ids.contains(id));
                !step.targets.is_empty()
            } else {
                true
            };
            index += 1;
            keep
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rust_decimal::Decimal;

    use super::{
        CapType, CascadePlan, DiscountDefinition, DiscountTierConfig, DiscountType, TierSlot,
    };
    use crate::domain::product::{PriceField, ProductId};

    fn ids(values: &[&str]) -> BTreeSet<ProductId> {
        values.iter().map(|value| ProductId((*value).to_string())).collect()
    }

    #[test]
    fn tier_config_reads_camel_case_documents() {
        let config: DiscountTierConfig = serde_json::from_str(
            r#"{
                "hurdleAmount": "10000",
                "discountBase": "pricing_price",
                "discountType": "rate",
                "discountValue": 5,
                "discountCap": 1000,
                "discountCapType": "fixed",
                "selfRatio": 50,
                "secondCoupon": {
                    "hurdleAmount": 50000,
                    "discountBase": "pricing_price",
                    "discountType": "amount",
                    "discountValue": 5000
                }
            }"#,
        )
        .expect("tier document should parse");

        assert_eq!(config.definition.discount_type, DiscountType::Rate);
        assert_eq!(config.definition.discount_cap_type, CapType::Fixed);
        assert_eq!(config.definition.hurdle_field(), PriceField::PricingPrice);
        assert_eq!(config.self_ratio, Decimal::from(50));
        let second = config.second_coupon.expect("second coupon should be present");
        assert_eq!(second.discount_value, Decimal::from(5_000));
        assert_eq!(second.decimal_point, None);
    }

    #[test]
    fn slots_map_to_their_output_fields() {
        assert_eq!(TierSlot::Immediate.output_field(), PriceField::DiscountPrice);
        assert_eq!(TierSlot::Coupon3.output_field(), PriceField::CouponPrice3);
        assert!(!TierSlot::Immediate.supports_second_coupon());
        assert_eq!(TierSlot::parse("Coupon2"), Some(TierSlot::Coupon2));
    }

    #[test]
    fn forgetting_targets_only_touches_later_steps() {
        let config = DiscountTierConfig::new(DiscountDefinition::amount(
            PriceField::PricingPrice,
            Decimal::from(100),
        ));
        let mut plan = CascadePlan::default();
        plan.push(TierSlot::Immediate, config.clone(), ids(&["a", "b"]));
        plan.push(TierSlot::Coupon1, config.clone(), ids(&["a"]));
        plan.push(TierSlot::Coupon2, config, ids(&["a", "b"]));

        plan.forget_targets_from(1, &ids(&["a"]));

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.steps()[0].targets, ids(&["a", "b"]));
        assert_eq!(plan.steps()[1].slot, TierSlot::Coupon2);
        assert_eq!(plan.steps()[1].targets, ids(&["b"]));
    }
}
