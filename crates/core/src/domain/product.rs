use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::discount::TierSlot;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One catalog line item. Base prices are operator inputs; everything under
/// `metrics` is owned by the engine and rebuilt on every recomputation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub org_price: Decimal,
    #[serde(default)]
    pub shop_price: Decimal,
    #[serde(default)]
    pub global_price: Decimal,
    /// Manual replacement for the channel-converted `org_price`.
    #[serde(default)]
    pub adjusted_cost: Option<Decimal>,
    #[serde(default)]
    pub metrics: ComputedMetrics,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputedMetrics {
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
    pub logistics_cost: Option<Decimal>,
    pub expected_commission_fee: Option<Decimal>,
    pub expected_commission_fee_rate: Option<Decimal>,
    pub expected_settlement_amount: Option<Decimal>,
    pub expected_net_profit: Option<Decimal>,
    pub expected_net_profit_margin: Option<Decimal>,
    pub cost_ratio: Option<Decimal>,
}

/// Price fields a discount tier may read as its base or hurdle target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceField {
    #[serde(rename = "shop_price")]
    ShopPrice,
    #[serde(rename = "global_price")]
    GlobalPrice,
    #[serde(rename = "pricing_price")]
    PricingPrice,
    #[serde(rename = "discount_price")]
    DiscountPrice,
    #[serde(rename = "coupon_price_1")]
    CouponPrice1,
    #[serde(rename = "coupon_price_2")]
    CouponPrice2,
    #[serde(rename = "coupon_price_3")]
    CouponPrice3,
}

impl PriceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShopPrice => "shop_price",
            Self::GlobalPrice => "global_price",
            Self::PricingPrice => "pricing_price",
            Self::DiscountPrice => "discount_price",
            Self::CouponPrice1 => "coupon_price_1",
            Self::CouponPrice2 => "coupon_price_2",
            Self::CouponPrice3 => "coupon_price_3",
        }
    }
}

impl Product {
    pub fn new(id: impl Into<String>, org_price: Decimal, shop_price: Decimal) -> Self {
        Self {
            id: ProductId(id.into()),
            name: String::new(),
            org_price,
            shop_price,
            global_price: Decimal::ZERO,
            adjusted_cost: None,
            metrics: ComputedMetrics::default(),
        }
    }

    pub fn field(&self, field: PriceField) -> Option<Decimal> {
        match field {
            PriceField::ShopPrice => Some(self.shop_price),
            PriceField::GlobalPrice => Some(self.global_price),
            PriceField::PricingPrice => self.metrics.pricing_price,
            PriceField::DiscountPrice => self.metrics.discount_price,
            PriceField::CouponPrice1 => self.metrics.coupon_price_1,
            PriceField::CouponPrice2 => self.metrics.coupon_price_2,
            PriceField::CouponPrice3 => self.metrics.coupon_price_3,
        }
    }

    /// Reads a price field, treating an absent value as zero.
    pub fn price_at(&self, field: PriceField) -> Decimal {
        self.field(field).unwrap_or(Decimal::ZERO)
    }

    /// The most downstream price present in the cascade.
    pub fn final_price(&self) -> Option<Decimal> {
        self.metrics
            .coupon_price_3
            .or(self.metrics.coupon_price_2)
            .or(self.metrics.coupon_price_1)
            .or(self.metrics.discount_price)
            .or(self.metrics.pricing_price)
    }
}

impl ComputedMetrics {
    pub fn tier_price(&self, slot: TierSlot) -> Option<Decimal> {
        match slot {
            TierSlot::Immediate => self.discount_price,
            TierSlot::Coupon1 => self.coupon_price_1,
            TierSlot::Coupon2 => self.coupon_price_2,
            TierSlot::Coupon3 => self.coupon_price_3,
        }
    }

    pub fn set_tier_result(&mut self, slot: TierSlot, price: Decimal, self_burden: Decimal) {
        let (price_slot, burden_slot) = match slot {
            TierSlot::Immediate => (&mut self.discount_price, &mut self.immediate_self_burden),
            TierSlot::Coupon1 => (&mut self.coupon_price_1, &mut self.self_burden_1),
            TierSlot::Coupon2 => (&mut self.coupon_price_2, &mut self.self_burden_2),
            TierSlot::Coupon3 => (&mut self.coupon_price_3, &mut self.self_burden_3),
        };
        *price_slot = Some(price);
        *burden_slot = Some(self_burden);
        self.refresh_burden_total();
    }

    /// Coupon self-burdens only; the immediate discount burden is kept apart.
    pub fn refresh_burden_total(&mut self) {
        self.discount_burden_amount = [self.self_burden_1, self.self_burden_2, self.self_burden_3]
            .into_iter()
            .map(|value| value.unwrap_or(Decimal::ZERO))
            .try_fold(Decimal::ZERO, |total, burden| total.checked_add(burden));
    }

    pub fn clear_cascade(&mut self) {
        self.discount_price = None;
        self.coupon_price_1 = None;
        self.coupon_price_2 = None;
        self.coupon_price_3 = None;
        self.immediate_self_burden = None;
        self.self_burden_1 = None;
        self.self_burden_2 = None;
        self.self_burden_3 = None;
        self.discount_burden_amount = None;
    }
}
