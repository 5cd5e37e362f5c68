//! Discount tiers: immediate discount followed by up to three coupons.
//!
//! A tier reads its base from whichever price field its definition names and
//! writes into its own slot. Chaining coupon1 onto the immediate discount is a
//! configuration convention; nothing here assumes it.

use std::collections::BTreeSet;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::discount::{
    CapType, DiscountDefinition, DiscountTierConfig, DiscountType, TierSlot,
};
use crate::domain::product::{Product, ProductId};
use crate::pricing::numeric::{percent_of, round_to};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedDefinition {
    Primary,
    Secondary,
}

/// Price movement produced by one discount definition, before any hurdle check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscountComputation {
    pub base_price: Decimal,
    pub new_price: Decimal,
    pub discount_amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TierOutcome {
    Applied {
        definition: AppliedDefinition,
        base_price: Decimal,
        new_price: Decimal,
        discount_amount: Decimal,
        self_burden: Decimal,
    },
    BelowHurdle {
        hurdle_price: Decimal,
        hurdle_amount: Decimal,
    },
    /// The discount arithmetic left the representable range; the product
    /// passes through unchanged.
    OutOfRange {
        definition: AppliedDefinition,
        base_price: Decimal,
    },
}

impl TierOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierReportLine {
    pub product_id: ProductId,
    #[serde(flatten)]
    pub outcome: TierOutcome,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TierApplication {
    pub slot: TierSlot,
    pub products: Vec<Product>,
    pub report: Vec<TierReportLine>,
}

impl TierApplication {
    pub fn applied_count(&self) -> usize {
        self.report.iter().filter(|line| line.outcome.is_applied()).count()
    }

    pub fn touched_ids(&self) -> BTreeSet<ProductId> {
        self.report
            .iter()
            .filter(|line| line.outcome.is_applied())
            .map(|line| line.product_id.clone())
            .collect()
    }
}

/// Applies `tier` into `slot` for the selected products. Products outside the
/// selection, and selected products that miss the hurdle, come back unchanged.
pub fn apply_discount_tier(
    products: &[Product],
    selected: &BTreeSet<ProductId>,
    tier: &DiscountTierConfig,
    slot: TierSlot,
) -> Vec<Product> {
    apply_discount_tier_with_report(products, selected, tier, slot).products
}

pub fn apply_discount_tier_with_report(
    products: &[Product],
    selected: &BTreeSet<ProductId>,
    tier: &DiscountTierConfig,
    slot: TierSlot,
) -> TierApplication {
    if tier.second_coupon.is_some() && !slot.supports_second_coupon() {
        warn!(
            event_name = "pricing.cascade.second_coupon_ignored",
            slot = slot.as_str(),
            "second coupon is only honoured on coupon tiers"
        );
    }

    let mut report = Vec::new();
    let updated = products
        .iter()
        .map(|product| {
            if !selected.contains(&product.id) {
                return product.clone();
            }

            let outcome = evaluate_tier(product, tier, slot);
            let mut next = product.clone();
            if let TierOutcome::Applied { new_price, self_burden, .. } = &outcome {
                next.metrics.set_tier_result(slot, *new_price, *self_burden);
            }
            report.push(TierReportLine { product_id: product.id.clone(), outcome });
            next
        })
        .collect::<Vec<_>>();

    let application = TierApplication { slot, products: updated, report };
    info!(
        event_name = "pricing.cascade.tier_applied",
        slot = slot.as_str(),
        selected = selected.len(),
        evaluated = application.report.len(),
        applied = application.applied_count(),
        "discount tier applied"
    );
    application
}

/// Decides which definition (if any) applies to `product` and what it yields.
pub fn evaluate_tier(product: &Product, tier: &DiscountTierConfig, slot: TierSlot) -> TierOutcome {
    let primary = &tier.definition;
    let second = tier.second_coupon.as_ref().filter(|_| slot.supports_second_coupon());

    let selection = match second {
        Some(second) => select_double_coupon(product, primary, second),
        None => {
            let hurdle_price = product.price_at(primary.hurdle_field());
            if hurdle_price < primary.hurdle_amount {
                Err(TierOutcome::BelowHurdle { hurdle_price, hurdle_amount: primary.hurdle_amount })
            } else {
                Ok((AppliedDefinition::Primary, primary))
            }
        }
    };

    let (definition_kind, definition) = match selection {
        Ok(selected) => selected,
        Err(outcome) => {
            debug!(
                event_name = "pricing.cascade.below_hurdle",
                product_id = %product.id,
                slot = slot.as_str(),
                "product below tier hurdle; passing through"
            );
            return outcome;
        }
    };

    let applied = compute_discount(product, definition).and_then(|computation| {
        let burden = self_burden(computation.discount_amount, tier.self_ratio)?;
        Some(TierOutcome::Applied {
            definition: definition_kind,
            base_price: computation.base_price,
            new_price: computation.new_price,
            discount_amount: computation.discount_amount,
            self_burden: burden,
        })
    });

    applied.unwrap_or_else(|| {
        warn!(
            event_name = "pricing.cascade.out_of_range",
            product_id = %product.id,
            slot = slot.as_str(),
            "discount arithmetic out of range; passing through"
        );
        TierOutcome::OutOfRange {
            definition: definition_kind,
            base_price: product.price_at(definition.discount_base),
        }
    })
}

/// The primary definition owns `[primary.hurdle, second.hurdle)` on its own
/// hurdle field; the second owns everything at or above its hurdle on its field.
fn select_double_coupon<'a>(
    product: &Product,
    primary: &'a DiscountDefinition,
    second: &'a DiscountDefinition,
) -> Result<(AppliedDefinition, &'a DiscountDefinition), TierOutcome> {
    let second_price = product.price_at(second.hurdle_field());
    if second_price >= second.hurdle_amount {
        return Ok((AppliedDefinition::Secondary, second));
    }

    let primary_price = product.price_at(primary.hurdle_field());
    if primary_price >= primary.hurdle_amount && primary_price < second.hurdle_amount {
        return Ok((AppliedDefinition::Primary, primary));
    }

    Err(TierOutcome::BelowHurdle {
        hurdle_price: primary_price,
        hurdle_amount: primary.hurdle_amount,
    })
}

/// Steps 2 and 3 of a tier: the discounted price ignoring eligibility. `None`
/// when an intermediate amount does not fit in a `Decimal`.
pub fn compute_discount(
    product: &Product,
    definition: &DiscountDefinition,
) -> Option<DiscountComputation> {
    let base_price = product.price_at(definition.discount_base);

    let new_price = match definition.discount_type {
        DiscountType::Amount => base_price.checked_sub(definition.discount_value)?,
        DiscountType::Rate => rate_discounted_price(base_price, definition)?,
    };

    Some(DiscountComputation {
        base_price,
        new_price,
        discount_amount: base_price.checked_sub(new_price)?,
    })
}

fn rate_discounted_price(base_price: Decimal, definition: &DiscountDefinition) -> Option<Decimal> {
    let keep = Decimal::ONE.checked_sub(percent_of(Decimal::ONE, definition.discount_value)?)?;
    let multiplied = base_price.checked_mul(keep)?;
    let raw_discounted = match definition.decimal_point {
        Some(precision) => round_to(multiplied, precision, definition.round_type.strategy())?,
        None => multiplied,
    };
    let raw_discount = base_price.checked_sub(raw_discounted)?;
    let cap = definition.discount_cap;

    match definition.discount_cap_type {
        CapType::Max if cap.is_zero() => Some(raw_discounted),
        CapType::Max => Some(base_price.checked_sub(cap)?.max(raw_discounted)),
        // Below the cap the discount is forced up to exactly the cap.
        CapType::Fixed if raw_discount > cap => Some(raw_discounted),
        CapType::Fixed => base_price.checked_sub(cap),
    }
}

/// Merchant share of a discount, floored to whole units.
pub fn self_burden(discount_amount: Decimal, self_ratio: Decimal) -> Option<Decimal> {
    round_to(percent_of(discount_amount, self_ratio)?, 0, RoundingStrategy::ToNegativeInfinity)
}
