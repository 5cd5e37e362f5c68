pub mod config;
pub mod domain;
pub mod errors;
pub mod pricing;

pub use domain::channel::{
    ChannelConfig, ChannelDirectory, ChannelId, ChannelType, DeliveryType, LooseNumber,
};
pub use domain::discount::{
    CapType, CascadePlan, DiscountDefinition, DiscountTierConfig, DiscountType, RoundType,
    TierSlot,
};
pub use domain::product::{ComputedMetrics, PriceField, Product, ProductId};
pub use domain::session::PricingSession;
pub use domain::snapshot::{PricingSnapshot, SnapshotId};
pub use errors::{ApplicationError, DomainError, SnapshotError};
pub use pricing::cascade::{TierApplication, TierOutcome};
pub use pricing::overrides::{ChannelOverride, PricingOverrides};
pub use pricing::{DeterministicPricingEngine, PricingContext, PricingEngine, PricingSettings};
