use std::collections::BTreeSet;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::domain::product::{Product, ProductId};
use crate::domain::snapshot::{FrozenMetrics, PricingSnapshot, SnapshotId, SNAPSHOT_FORMAT_VERSION};
use crate::errors::SnapshotError;
use crate::pricing::PricingContext;

pub fn snapshot(products: &[Product], selected: &BTreeSet<ProductId>) -> PricingSnapshot {
    snapshot_at(products, selected, 0)
}

/// Captures the selected products' computed fields, tagged with the cascade
/// plan position they correspond to.
pub fn snapshot_at(
    products: &[Product],
    selected: &BTreeSet<ProductId>,
    plan_position: usize,
) -> PricingSnapshot {
    let entries = products
        .iter()
        .filter(|product| selected.contains(&product.id))
        .map(|product| (product.id.clone(), FrozenMetrics::from(&product.metrics)))
        .collect();

    PricingSnapshot {
        id: SnapshotId(Uuid::new_v4().to_string()),
        version: SNAPSHOT_FORMAT_VERSION,
        captured_at: Utc::now(),
        plan_position,
        entries,
    }
}

/// Restores the selected products from `snapshot` and re-derives their
/// logistics cost from the live context. Either every selected product present
/// in `products` is covered by the snapshot, or nothing is reverted.
pub fn revert(
    products: &[Product],
    selected: &BTreeSet<ProductId>,
    snapshot: &PricingSnapshot,
    context: &PricingContext,
) -> Result<Vec<Product>, SnapshotError> {
    if snapshot.version != SNAPSHOT_FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
            expected: SNAPSHOT_FORMAT_VERSION,
        });
    }

    let missing = products
        .iter()
        .filter(|product| selected.contains(&product.id) && !snapshot.covers(&product.id))
        .map(|product| product.id.clone())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(SnapshotError::MissingEntries { missing });
    }

    let logistics_cost = context.logistics_cost();
    let reverted = products
        .iter()
        .map(|product| {
            let Some(frozen) =
                snapshot.entries.get(&product.id).filter(|_| selected.contains(&product.id))
            else {
                return product.clone();
            };
            let mut restored = product.clone();
            frozen.restore_into(&mut restored.metrics);
            restored.metrics.logistics_cost = logistics_cost;
            restored
        })
        .collect::<Vec<_>>();

    info!(
        event_name = "pricing.snapshot.reverted",
        snapshot_id = %snapshot.id,
        selected = selected.len(),
        "products reverted from snapshot"
    );
    Ok(reverted)
}
