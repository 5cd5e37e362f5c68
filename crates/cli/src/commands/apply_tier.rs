use std::path::PathBuf;

use chanprice_core::pricing::cascade::TierReportLine;
use chanprice_core::pricing::snapshot::snapshot_at;
use chanprice_core::{
    ApplicationError, DeterministicPricingEngine, DomainError, PricingEngine, TierSlot,
};
use serde::Serialize;
use tracing::info;

use crate::commands::price::{currency_precision, product_rows, ProductRow};
use crate::commands::{parse_ids, store, CommandResult, DataPaths, Workspace};

#[derive(Debug, Clone)]
pub struct ApplyTierArgs {
    pub slot: String,
    pub tier: PathBuf,
    pub ids: String,
    pub paths: DataPaths,
}

#[derive(Debug, Serialize)]
struct ApplyTierReport {
    slot: &'static str,
    selected: usize,
    applied: usize,
    snapshot_id: String,
    snapshot_path: String,
    plan_steps: usize,
    report: Vec<TierReportLine>,
    products: Vec<ProductRow>,
}

pub fn run(args: ApplyTierArgs) -> CommandResult {
    match execute(&args) {
        Ok(report) => CommandResult::report("apply-tier", "ok", 0, &report),
        Err(error) => CommandResult::from_error("apply-tier", &error),
    }
}

fn execute(args: &ApplyTierArgs) -> Result<ApplyTierReport, ApplicationError> {
    let slot = TierSlot::parse(&args.slot).ok_or_else(|| {
        let expected =
            TierSlot::ORDERED.iter().map(TierSlot::as_str).collect::<Vec<_>>().join("|");
        DomainError::InvariantViolation(format!(
            "unsupported tier slot `{}` (expected {expected})",
            args.slot
        ))
    })?;
    let selected = parse_ids(&args.ids);
    if selected.is_empty() {
        return Err(DomainError::InvariantViolation("no product ids selected".to_string()).into());
    }

    let mut workspace = Workspace::open(&args.paths)?;
    workspace.require_products(&selected)?;
    let tier = store::read_tier(&args.tier)?;

    let engine = DeterministicPricingEngine;
    let current = engine.recompute_all(
        &workspace.session.products,
        &workspace.context,
        &workspace.session.plan,
    );
    let snapshot = snapshot_at(&current, &selected, workspace.session.plan.len());
    let application = engine.apply_tier(&current, &selected, &tier, slot, &workspace.context);

    let applied = application.applied_count();

    let snapshot_path = store::write_snapshot(&workspace.config.data.snapshot_dir, &snapshot)?;
    workspace.session.products = application.products;
    workspace.session.plan.push(slot, tier, selected.clone());
    workspace.save()?;

    info!(
        event_name = "cli.apply_tier.completed",
        slot = slot.as_str(),
        snapshot_id = %snapshot.id,
        applied,
        "tier applied and session saved"
    );

    let precision = currency_precision(&workspace);
    let session = &workspace.session;
    Ok(ApplyTierReport {
        slot: slot.as_str(),
        selected: selected.len(),
        applied,
        snapshot_id: snapshot.id.to_string(),
        snapshot_path: snapshot_path.display().to_string(),
        plan_steps: session.plan.len(),
        report: application.report,
        products: product_rows(&session.products, &session.dividers, precision),
    })
}
