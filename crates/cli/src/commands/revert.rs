use std::path::PathBuf;

use chanprice_core::pricing::snapshot::revert;
use chanprice_core::{ApplicationError, DomainError};
use serde::Serialize;
use tracing::info;

use crate::commands::price::{currency_precision, product_rows, ProductRow};
use crate::commands::{parse_ids, store, CommandResult, DataPaths, Workspace};

#[derive(Debug, Clone)]
pub struct RevertArgs {
    pub snapshot: PathBuf,
    pub ids: String,
    pub paths: DataPaths,
}

#[derive(Debug, Serialize)]
struct RevertReport {
    snapshot_id: String,
    reverted: Vec<String>,
    plan_steps: usize,
    products: Vec<ProductRow>,
}

pub fn run(args: RevertArgs) -> CommandResult {
    match execute(&args) {
        Ok(report) => CommandResult::report("revert", "ok", 0, &report),
        Err(error) => CommandResult::from_error("revert", &error),
    }
}

fn execute(args: &RevertArgs) -> Result<RevertReport, ApplicationError> {
    let selected = parse_ids(&args.ids);
    if selected.is_empty() {
        return Err(DomainError::InvariantViolation("no product ids selected".to_string()).into());
    }

    let mut workspace = Workspace::open(&args.paths)?;
    workspace.require_products(&selected)?;
    let snapshot = store::read_snapshot(&args.snapshot)?;

    let reverted =
        revert(&workspace.session.products, &selected, &snapshot, &workspace.context)?;
    workspace.session.products = reverted;
    // Later replays must not re-apply tiers the revert undid.
    workspace.session.plan.forget_targets_from(snapshot.plan_position, &selected);
    workspace.save()?;

    info!(
        event_name = "cli.revert.completed",
        snapshot_id = %snapshot.id,
        reverted = selected.len(),
        plan_steps = workspace.session.plan.len(),
        "products reverted and session saved"
    );

    let precision = currency_precision(&workspace);
    let session = &workspace.session;
    Ok(RevertReport {
        snapshot_id: snapshot.id.to_string(),
        reverted: selected.iter().map(ToString::to_string).collect(),
        plan_steps: session.plan.len(),
        products: product_rows(&session.products, &session.dividers, precision),
    })
}
