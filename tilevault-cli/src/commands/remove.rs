//! `tilevault remove` — remove a pack, optionally with its dependents.

use console::style;
use dialoguer::Confirm;

use tilevault::graph::cascade_deletion_plan;
use tilevault::store::StoreError;

use crate::error::CliError;

use super::CliContext;

pub async fn run(
    ctx: &CliContext,
    pack_id: &str,
    cascade: bool,
    yes: bool,
) -> Result<(), CliError> {
    if !cascade {
        return match ctx.registry.remove_pack(pack_id).await {
            Ok(()) => {
                println!("{} {}", style("removed").green(), pack_id);
                Ok(())
            }
            Err(StoreError::BlockedByDependents { dependents, .. }) => {
                Err(CliError::Operation(format!(
                    "{pack_id} is required by {}. Use --cascade to remove them together.",
                    dependents.join(", ")
                )))
            }
            Err(e) => Err(e.into()),
        };
    }

    let installed = ctx.registry.installed_packs();
    let target = installed
        .iter()
        .find(|p| p.pack_id == pack_id)
        .ok_or_else(|| CliError::Store(StoreError::PackNotInstalled(pack_id.to_string())))?;

    let plan = cascade_deletion_plan(target, &installed);
    if plan.has_dependents {
        println!("Removing {pack_id} also removes:");
        for pack in &plan.dependents {
            println!("  {} ({})", pack.pack_id, pack.name);
        }
        if !yes {
            let confirmed = Confirm::new()
                .with_prompt(format!("Remove {} packs?", plan.deletion_order.len()))
                .default(false)
                .interact()
                .map_err(|e| CliError::Operation(e.to_string()))?;
            if !confirmed {
                println!("Aborted; nothing removed.");
                return Ok(());
            }
        }
    }

    let outcome = ctx.registry.remove_cascade(pack_id).await?;
    for removed in &outcome.removed {
        println!("{} {}", style("removed").green(), removed);
    }
    match outcome.failed {
        None => Ok(()),
        Some(failure) => {
            // Partial progress is kept; say exactly how far it got.
            eprintln!(
                "{} removing {} failed: {}",
                style("error").red().bold(),
                failure.pack_id,
                failure.error
            );
            eprintln!(
                "{} of {} packs were removed before the failure.",
                outcome.removed.len(),
                outcome.removed.len() + 1
            );
            Err(CliError::Store(failure.error))
        }
    }
}
