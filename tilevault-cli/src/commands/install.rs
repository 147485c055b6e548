//! `tilevault install` — install a pack and its dependency chain.

use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tilevault::installer::{InstallProgressCallback, InstallStage, PackInstaller};

use crate::error::CliError;

use super::{app_version, build_client, build_verifier, CliContext};

pub async fn run(ctx: &CliContext, pack_id: &str) -> Result<(), CliError> {
    let client = build_client(ctx)?;
    let verifier = build_verifier(ctx)?;
    let installer = PackInstaller::new(
        client,
        Arc::clone(&ctx.registry),
        verifier,
        app_version(),
    );

    // Ctrl-C cancels the install; the registry is left as it was for
    // any pack not yet registered.
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        debug!(error = %e, "could not install Ctrl-C handler");
    }

    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("valid progress template"),
    );
    let progress_bar = bar.clone();
    let on_progress: InstallProgressCallback = Box::new(move |stage: InstallStage, message: &str| {
        progress_bar.set_message(format!("[{}] {}", stage.name(), message));
        progress_bar.tick();
    });

    let outcome = installer
        .install_from_remote(pack_id, cancel, Some(on_progress))
        .await?;
    bar.finish_and_clear();

    if !outcome.plan.is_installable() {
        if outcome.plan.has_cycle {
            return Err(CliError::Operation(format!(
                "cannot install {pack_id}: its dependency graph contains a cycle"
            )));
        }
        return Err(CliError::Operation(format!(
            "cannot install {pack_id}: missing from the catalog: {}",
            outcome.plan.missing_dependencies.join(", ")
        )));
    }

    for installed in &outcome.installed {
        println!("{} {}", style("installed").green(), installed);
    }
    for satisfied in &outcome.plan.already_satisfied {
        println!("{} {} (already installed)", style("kept").dim(), satisfied);
    }

    let remaining = outcome.remaining();
    match outcome.failure {
        None => {
            println!("{} {}", style("done").green().bold(), pack_id);
            Ok(())
        }
        Some(failure) => {
            eprintln!(
                "{} installing {} failed: {}",
                style("error").red().bold(),
                failure.pack_id,
                failure.error
            );
            if !remaining.is_empty() {
                eprintln!(
                    "Re-run `tilevault install {pack_id}` to retry the remaining packs: {}",
                    remaining.join(", ")
                );
            }
            Err(CliError::Install(failure.error))
        }
    }
}
