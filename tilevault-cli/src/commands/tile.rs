//! `tilevault tile` — read one tile from an installed pack.

use std::path::Path;

use crate::error::CliError;

use super::CliContext;

pub async fn run(
    ctx: &CliContext,
    pack_id: &str,
    zoom: u8,
    x: u32,
    y: u32,
    out: &Path,
) -> Result<(), CliError> {
    let tile = ctx.registry.read_tile(pack_id, zoom, x, y).await?;
    ctx.registry.shutdown().await;

    match tile {
        Some(bytes) => {
            std::fs::write(out, &bytes)
                .map_err(|e| CliError::Operation(format!("failed to write {}: {e}", out.display())))?;
            println!("wrote {} bytes to {}", bytes.len(), out.display());
            Ok(())
        }
        None => Err(CliError::Operation(format!(
            "no tile at {zoom}/{x}/{y} in {pack_id}"
        ))),
    }
}
