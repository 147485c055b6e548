//! `tilevault list` — installed packs and their activation status.

use console::style;

use crate::error::CliError;

use super::CliContext;

pub fn run(ctx: &CliContext) -> Result<(), CliError> {
    let mut packs = ctx.registry.installed_packs();
    packs.sort_by(|a, b| a.pack_id.cmp(&b.pack_id));

    if packs.is_empty() {
        println!(
            "No packs installed in {}.",
            ctx.registry.packs_dir().display()
        );
        return Ok(());
    }

    println!(
        "{:<16} {:<10} {:<8} {:<10} {}",
        "PACK", "VERSION", "ZOOM", "SIZE", "STATUS"
    );
    for pack in &packs {
        let status = match ctx.registry.activation_status(&pack.pack_id) {
            Some(status) if status.can_activate => style("active").green().to_string(),
            Some(status) if status.has_cycle => style("blocked (dependency cycle)")
                .red()
                .to_string(),
            Some(status) => style(format!(
                "blocked (missing: {})",
                status.missing_dependencies.join(", ")
            ))
            .yellow()
            .to_string(),
            None => String::new(),
        };
        println!(
            "{:<16} {:<10} {:<8} {:<10} {}",
            pack.pack_id,
            pack.version,
            format!("{}-{}", pack.min_zoom, pack.max_zoom),
            pack.size_bytes.map(format_size).unwrap_or_default(),
            status
        );
    }

    let metrics = ctx.registry.metrics();
    if metrics.tile_reads > 0 {
        println!(
            "\ntile reads: {} ({} hits, {} misses, {} errors)",
            metrics.tile_reads, metrics.tile_hits, metrics.tile_misses, metrics.read_errors
        );
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const MB: u64 = 1024 * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "0.5 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
