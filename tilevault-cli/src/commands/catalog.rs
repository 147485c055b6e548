//! `tilevault catalog` — show the remote pack catalog.

use console::style;

use tilevault::installer::CatalogClient;
use tilevault::pack::PackManifest;

use crate::error::CliError;

use super::{build_client, CliContext};

pub async fn run(ctx: &CliContext) -> Result<(), CliError> {
    let client = build_client(ctx)?;
    let mut catalog = client.fetch_catalog().await?;
    sort_for_display(&mut catalog);

    if catalog.is_empty() {
        println!("The catalog is empty.");
        return Ok(());
    }

    let installed = ctx.registry.installed_ids();
    println!(
        "{:<16} {:<24} {:<10} {:<8} {}",
        "PACK", "NAME", "VERSION", "ZOOM", "STATUS"
    );
    for pack in &catalog {
        let status = if installed.contains(&pack.pack_id) {
            style("installed").green().to_string()
        } else if pack.is_featured {
            style("featured").cyan().to_string()
        } else {
            String::new()
        };
        println!(
            "{:<16} {:<24} {:<10} {:<8} {}",
            pack.pack_id,
            pack.name,
            pack.version,
            format!("{}-{}", pack.min_zoom, pack.max_zoom),
            status
        );
        if !pack.depends_on.is_empty() {
            println!("{:<16} requires: {}", "", pack.depends_on.join(", "));
        }
    }
    Ok(())
}

/// Featured packs first, then catalog order, then name.
fn sort_for_display(catalog: &mut [PackManifest]) {
    catalog.sort_by(|a, b| {
        b.is_featured
            .cmp(&a.is_featured)
            .then(a.display_order.cmp(&b.display_order))
            .then(a.name.cmp(&b.name))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_featured_first() {
        let mut catalog = vec![
            PackManifest::new("b", "Beta", "1"),
            {
                let mut m = PackManifest::new("a", "Alpha", "1");
                m.is_featured = true;
                m
            },
        ];
        sort_for_display(&mut catalog);
        assert_eq!(catalog[0].pack_id, "a");
    }
}
