//! CLI commands for managing offline map packs.
//!
//! Each subcommand lives in its own module and receives a
//! [`CliContext`] built once from the config file and CLI overrides.

mod catalog;
mod install;
mod list;
mod remove;
mod tile;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Subcommand;
use semver::Version;

use tilevault::config::EngineConfig;
use tilevault::installer::HttpCatalogClient;
use tilevault::integrity::{IntegrityPolicy, IntegrityVerifier};
use tilevault::store::PackRegistry;

use crate::error::CliError;

/// Pack management subcommands.
#[derive(Debug, Subcommand)]
pub enum PackCommands {
    /// Show the remote pack catalog.
    Catalog,

    /// List installed packs and their activation status.
    List,

    /// Install a pack and its dependency chain.
    Install {
        /// Pack id from the catalog.
        pack_id: String,
    },

    /// Remove an installed pack.
    Remove {
        /// Pack id to remove.
        pack_id: String,

        /// Also remove every pack that depends on it.
        #[arg(long)]
        cascade: bool,

        /// Skip the cascade confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Read a single tile into a file.
    Tile {
        /// Pack id to read from.
        pack_id: String,

        /// Zoom level.
        zoom: u8,

        /// Tile column.
        x: u32,

        /// Tile row.
        y: u32,

        /// Output file for the tile bytes.
        #[arg(long, short)]
        out: PathBuf,
    },
}

/// Shared command context.
pub struct CliContext {
    /// Loaded engine configuration.
    pub config: EngineConfig,

    /// The opened pack registry.
    pub registry: Arc<PackRegistry>,
}

/// Build the context from the config file (or an explicit path) plus
/// CLI overrides.
pub fn load_context(
    config_path: Option<PathBuf>,
    catalog_url: Option<String>,
) -> Result<CliContext, CliError> {
    let mut config = match config_path {
        Some(path) => EngineConfig::load_from(&path)
            .map_err(|e| CliError::Config(e.to_string()))?,
        None => EngineConfig::load().map_err(|e| CliError::Config(e.to_string()))?,
    };
    if catalog_url.is_some() {
        config.catalog_url = catalog_url;
    }

    let registry = PackRegistry::open(&config.packs_dir)?;
    Ok(CliContext {
        config,
        registry: Arc::new(registry),
    })
}

/// Catalog URL or a config error telling the user where to set one.
fn require_catalog_url(ctx: &CliContext) -> Result<String, CliError> {
    ctx.config.catalog_url.clone().ok_or_else(|| {
        CliError::Config(
            "No catalog URL configured. Use --catalog-url or set catalog_url in the \
             [packs] section of config.ini."
                .to_string(),
        )
    })
}

/// HTTP client against the configured catalog.
fn build_client(ctx: &CliContext) -> Result<HttpCatalogClient, CliError> {
    let url = require_catalog_url(ctx)?;
    Ok(HttpCatalogClient::with_timeout(
        url,
        ctx.config.download_timeout(),
    ))
}

/// Integrity verifier from the configured policy and trusted keys.
fn build_verifier(ctx: &CliContext) -> Result<IntegrityVerifier, CliError> {
    let mut verifier = IntegrityVerifier::new(IntegrityPolicy {
        require_signed_packs: ctx.config.require_signed_packs,
    });
    for key in &ctx.config.trusted_keys {
        verifier = verifier
            .with_trusted_key_hex(key)
            .map_err(|e| CliError::Config(format!("bad trusted key: {e}")))?;
    }
    Ok(verifier)
}

/// The running application version, for `min_app_version` gating.
fn app_version() -> Version {
    Version::parse(env!("CARGO_PKG_VERSION")).expect("crate version is semver")
}

/// Dispatch a subcommand.
pub async fn run(command: PackCommands, ctx: CliContext) -> Result<(), CliError> {
    match command {
        PackCommands::Catalog => catalog::run(&ctx).await,
        PackCommands::List => list::run(&ctx),
        PackCommands::Install { pack_id } => install::run(&ctx, &pack_id).await,
        PackCommands::Remove {
            pack_id,
            cascade,
            yes,
        } => remove::run(&ctx, &pack_id, cascade, yes).await,
        PackCommands::Tile {
            pack_id,
            zoom,
            x,
            y,
            out,
        } => tile::run(&ctx, &pack_id, zoom, x, y, &out).await,
    }
}
