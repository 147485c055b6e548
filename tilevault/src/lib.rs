//! TileVault - offline map pack lifecycle engine
//!
//! TileVault installs, activates, verifies and removes geospatial tile
//! packs (self-contained tiled-raster archives covering a bounded region
//! at a zoom range) on devices that must keep working without network
//! access.
//!
//! # Overview
//!
//! - [`pack`] — manifests, installed packs and catalog parsing
//! - [`graph`] — install resolution, activation and deletion planning
//!   over the pack dependency graph
//! - [`integrity`] — hash/signature verification and the signed-pack
//!   policy gate
//! - [`policy`] — the online/offline base-layer decision
//! - [`store`] — the installed-pack registry and concurrent tile reader
//! - [`installer`] — catalog client and install workflow
//! - [`config`] — engine configuration file
//! - [`coord`] — bounds geometry and tile addressing
//!
//! The engine is UI-framework-agnostic: asynchronous operations
//! (install, delete, catalog fetch) are plain futures, queries are
//! synchronous pure functions, and state changes surface as explicit
//! [`store::PackEvent`] notifications over a broadcast channel.

pub mod config;
pub mod coord;
pub mod graph;
pub mod installer;
pub mod integrity;
pub mod pack;
pub mod policy;
pub mod store;
