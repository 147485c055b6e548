//! Install flows: catalog access and plan execution.
//!
//! The [`PackInstaller`] drives the full install workflow — resolve,
//! download, verify, register — against any [`CatalogClient`]
//! implementation. Network transport lives behind the trait; the
//! shipped implementation is [`HttpCatalogClient`].

mod client;
mod install;

pub use client::{
    BoxFuture, CatalogClient, ClientError, HttpCatalogClient, DEFAULT_REQUEST_TIMEOUT,
};
pub use install::{
    InstallError, InstallFailure, InstallOutcome, InstallProgressCallback, InstallStage,
    PackInstaller,
};
