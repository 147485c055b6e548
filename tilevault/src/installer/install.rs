//! Pack installation workflow.
//!
//! The installer turns an install plan into on-device packs, one pack at
//! a time:
//!
//! 1. Resolve the plan for the target against the catalog
//! 2. Per pack: gate on `min_app_version`, download, verify integrity,
//!    write next to the final location, validate the embedded manifest,
//!    atomically rename, register
//!
//! Each pack's install is atomic (the registry only ever sees fully
//! verified, fully written packs), but a multi-pack plan is deliberately
//! not: if dependency N fails, the N−1 packs already installed stay
//! installed as useful partial progress and the outcome reports exactly
//! where the plan stopped so a UI can offer "retry remaining".

use std::path::{Path, PathBuf};
use std::sync::Arc;

use semver::Version;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::graph::{resolve_install, InstallPlan};
use crate::integrity::{IntegrityError, IntegrityVerifier};
use crate::pack::PackManifest;
use crate::store::{read_installed_pack, PackRegistry, StoreError};

use super::client::{CatalogClient, ClientError};

/// Installation stages for progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    /// Resolving the install plan.
    Resolving,
    /// Downloading a pack archive.
    Downloading,
    /// Verifying a downloaded archive.
    Verifying,
    /// Registering a verified pack.
    Registering,
    /// The whole plan finished.
    Complete,
}

impl InstallStage {
    /// Human-readable stage name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Resolving => "Resolving",
            Self::Downloading => "Downloading",
            Self::Verifying => "Verifying",
            Self::Registering => "Registering",
            Self::Complete => "Complete",
        }
    }
}

/// Progress callback invoked as the installer moves through stages.
pub type InstallProgressCallback = Box<dyn Fn(InstallStage, &str) + Send + Sync>;

/// Errors that abort the installation of a single pack.
#[derive(Debug, Error)]
pub enum InstallError {
    /// The requested pack id is not in the catalog.
    #[error("pack not in catalog: {0}")]
    PackNotInCatalog(String),

    /// Network failure; retryable, installed state untouched.
    #[error(transparent)]
    Network(ClientError),

    /// The artifact failed verification or was blocked by policy.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// Registry or filesystem failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The archive's embedded manifest names a different pack.
    #[error("archive for {expected} carries embedded pack id {embedded}")]
    ManifestMismatch { expected: String, embedded: String },

    /// The pack requires a newer application.
    #[error("pack {pack_id} requires app version {required}, running {running}")]
    UnsupportedAppVersion {
        pack_id: String,
        required: String,
        running: String,
    },

    /// The caller cancelled the install.
    #[error("install cancelled")]
    Cancelled,
}

impl From<ClientError> for InstallError {
    fn from(e: ClientError) -> Self {
        match e {
            ClientError::Cancelled => InstallError::Cancelled,
            other => InstallError::Network(other),
        }
    }
}

/// The pack at which a plan stopped, and why.
#[derive(Debug)]
pub struct InstallFailure {
    /// Pack whose install failed.
    pub pack_id: String,
    /// The error that stopped the plan.
    pub error: InstallError,
}

/// Outcome of executing an install plan.
#[derive(Debug)]
pub struct InstallOutcome {
    /// The resolved plan, including any cycle or missing-dependency
    /// findings that made it non-installable.
    pub plan: InstallPlan,

    /// Packs actually installed, in plan order.
    pub installed: Vec<String>,

    /// Where the plan stopped, if it did.
    pub failure: Option<InstallFailure>,
}

impl InstallOutcome {
    /// Whether the full plan landed on the device.
    pub fn is_success(&self) -> bool {
        self.plan.is_installable()
            && self.failure.is_none()
            && self.installed.len() == self.plan.dependencies_to_install.len()
    }

    /// Packs the plan wanted but did not install — the retry set.
    pub fn remaining(&self) -> Vec<String> {
        self.plan
            .dependencies_to_install
            .iter()
            .filter(|id| !self.installed.contains(id))
            .cloned()
            .collect()
    }
}

/// Installs packs from a catalog into the registry.
pub struct PackInstaller<C: CatalogClient> {
    client: C,
    registry: Arc<PackRegistry>,
    verifier: IntegrityVerifier,
    app_version: Version,
}

impl<C: CatalogClient> PackInstaller<C> {
    /// Create an installer.
    pub fn new(
        client: C,
        registry: Arc<PackRegistry>,
        verifier: IntegrityVerifier,
        app_version: Version,
    ) -> Self {
        Self {
            client,
            registry,
            verifier,
            app_version,
        }
    }

    /// The network client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Fetch the catalog and install `target_id` with its dependencies.
    pub async fn install_from_remote(
        &self,
        target_id: &str,
        cancel: CancellationToken,
        on_progress: Option<InstallProgressCallback>,
    ) -> Result<InstallOutcome, InstallError> {
        let catalog = self.client.fetch_catalog().await?;
        self.install(target_id, &catalog, cancel, on_progress).await
    }

    /// Install `target_id` and its dependency chain from a catalog.
    ///
    /// Plan-level findings (cycle, missing dependency) are returned as
    /// plan data inside the outcome, not as errors; only the lookup of
    /// the target itself can fail before any work happens.
    pub async fn install(
        &self,
        target_id: &str,
        catalog: &[PackManifest],
        cancel: CancellationToken,
        on_progress: Option<InstallProgressCallback>,
    ) -> Result<InstallOutcome, InstallError> {
        let report = |stage: InstallStage, message: &str| {
            if let Some(ref cb) = on_progress {
                cb(stage, message);
            }
        };

        report(InstallStage::Resolving, "Resolving dependencies...");
        let target = catalog
            .iter()
            .find(|p| p.pack_id == target_id)
            .ok_or_else(|| InstallError::PackNotInCatalog(target_id.to_string()))?;

        let installed_ids = self.registry.installed_ids();
        let plan = resolve_install(target, catalog, &installed_ids);

        if !plan.is_installable() {
            warn!(
                target_id,
                has_cycle = plan.has_cycle,
                missing = ?plan.missing_dependencies,
                "install plan is not executable"
            );
            return Ok(InstallOutcome {
                plan,
                installed: Vec::new(),
                failure: None,
            });
        }

        let mut installed = Vec::new();
        let mut failure = None;

        for pack_id in plan.dependencies_to_install.clone() {
            if cancel.is_cancelled() {
                failure = Some(InstallFailure {
                    pack_id,
                    error: InstallError::Cancelled,
                });
                break;
            }

            let manifest = catalog
                .iter()
                .find(|p| p.pack_id == pack_id)
                .expect("planned packs come from the catalog");

            match self.install_one(manifest, &cancel, &report).await {
                Ok(()) => installed.push(pack_id),
                Err(error) => {
                    warn!(pack_id = %pack_id, error = %error, "install plan stopped");
                    failure = Some(InstallFailure { pack_id, error });
                    break;
                }
            }
        }

        if failure.is_none() {
            report(InstallStage::Complete, "Installation complete");
        }

        Ok(InstallOutcome {
            plan,
            installed,
            failure,
        })
    }

    /// Install a single pack end to end.
    ///
    /// The registry is only touched after the archive is verified,
    /// validated and sitting at its final path; a failure or
    /// cancellation anywhere earlier leaves no trace beyond a removed
    /// temp file.
    async fn install_one(
        &self,
        manifest: &PackManifest,
        cancel: &CancellationToken,
        report: &impl Fn(InstallStage, &str),
    ) -> Result<(), InstallError> {
        self.check_app_version(manifest)?;

        report(
            InstallStage::Downloading,
            &format!("Downloading {}...", manifest.pack_id),
        );
        let bytes = self.client.download(manifest, cancel.child_token()).await?;

        report(
            InstallStage::Verifying,
            &format!("Verifying {}...", manifest.pack_id),
        );
        let verification = self.verifier.verify_artifact(manifest, &bytes)?;
        info!(
            pack_id = %manifest.pack_id,
            level = %verification.level,
            bytes = bytes.len(),
            "pack archive verified"
        );

        let final_path = self.registry.pack_path(&manifest.pack_id);
        let temp_path = temp_path_for(&final_path);

        let staged = self
            .stage_and_register(manifest, &bytes, &temp_path, &final_path, report)
            .await;
        if staged.is_err() {
            // Best-effort cleanup keeps the packs directory free of
            // half-written archives.
            let _ = tokio::fs::remove_file(&temp_path).await;
        }
        staged
    }

    async fn stage_and_register(
        &self,
        manifest: &PackManifest,
        bytes: &[u8],
        temp_path: &Path,
        final_path: &Path,
        report: &impl Fn(InstallStage, &str),
    ) -> Result<(), InstallError> {
        tokio::fs::write(temp_path, bytes)
            .await
            .map_err(|e| StoreError::Io {
                path: temp_path.to_path_buf(),
                source: e,
            })?;

        // The embedded manifest is authoritative; an archive claiming a
        // different pack id never reaches the registry.
        let embedded = read_installed_pack(temp_path)?;
        if embedded.pack_id != manifest.pack_id {
            return Err(InstallError::ManifestMismatch {
                expected: manifest.pack_id.clone(),
                embedded: embedded.pack_id.clone(),
            });
        }

        tokio::fs::rename(temp_path, final_path)
            .await
            .map_err(|e| StoreError::Io {
                path: final_path.to_path_buf(),
                source: e,
            })?;

        report(
            InstallStage::Registering,
            &format!("Registering {}...", manifest.pack_id),
        );
        self.registry.register_pack(final_path).await?;
        Ok(())
    }

    fn check_app_version(&self, manifest: &PackManifest) -> Result<(), InstallError> {
        let Some(required) = manifest.min_app_version.as_deref() else {
            return Ok(());
        };
        match Version::parse(required) {
            Ok(required_version) if self.app_version < required_version => {
                Err(InstallError::UnsupportedAppVersion {
                    pack_id: manifest.pack_id.clone(),
                    required: required.to_string(),
                    running: self.app_version.to_string(),
                })
            }
            Ok(_) => Ok(()),
            Err(e) => {
                // An unparseable gate never blocks an install.
                warn!(
                    pack_id = %manifest.pack_id,
                    min_app_version = required,
                    error = %e,
                    "ignoring malformed min_app_version"
                );
                Ok(())
            }
        }
    }
}

fn temp_path_for(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    final_path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_stage_names() {
        assert_eq!(InstallStage::Resolving.name(), "Resolving");
        assert_eq!(InstallStage::Downloading.name(), "Downloading");
        assert_eq!(InstallStage::Verifying.name(), "Verifying");
        assert_eq!(InstallStage::Registering.name(), "Registering");
        assert_eq!(InstallStage::Complete.name(), "Complete");
    }

    #[test]
    fn test_temp_path_for() {
        let path = temp_path_for(std::path::Path::new("/packs/et-base.mbtiles"));
        assert_eq!(path, PathBuf::from("/packs/et-base.mbtiles.part"));
    }

    #[test]
    fn test_cancelled_client_error_maps_to_cancelled() {
        let err: InstallError = ClientError::Cancelled.into();
        assert!(matches!(err, InstallError::Cancelled));

        let err: InstallError = ClientError::MissingArchiveUrl("p".into()).into();
        assert!(matches!(err, InstallError::Network(_)));
    }

    #[test]
    fn test_outcome_remaining() {
        let plan = InstallPlan {
            target_id: "top".to_string(),
            dependencies_to_install: vec!["base".to_string(), "mid".to_string(), "top".to_string()],
            already_satisfied: Vec::new(),
            missing_dependencies: Vec::new(),
            has_cycle: false,
        };
        let outcome = InstallOutcome {
            plan,
            installed: vec!["base".to_string()],
            failure: Some(InstallFailure {
                pack_id: "mid".to_string(),
                error: InstallError::Cancelled,
            }),
        };

        assert!(!outcome.is_success());
        assert_eq!(outcome.remaining(), vec!["mid", "top"]);
    }
}
