//! Dependency graph core: install resolution, activation and deletion
//! planning.
//!
//! Packs declare dependencies on other packs (`depends_on`), forming a
//! directed graph over any catalog or installed set. The three planners
//! in this module are synchronous pure functions over immutable pack
//! data, cheap enough to run inline on every state change:
//!
//! - [`resolve_install`] — the ordered fetch plan for a catalog entry
//! - [`activation_status`] — whether an installed pack is usable now
//! - [`deletion_plan`] / [`cascade_deletion_plan`] — whether a pack can
//!   be removed, and the safe removal order when dependents come along
//!
//! Cycles and missing dependencies are expected states; they are always
//! reported as plan data and never as errors.

mod activation;
mod deletion;
mod resolver;

pub use activation::{activation_status, ActivationStatus};
pub use deletion::{cascade_deletion_plan, deletion_plan, CascadeDeletionPlan, DeletionPlan};
pub use resolver::{resolve_install, InstallPlan};
