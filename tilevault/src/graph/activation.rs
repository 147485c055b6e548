//! Activation status over the installed-pack set.
//!
//! A pack is activatable when its full `depends_on` closure is present on
//! the device and acyclic. Unlike install planning, activation is
//! restricted to the installed set: the remote catalog plays no part.
//! A pack with a missing dependency stays on disk, it is simply reported
//! as not activatable.

use std::collections::{HashMap, HashSet};

use crate::pack::InstalledPack;

/// Result of evaluating whether an installed pack can be used now.
#[derive(Debug, Clone)]
pub struct ActivationStatus {
    /// The pack the status was computed for.
    pub pack_id: String,

    /// The full dependency chain is present and acyclic.
    pub can_activate: bool,

    /// At least one dependency in the chain is not installed.
    pub has_blocking_dependencies: bool,

    /// Dependencies in the chain that are not installed.
    pub missing_dependencies: Vec<String>,

    /// A cycle exists among the installed dependency chain.
    ///
    /// Should not occur when every pack was installed through the
    /// resolver, but packs are installed independently over time, so it
    /// is checked and fails closed.
    pub has_cycle: bool,

    /// Load order for a renderer: deepest dependency first, the target
    /// last. Empty unless `can_activate`.
    pub activation_chain: Vec<InstalledPack>,
}

/// Compute the activation status of `target` against the installed set.
///
/// Same depth-first traversal as install resolution, with the catalog
/// replaced by the installed set.
pub fn activation_status(target: &InstalledPack, installed: &[InstalledPack]) -> ActivationStatus {
    let by_id: HashMap<&str, &InstalledPack> = installed
        .iter()
        .map(|pack| (pack.pack_id.as_str(), pack))
        .collect();

    let mut walk = Walk {
        by_id: &by_id,
        visiting: HashSet::new(),
        visited: HashSet::new(),
        chain: Vec::new(),
        missing: Vec::new(),
        has_cycle: false,
    };
    walk.visit(target);

    let has_blocking_dependencies = !walk.missing.is_empty();
    let can_activate = !has_blocking_dependencies && !walk.has_cycle;

    ActivationStatus {
        pack_id: target.pack_id.clone(),
        can_activate,
        has_blocking_dependencies,
        missing_dependencies: walk.missing,
        has_cycle: walk.has_cycle,
        activation_chain: if can_activate { walk.chain } else { Vec::new() },
    }
}

struct Walk<'a> {
    by_id: &'a HashMap<&'a str, &'a InstalledPack>,
    visiting: HashSet<String>,
    visited: HashSet<String>,
    chain: Vec<InstalledPack>,
    missing: Vec<String>,
    has_cycle: bool,
}

impl Walk<'_> {
    fn visit(&mut self, pack: &InstalledPack) {
        let id = pack.pack_id.as_str();
        if self.visited.contains(id) {
            return;
        }
        if self.visiting.contains(id) {
            self.has_cycle = true;
            return;
        }

        self.visiting.insert(id.to_string());
        for dep_id in &pack.depends_on {
            if self.visited.contains(dep_id.as_str()) {
                continue;
            }
            if self.visiting.contains(dep_id.as_str()) {
                self.has_cycle = true;
                continue;
            }
            match self.by_id.get(dep_id.as_str()) {
                Some(dep) => self.visit(dep),
                None => {
                    if !self.missing.iter().any(|m| m == dep_id) {
                        self.missing.push(dep_id.clone());
                    }
                }
            }
        }
        self.visiting.remove(id);

        self.visited.insert(id.to_string());
        self.chain.push(pack.clone());
    }
}
