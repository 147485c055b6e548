//! Install-plan resolution over the pack dependency graph.
//!
//! Given a target catalog entry, the full catalog and the set of already
//! installed pack ids, [`resolve_install`] computes the ordered fetch
//! plan. Resolution is a pure function: it performs no I/O and reports
//! cycles and missing dependencies as plan data rather than errors, since
//! both are expected, user-actionable states.

use std::collections::{HashMap, HashSet};

use crate::pack::PackManifest;

/// The computed plan for installing a pack and its dependency chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    /// The pack the plan was resolved for.
    pub target_id: String,

    /// Packs to fetch, dependencies before dependents, the target last.
    ///
    /// This is a topological order of the unsatisfied part of the
    /// dependency closure: installing the list front to back never
    /// installs a pack before one of its dependencies.
    pub dependencies_to_install: Vec<String>,

    /// Dependencies already present in the installed set.
    pub already_satisfied: Vec<String>,

    /// Pack ids referenced by `depends_on` chains but absent from the
    /// catalog.
    pub missing_dependencies: Vec<String>,

    /// A dependency cycle is reachable from the target.
    pub has_cycle: bool,
}

impl InstallPlan {
    /// Whether the plan can be executed.
    ///
    /// A plan with missing dependencies or a reachable cycle is advisory
    /// data only; the installer refuses to run it.
    pub fn is_installable(&self) -> bool {
        self.missing_dependencies.is_empty() && !self.has_cycle
    }

    /// Number of packs the plan would fetch.
    pub fn install_count(&self) -> usize {
        self.dependencies_to_install.len()
    }
}

/// Resolve the install plan for `target` against a catalog.
///
/// Depth-first traversal over `depends_on` edges restricted to the
/// catalog. A dependency already in `installed` is recorded as satisfied
/// and not traversed (its own chain was validated when it was installed);
/// a dependency absent from the catalog is recorded as missing; a revisit
/// of a pack still on the current path marks the plan as cyclic and
/// abandons that branch.
pub fn resolve_install(
    target: &PackManifest,
    catalog: &[PackManifest],
    installed: &HashSet<String>,
) -> InstallPlan {
    let by_id: HashMap<&str, &PackManifest> = catalog
        .iter()
        .map(|pack| (pack.pack_id.as_str(), pack))
        .collect();

    let mut resolver = Resolver {
        by_id: &by_id,
        installed,
        visiting: HashSet::new(),
        visited: HashSet::new(),
        order: Vec::new(),
        satisfied: Vec::new(),
        missing: Vec::new(),
        has_cycle: false,
    };

    resolver.visit(target);

    InstallPlan {
        target_id: target.pack_id.clone(),
        dependencies_to_install: resolver.order,
        already_satisfied: resolver.satisfied,
        missing_dependencies: resolver.missing,
        has_cycle: resolver.has_cycle,
    }
}

struct Resolver<'a> {
    by_id: &'a HashMap<&'a str, &'a PackManifest>,
    installed: &'a HashSet<String>,
    visiting: HashSet<String>,
    visited: HashSet<String>,
    order: Vec<String>,
    satisfied: Vec<String>,
    missing: Vec<String>,
    has_cycle: bool,
}

impl Resolver<'_> {
    fn visit(&mut self, pack: &PackManifest) {
        let id = pack.pack_id.as_str();
        if self.visited.contains(id) {
            return;
        }
        if self.visiting.contains(id) {
            self.has_cycle = true;
            return;
        }
        if self.installed.contains(id) {
            self.record_satisfied(id);
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
            if self.installed.contains(dep_id) {
                self.record_satisfied(dep_id);
                continue;
            }
            match self.by_id.get(dep_id.as_str()) {
                Some(dep) => self.visit(dep),
                None => self.record_missing(dep_id),
            }
        }
        self.visiting.remove(id);

        // Post-order emission: every dependency is listed before the
        // packs that need it.
        self.visited.insert(id.to_string());
        self.order.push(id.to_string());
    }

    fn record_satisfied(&mut self, id: &str) {
        if !self.satisfied.iter().any(|s| s == id) {
            self.satisfied.push(id.to_string());
        }
    }

    fn record_missing(&mut self, id: &str) {
        if !self.missing.iter().any(|m| m == id) {
            self.missing.push(id.to_string());
        }
    }
}
