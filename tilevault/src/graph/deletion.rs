//! Deletion planning over the installed-pack set.
//!
//! A pack that other installed packs depend on can never be deleted in
//! isolation; the caller either gets a veto (with the blocking
//! dependents) or asks for a cascading plan covering the full dependent
//! closure in a safe order.

use std::collections::{HashMap, HashSet};

use crate::pack::InstalledPack;

/// Single-target deletion plan.
#[derive(Debug, Clone)]
pub struct DeletionPlan {
    /// The pack the plan was computed for.
    pub target_id: String,

    /// No installed pack depends on the target.
    pub can_delete: bool,

    /// Installed packs whose `depends_on` includes the target directly.
    pub blocking_dependents: Vec<InstalledPack>,
}

/// Cascading deletion plan: the target plus every installed pack that
/// depends on it, directly or indirectly.
#[derive(Debug, Clone)]
pub struct CascadeDeletionPlan {
    /// The pack the cascade was computed for.
    pub target: InstalledPack,

    /// Transitive closure of installed dependents (target excluded).
    pub dependents: Vec<InstalledPack>,

    /// Safe removal order: dependents first, the target last, so nothing
    /// is ever left depending on an already-deleted pack mid-operation.
    pub deletion_order: Vec<InstalledPack>,

    /// At least one installed pack depends on the target.
    pub has_dependents: bool,
}

/// Compute the single-target deletion plan for `target`.
pub fn deletion_plan(target: &InstalledPack, installed: &[InstalledPack]) -> DeletionPlan {
    let blocking_dependents: Vec<InstalledPack> = installed
        .iter()
        .filter(|pack| pack.pack_id != target.pack_id)
        .filter(|pack| pack.depends_on.iter().any(|d| *d == target.pack_id))
        .cloned()
        .collect();

    DeletionPlan {
        target_id: target.pack_id.clone(),
        can_delete: blocking_dependents.is_empty(),
        blocking_dependents,
    }
}

/// Compute the cascading deletion plan for `target`.
///
/// Traversal over reverse `depends_on` edges collects the dependents
/// closure; the order is the reverse of a topological sort of the
/// closure, so each pack is removed before anything it depends on.
pub fn cascade_deletion_plan(
    target: &InstalledPack,
    installed: &[InstalledPack],
) -> CascadeDeletionPlan {
    // Reverse adjacency: pack id -> packs that directly depend on it.
    let mut dependents_of: HashMap<&str, Vec<&InstalledPack>> = HashMap::new();
    for pack in installed {
        for dep_id in &pack.depends_on {
            dependents_of
                .entry(dep_id.as_str())
                .or_default()
                .push(pack);
        }
    }

    // BFS closure from the target along "is depended on by" edges.
    let mut closure: Vec<&InstalledPack> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(target.pack_id.as_str());
    let mut queue: Vec<&str> = vec![target.pack_id.as_str()];
    while let Some(id) = queue.pop() {
        if let Some(dependents) = dependents_of.get(id) {
            for &dependent in dependents {
                if seen.insert(dependent.pack_id.as_str()) {
                    closure.push(dependent);
                    queue.push(dependent.pack_id.as_str());
                }
            }
        }
    }

    let deletion_order = order_for_deletion(target, &closure);

    CascadeDeletionPlan {
        target: target.clone(),
        has_dependents: !closure.is_empty(),
        dependents: closure.into_iter().cloned().collect(),
        deletion_order,
    }
}

/// Order the closure so every pack precedes its own dependencies.
///
/// Kahn's algorithm over in-closure dependent counts: a pack becomes
/// removable once all of its in-closure dependents have been emitted.
/// The target always lands last. If the installed set contains a cycle
/// the leftover packs are appended in discovery order so the cascade
/// still covers the closure (fail open on ordering, never on coverage).
fn order_for_deletion(target: &InstalledPack, closure: &[&InstalledPack]) -> Vec<InstalledPack> {
    let member_ids: HashSet<&str> = closure
        .iter()
        .map(|p| p.pack_id.as_str())
        .chain(std::iter::once(target.pack_id.as_str()))
        .collect();

    // Pending dependents per pack, counting only edges inside the closure.
    let mut pending: HashMap<&str, usize> = member_ids.iter().map(|id| (*id, 0)).collect();
    let members: Vec<&InstalledPack> = closure
        .iter()
        .copied()
        .chain(std::iter::once(target))
        .collect();
    for pack in &members {
        for dep_id in &pack.depends_on {
            if member_ids.contains(dep_id.as_str()) {
                if let Some(count) = pending.get_mut(dep_id.as_str()) {
                    *count += 1;
                }
            }
        }
    }

    let mut ready: Vec<&InstalledPack> = members
        .iter()
        .filter(|pack| pending[pack.pack_id.as_str()] == 0)
        .copied()
        .collect();
    let mut order: Vec<InstalledPack> = Vec::with_capacity(members.len());
    let mut emitted: HashSet<&str> = HashSet::new();

    let mut index = 0;
    while index < ready.len() {
        let pack = ready[index];
        index += 1;
        if !emitted.insert(pack.pack_id.as_str()) {
            continue;
        }
        order.push(pack.clone());
        for dep_id in &pack.depends_on {
            if !member_ids.contains(dep_id.as_str()) {
                continue;
            }
            let count = pending.get_mut(dep_id.as_str()).expect("closure member");
            *count -= 1;
            if *count == 0 {
                if let Some(dep) = members.iter().copied().find(|p| p.pack_id == *dep_id) {
                    ready.push(dep);
                }
            }
        }
    }

    // Cycle leftovers: cover them anyway, target still last.
    for pack in &members {
        if !emitted.contains(pack.pack_id.as_str()) && pack.pack_id != target.pack_id {
            order.push((*pack).clone());
        }
    }
    if !order.iter().any(|p| p.pack_id == target.pack_id) {
        order.push(target.clone());
    }

    order
}
