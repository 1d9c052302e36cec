use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::ownership::owner_of;
use crate::path::{self, PathRelation};
use crate::records::PointRecord;

/// Stand-in for a missing owner in reassignment keys.
pub const UNASSIGNED: &str = "(unassigned)";

/// An existing device that overlaps a kept candidate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeviceConflict {
    pub existing: String,
    pub candidate: String,
}

/// Points that would move from one owner to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReassignmentGroup {
    pub from: String,
    pub to: String,
    pub points: Vec<String>,
}

impl ReassignmentGroup {
    pub fn key(&self) -> String {
        group_key(Some(self.from.as_str()), Some(self.to.as_str()))
    }
}

fn group_key(from: Option<&str>, to: Option<&str>) -> String {
    format!("{}→{}", from.unwrap_or(UNASSIGNED), to.unwrap_or(UNASSIGNED))
}

/// Proposed diff of the device set. All path lists are sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConflictPlan {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
    /// Candidates that were strict ancestors of other candidates.
    pub dropped_from_selection: Vec<String>,
    /// Existing devices that contain a candidate.
    pub upstream_conflicts: Vec<DeviceConflict>,
    /// Existing devices contained by a candidate.
    pub downstream_conflicts: Vec<DeviceConflict>,
    pub reassignments: Vec<ReassignmentGroup>,
}

impl ConflictPlan {
    /// Plans that remove devices or trim the selection need an explicit yes.
    pub fn requires_confirmation(&self) -> bool {
        !self.to_remove.is_empty() || !self.dropped_from_selection.is_empty()
    }

    /// Nothing would change and nothing was trimmed from the selection.
    pub fn is_noop(&self, current: &BTreeSet<String>) -> bool {
        self.to_remove.is_empty()
            && self.dropped_from_selection.is_empty()
            && self.to_add.iter().all(|p| current.contains(p))
    }

    /// `(current - to_remove) + to_add`
    pub fn next_devices(&self, current: &BTreeSet<String>) -> BTreeSet<String> {
        let mut next: BTreeSet<String> = current
            .iter()
            .filter(|p| !self.to_remove.contains(*p))
            .cloned()
            .collect();
        next.extend(self.to_add.iter().cloned());
        next
    }

    pub fn reassigned_point_count(&self) -> usize {
        self.reassignments.iter().map(|g| g.points.len()).sum()
    }
}

/// Keep only the most specific candidates. Returns `(kept, dropped)`, both
/// sorted and deduplicated. Root-only candidates are discarded.
pub fn resolve_selection_overlap<I, S>(candidates: I, root: &str) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = candidates
        .into_iter()
        .filter(|c| !path::is_root(c.as_ref(), root))
        .map(|c| path::canonical_path(c.as_ref(), root))
        .collect();

    let mut kept = Vec::new();
    let mut dropped = Vec::new();

    for candidate in &unique {
        let is_ancestor_of_other = unique
            .iter()
            .any(|other| path::relate(candidate, other, root) == PathRelation::Ancestor);
        if is_ancestor_of_other {
            dropped.push(candidate.clone());
        } else {
            kept.push(candidate.clone());
        }
    }

    (kept, dropped)
}

/// Work out what adding `candidates` to `current` would do.
pub fn plan_device_addition<I, S>(
    current: &BTreeSet<String>,
    candidates: I,
    points: &[PointRecord],
    root: &str,
) -> ConflictPlan
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (to_add, dropped_from_selection) = resolve_selection_overlap(candidates, root);

    let mut to_remove: BTreeSet<String> = BTreeSet::new();
    let mut upstream: BTreeSet<DeviceConflict> = BTreeSet::new();
    let mut downstream: BTreeSet<DeviceConflict> = BTreeSet::new();

    for existing in current {
        for candidate in &to_add {
            let conflict = || DeviceConflict {
                existing: existing.clone(),
                candidate: candidate.clone(),
            };
            match path::relate(existing, candidate, root) {
                PathRelation::Ancestor => {
                    to_remove.insert(existing.clone());
                    upstream.insert(conflict());
                }
                PathRelation::Descendant => {
                    to_remove.insert(existing.clone());
                    downstream.insert(conflict());
                }
                PathRelation::Same | PathRelation::Disjoint => {}
            }
        }
    }

    let mut plan = ConflictPlan {
        to_add,
        to_remove: to_remove.into_iter().collect(),
        dropped_from_selection,
        upstream_conflicts: upstream.into_iter().collect(),
        downstream_conflicts: downstream.into_iter().collect(),
        reassignments: Vec::new(),
    };

    let next = plan.next_devices(current);
    plan.reassignments = reassignment_groups(current, &next, points, root);

    debug!(
        "Plan: +{} -{} dropped {} upstream {} downstream {} reassigned {}",
        plan.to_add.len(),
        plan.to_remove.len(),
        plan.dropped_from_selection.len(),
        plan.upstream_conflicts.len(),
        plan.downstream_conflicts.len(),
        plan.reassigned_point_count(),
    );

    plan
}

/// Points whose owner changes between two owned states, grouped by
/// `(from, to)`. Gaining or losing an owner is not a reassignment.
pub fn reassignment_groups(
    current: &BTreeSet<String>,
    next: &BTreeSet<String>,
    points: &[PointRecord],
    root: &str,
) -> Vec<ReassignmentGroup> {
    let moved: Vec<(&str, &str, &str)> = points
        .par_iter()
        .filter_map(|point| {
            let from = owner_of(&point.path, current, root)?;
            let to = owner_of(&point.path, next, root)?;
            (from != to).then_some((from, to, point.path.as_str()))
        })
        .collect();

    let mut groups: BTreeMap<String, ReassignmentGroup> = BTreeMap::new();
    for (from, to, point) in moved {
        groups
            .entry(group_key(Some(from), Some(to)))
            .or_insert_with(|| ReassignmentGroup {
                from: from.to_string(),
                to: to.to_string(),
                points: Vec::new(),
            })
            .points
            .push(point.to_string());
    }

    groups
        .into_values()
        .map(|mut group| {
            group.points.sort();
            group.points.dedup();
            group
        })
        .collect()
}
