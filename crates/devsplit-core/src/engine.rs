use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::conflict_plan::{self, ConflictPlan};
use crate::analysis::hidden;
use crate::analysis::{MergeManager, MergedDevice, PendingMerge};
use crate::error::Error;
use crate::export::{self, ExportSummary, RowLabel};
use crate::ownership;
use crate::path;
use crate::progress::ProgressReporter;
use crate::records::{self, ColumnSelection, PointRecord};
use crate::state::DeviceState;
use crate::tree::FolderTree;

/// Result of proposing new devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    /// Nothing to add, or every candidate was already a device.
    Unchanged,
    /// No removals and no trimmed selection, so the plan was applied.
    Applied(ConflictPlan),
    /// Staged; call `confirm_plan` or `discard_plan`.
    AwaitingConfirmation(ConflictPlan),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub path: String,
    pub display_name: String,
    pub name_override: Option<String>,
    pub merged_id: Option<String>,
    pub point_count: usize,
}

/// Owns the device set, merged groups, name overrides and hidden folders for
/// one loaded point list. All mutation goes through this type.
pub struct DeviceEngine {
    root: String,
    tree: FolderTree,
    points: Vec<PointRecord>,
    devices: BTreeSet<String>,
    name_overrides: BTreeMap<String, String>,
    merges: MergeManager,
    hidden: Vec<String>,
    pending_plan: Option<ConflictPlan>,
}

impl DeviceEngine {
    pub fn new(root_label: &str) -> Self {
        Self::from_state(root_label, DeviceState::default())
    }

    /// Build from a persisted snapshot, repairing anything that breaks the
    /// engine invariants.
    pub fn from_state(root_label: &str, state: DeviceState) -> Self {
        let root = root_label.to_string();

        let (kept, dropped) = conflict_plan::resolve_selection_overlap(&state.devices, &root);
        if !dropped.is_empty() {
            warn!("Dropped {} nested devices from saved state: {:?}", dropped.len(), dropped);
        }
        let devices: BTreeSet<String> = kept.into_iter().collect();

        let name_overrides: BTreeMap<String, String> = state
            .device_names
            .iter()
            .map(|(p, name)| (path::canonical_path(p, &root), name.trim().to_string()))
            .filter(|(p, name)| devices.contains(p) && !name.is_empty())
            .collect();

        let merges =
            MergeManager::from_groups(state.merged_devices, &root, |p| devices.contains(p));

        let hidden = hidden::most_general(&state.hidden_folders, &root);

        Self {
            tree: FolderTree::empty(&root),
            root,
            points: Vec::new(),
            devices,
            name_overrides,
            merges,
            hidden,
            pending_plan: None,
        }
    }

    /// Replace the point list and rebuild the tree. References to folders that
    /// no longer exist are pruned.
    pub fn load_points(&mut self, points: Vec<PointRecord>, reporter: &dyn ProgressReporter) {
        let start = Instant::now();

        self.tree = FolderTree::build(points.iter().map(|p| p.path.as_str()), &self.root);
        self.points = points;
        self.pending_plan = None;
        self.merges.cancel();

        let stale: Vec<String> = self
            .devices
            .iter()
            .filter(|device| !self.tree.contains(device))
            .cloned()
            .collect();
        for device in &stale {
            self.drop_device(device);
        }
        if !stale.is_empty() {
            warn!("Pruned {} devices missing from the new data", stale.len());
        }

        let before = self.hidden.len();
        self.hidden = hidden::normalize_hidden(&self.hidden, &self.tree);
        if self.hidden.len() != before {
            debug!("Hidden folders normalized from {} to {}", before, self.hidden.len());
        }

        let duration = start.elapsed().as_secs_f64();
        reporter.on_load_complete(self.points.len(), self.tree.len() - 1, duration);
        info!(
            "Loaded {} points into {} folders in {:.2}s",
            self.points.len(),
            self.tree.len() - 1,
            duration
        );
    }

    /// Read points from CSV and load them.
    pub fn read_csv<R: Read>(
        &mut self,
        input: R,
        columns: &ColumnSelection,
        reporter: &dyn ProgressReporter,
    ) -> Result<usize, Error> {
        reporter.on_load_start();
        let points = records::read_points(input, columns, &self.root)?;
        let count = points.len();
        self.load_points(points, reporter);
        Ok(count)
    }

    pub fn root_label(&self) -> &str {
        &self.root
    }

    pub fn tree(&self) -> &FolderTree {
        &self.tree
    }

    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    pub fn devices(&self) -> &BTreeSet<String> {
        &self.devices
    }

    pub fn name_overrides(&self) -> &BTreeMap<String, String> {
        &self.name_overrides
    }

    pub fn merged_devices(&self) -> &[MergedDevice] {
        self.merges.groups()
    }

    pub fn hidden_folders(&self) -> &[String] {
        &self.hidden
    }

    pub fn pending_plan(&self) -> Option<&ConflictPlan> {
        self.pending_plan.as_ref()
    }

    pub fn pending_merge(&self) -> Option<&PendingMerge> {
        self.merges.pending()
    }

    pub fn is_device(&self, raw_path: &str) -> bool {
        self.devices.contains(&path::canonical_path(raw_path, &self.root))
    }

    /// Device folder owning `point_path`, if any.
    pub fn owner_of(&self, point_path: &str) -> Option<&str> {
        let point = path::canonical_path(point_path, &self.root);
        ownership::owner_of(&point, &self.devices, &self.root)
    }

    /// Merged name, then manual override, then the decoded folder name.
    pub fn display_name(&self, device_path: &str) -> String {
        let device = path::canonical_path(device_path, &self.root);
        if let Some(group) = self.merges.group_for(&device) {
            return group.name.clone();
        }
        if let Some(name) = self.name_overrides.get(&device) {
            return name.clone();
        }
        path::display_name(&device, &self.root)
    }

    pub fn is_hidden(&self, point_path: &str) -> bool {
        let point = path::canonical_path(point_path, &self.root);
        hidden::is_hidden(&point, &self.hidden, &self.root)
    }

    /// Export label of a row whose path cell is `raw_path`.
    pub fn row_label(&self, raw_path: &str) -> RowLabel {
        if self.is_hidden(raw_path) {
            return RowLabel::Hidden;
        }
        match self.owner_of(raw_path) {
            Some(owner) => RowLabel::Device(self.display_name(owner)),
            None => RowLabel::Unassigned,
        }
    }

    pub fn owned_points(&self, device_path: &str) -> Vec<&PointRecord> {
        let device = path::canonical_path(device_path, &self.root);
        self.points
            .iter()
            .filter(|point| self.owner_of(&point.path) == Some(device.as_str()))
            .collect()
    }

    pub fn device_summaries(&self) -> Vec<DeviceSummary> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for point in &self.points {
            if let Some(owner) = ownership::owner_of(&point.path, &self.devices, &self.root) {
                *counts.entry(owner).or_insert(0) += 1;
            }
        }

        self.devices
            .iter()
            .map(|device| DeviceSummary {
                path: device.clone(),
                display_name: self.display_name(device),
                name_override: self.name_overrides.get(device).cloned(),
                merged_id: self.merges.group_for(device).map(|g| g.id.clone()),
                point_count: counts.get(device.as_str()).copied().unwrap_or(0),
            })
            .collect()
    }

    /// Canonical folder paths from `paths`; anything that is not a folder of
    /// the current tree is skipped.
    fn known_folders<I, S>(&self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        paths
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref();
                if path::is_root(p, &self.root) {
                    warn!("The root folder cannot be used here");
                    return None;
                }
                match self.tree.get(p) {
                    Some(node) => Some(node.path.clone()),
                    None => {
                        warn!("'{}' is not a folder in the loaded data, ignoring", p);
                        None
                    }
                }
            })
            .collect()
    }

    /// Compute the plan for adding `candidates` without changing anything.
    pub fn plan_devices<I, S>(&self, candidates: I, reporter: &dyn ProgressReporter) -> ConflictPlan
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let start = Instant::now();
        reporter.on_plan_start(self.points.len());
        let folders = self.known_folders(candidates);
        let plan =
            conflict_plan::plan_device_addition(&self.devices, &folders, &self.points, &self.root);
        reporter.on_plan_complete(plan.reassignments.len(), start.elapsed().as_secs_f64());
        plan
    }

    /// Mark folders as devices. Simple additions apply at once; anything that
    /// removes devices or trims the selection waits for confirmation.
    pub fn propose_devices<I, S>(
        &mut self,
        candidates: I,
        reporter: &dyn ProgressReporter,
    ) -> PlanOutcome
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let plan = self.plan_devices(candidates, reporter);
        self.pending_plan = None;

        if plan.to_add.is_empty() || plan.is_noop(&self.devices) {
            return PlanOutcome::Unchanged;
        }
        if plan.requires_confirmation() {
            info!(
                "Plan needs confirmation: {} to remove, {} dropped from selection",
                plan.to_remove.len(),
                plan.dropped_from_selection.len()
            );
            self.pending_plan = Some(plan.clone());
            return PlanOutcome::AwaitingConfirmation(plan);
        }

        self.apply_plan(&plan);
        PlanOutcome::Applied(plan)
    }

    /// Apply the staged plan.
    pub fn confirm_plan(&mut self) -> Option<ConflictPlan> {
        let plan = self.pending_plan.take()?;
        self.apply_plan(&plan);
        Some(plan)
    }

    pub fn discard_plan(&mut self) -> bool {
        self.pending_plan.take().is_some()
    }

    fn apply_plan(&mut self, plan: &ConflictPlan) {
        for device in &plan.to_remove {
            self.drop_device(device);
        }
        for device in &plan.to_add {
            self.devices.insert(device.clone());
        }
        info!(
            "Device set updated: +{} -{}, {} points reassigned, {} devices total",
            plan.to_add.len(),
            plan.to_remove.len(),
            plan.reassigned_point_count(),
            self.devices.len()
        );
    }

    /// Remove a device and everything keyed by it.
    fn drop_device(&mut self, device: &str) -> bool {
        if !self.devices.remove(device) {
            return false;
        }
        self.name_overrides.remove(device);
        self.merges.remove_member(device);
        true
    }

    pub fn remove_devices<I, S>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.pending_plan = None;
        let mut removed = 0;
        for p in paths {
            let device = path::canonical_path(p.as_ref(), &self.root);
            if self.drop_device(&device) {
                removed += 1;
            } else {
                warn!("'{}' is not a device", device);
            }
        }
        if removed > 0 {
            info!("Removed {} devices", removed);
        }
        removed
    }

    /// Set the display name of a device. An empty name clears the override.
    pub fn set_name_override(&mut self, device_path: &str, name: &str) -> bool {
        let device = path::canonical_path(device_path, &self.root);
        if !self.devices.contains(&device) {
            warn!("Cannot rename '{}': not a device", device);
            return false;
        }
        let name = name.trim();
        if name.is_empty() {
            self.name_overrides.remove(&device);
        } else {
            self.name_overrides.insert(device, name.to_string());
        }
        true
    }

    /// Stage a merge of existing or prospective device folders.
    pub fn begin_merge<I, S>(&mut self, paths: I, suggested_name: &str) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: Vec<String> = paths.into_iter().map(|p| p.as_ref().to_string()).collect();
        let folders = self.known_folders(&requested);
        if folders.len() != requested.len() {
            return false;
        }
        self.merges.begin(&folders, suggested_name, &self.root)
    }

    pub fn cancel_merge(&mut self) -> bool {
        self.merges.cancel()
    }

    /// Commit the staged merge under `name`. Staged folders that are not yet
    /// devices become devices, but only when that needs no confirmation.
    pub fn confirm_merge(&mut self, name: &str) -> Option<MergedDevice> {
        if name.trim().is_empty() {
            warn!("Merge name must not be empty");
            return None;
        }
        let pending = self.merges.pending()?.clone();

        let missing: Vec<&String> = pending
            .paths
            .iter()
            .filter(|p| !self.devices.contains(*p))
            .collect();
        if !missing.is_empty() {
            let plan = conflict_plan::plan_device_addition(
                &self.devices,
                &missing,
                &self.points,
                &self.root,
            );
            if plan.requires_confirmation() {
                warn!(
                    "Merge would displace existing devices {:?}; resolve them first",
                    plan.to_remove
                );
                return None;
            }
            self.pending_plan = None;
            self.apply_plan(&plan);
        }

        self.merges.confirm(name)
    }

    pub fn rename_merged(&mut self, id: &str, name: &str) -> bool {
        self.merges.rename(id, name)
    }

    pub fn dissolve_merge(&mut self, id: &str) -> Option<MergedDevice> {
        let group = self.merges.dissolve(id)?;
        info!("Dissolved merged device '{}'", group.name);
        Some(group)
    }

    /// Hide folders; returns the normalized hidden set.
    pub fn hide<I, S>(&mut self, paths: I) -> &[String]
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut candidates = self.hidden.clone();
        candidates.extend(paths.into_iter().map(|p| p.as_ref().to_string()));
        self.hidden = hidden::normalize_hidden(&candidates, &self.tree);
        &self.hidden
    }

    /// Unhide the given folders and anything hidden beneath them.
    pub fn unhide<I, S>(&mut self, paths: I) -> &[String]
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets: Vec<String> = paths
            .into_iter()
            .map(|p| path::canonical_path(p.as_ref(), &self.root))
            .collect();
        let root = &self.root;
        self.hidden
            .retain(|h| !targets.iter().any(|t| path::covers(t, h, root)));
        &self.hidden
    }

    /// Copy CSV rows from `input` to `output` with the device label column.
    pub fn export_csv<R: Read, W: Write>(
        &self,
        input: R,
        output: W,
        path_column: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<ExportSummary, Error> {
        export::project_csv(
            input,
            output,
            path_column,
            &self.root,
            |raw| self.row_label(raw),
            reporter,
        )
    }

    pub fn snapshot(&self) -> DeviceState {
        DeviceState {
            devices: self.devices.iter().cloned().collect(),
            device_names: self.name_overrides.clone(),
            merged_devices: self.merges.groups().to_vec(),
            hidden_folders: self.hidden.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;

    fn engine(paths: &[&str]) -> DeviceEngine {
        let mut engine = DeviceEngine::new("root");
        let points = paths
            .iter()
            .map(|p| PointRecord::new(p, "Points", "root"))
            .collect();
        engine.load_points(points, &SilentReporter);
        engine
    }

    #[test]
    fn test_unknown_candidates_are_ignored() {
        let mut engine = engine(&["root/A/1"]);
        let outcome = engine.propose_devices(["root/missing", "root", "root/A/1"], &SilentReporter);
        assert_eq!(outcome, PlanOutcome::Unchanged);
        assert!(engine.devices().is_empty());
    }

    #[test]
    fn test_pending_plan_cleared_by_removal() {
        let mut engine = engine(&["root/A/sub/1", "root/B/1"]);
        engine.propose_devices(["root/A"], &SilentReporter);
        let outcome = engine.propose_devices(["root/A/sub"], &SilentReporter);
        assert!(matches!(outcome, PlanOutcome::AwaitingConfirmation(_)));
        engine.remove_devices(["root/A"]);
        assert!(engine.confirm_plan().is_none());
    }

    #[test]
    fn test_name_override_cleared_by_empty_name() {
        let mut engine = engine(&["root/A/1"]);
        engine.propose_devices(["root/A"], &SilentReporter);
        assert!(engine.set_name_override("root/A", "Air"));
        assert_eq!(engine.display_name("root/A"), "Air");
        assert!(engine.set_name_override("root/A", "  "));
        assert_eq!(engine.display_name("root/A"), "A");
        assert!(!engine.set_name_override("root/B", "nope"));
    }
}
