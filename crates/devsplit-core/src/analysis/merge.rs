use ahash::AHashSet;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::path;

/// Several device folders shown under one name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedDevice {
    pub id: String,
    pub name: String,
    pub member_paths: Vec<String>,
}

impl MergedDevice {
    pub fn contains(&self, path: &str) -> bool {
        self.member_paths.iter().any(|member| member == path)
    }
}

/// A merge staged by `begin` and waiting for a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMerge {
    pub paths: Vec<String>,
    pub suggested_name: String,
}

/// Owns the merged groups. Each folder path is a member of at most one group.
#[derive(Debug, Clone, Default)]
pub struct MergeManager {
    groups: Vec<MergedDevice>,
    pending: Option<PendingMerge>,
}

impl MergeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted groups. Members that are not devices, or are
    /// already claimed by an earlier group, are dropped; unnamed and empty
    /// groups are discarded.
    pub fn from_groups<F>(groups: Vec<MergedDevice>, root: &str, is_device: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        let mut claimed: AHashSet<String> = AHashSet::new();
        let mut seen_ids: AHashSet<String> = AHashSet::new();
        let mut kept = Vec::new();

        for group in groups {
            let name = group.name.trim().to_string();
            if name.is_empty() {
                continue;
            }

            let mut members: Vec<String> = group
                .member_paths
                .iter()
                .map(|p| path::canonical_path(p, root))
                .filter(|p| is_device(p.as_str()))
                .collect();
            members.sort();
            members.dedup();
            members.retain(|p| claimed.insert(p.clone()));
            if members.is_empty() {
                continue;
            }

            let id = if group.id.trim().is_empty() || !seen_ids.insert(group.id.clone()) {
                Uuid::new_v4().to_string()
            } else {
                group.id
            };

            kept.push(MergedDevice {
                id,
                name,
                member_paths: members,
            });
        }

        Self {
            groups: kept,
            pending: None,
        }
    }

    pub fn groups(&self) -> &[MergedDevice] {
        &self.groups
    }

    pub fn group_for(&self, path: &str) -> Option<&MergedDevice> {
        self.groups.iter().find(|group| group.contains(path))
    }

    pub fn pending(&self) -> Option<&PendingMerge> {
        self.pending.as_ref()
    }

    /// Stage a merge. Needs at least two distinct, non-nested folder paths.
    pub fn begin<I, S>(&mut self, paths: I, suggested_name: &str, root: &str) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut unique: Vec<String> = paths
            .into_iter()
            .filter(|p| !path::is_root(p.as_ref(), root))
            .map(|p| path::canonical_path(p.as_ref(), root))
            .collect();
        unique.sort();
        unique.dedup();

        if unique.len() < 2 {
            warn!("Merge needs at least two distinct folders, got {}", unique.len());
            return false;
        }

        for (i, a) in unique.iter().enumerate() {
            for b in &unique[i + 1..] {
                if path::relate(a, b, root).is_overlap() {
                    warn!("Cannot merge nested folders '{}' and '{}'", a, b);
                    return false;
                }
            }
        }

        self.pending = Some(PendingMerge {
            paths: unique,
            suggested_name: suggested_name.trim().to_string(),
        });
        true
    }

    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Commit the staged merge. Any existing group sharing a member with the
    /// new one is removed whole.
    pub fn confirm(&mut self, name: &str) -> Option<MergedDevice> {
        let name = name.trim();
        if name.is_empty() {
            warn!("Merge name must not be empty");
            return None;
        }
        let pending = self.pending.take()?;

        let before = self.groups.len();
        self.groups
            .retain(|group| !pending.paths.iter().any(|p| group.contains(p)));
        let replaced = before - self.groups.len();

        let merged = MergedDevice {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            member_paths: pending.paths,
        };
        info!(
            "Merged {} folders into '{}' (replaced {} groups)",
            merged.member_paths.len(),
            merged.name,
            replaced
        );
        self.groups.push(merged.clone());
        Some(merged)
    }

    /// Drop `path` from every group; groups left empty are deleted.
    pub fn remove_member(&mut self, path: &str) {
        for group in &mut self.groups {
            group.member_paths.retain(|member| member != path);
        }
        self.groups.retain(|group| !group.member_paths.is_empty());
    }

    pub fn rename(&mut self, id: &str, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        match self.groups.iter_mut().find(|group| group.id == id) {
            Some(group) => {
                group.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn dissolve(&mut self, id: &str) -> Option<MergedDevice> {
        let idx = self.groups.iter().position(|group| group.id == id)?;
        Some(self.groups.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "root";

    fn merged(manager: &mut MergeManager, paths: &[&str], name: &str) -> MergedDevice {
        assert!(manager.begin(paths.iter().copied(), name, ROOT));
        manager.confirm(name).unwrap()
    }

    #[test]
    fn test_begin_requires_two_distinct_paths() {
        let mut manager = MergeManager::new();
        assert!(!manager.begin(["root/A"], "A", ROOT));
        assert!(!manager.begin(["root/A", "root/A/"], "A", ROOT));
        assert!(manager.pending().is_none());
        assert!(manager.begin(["root/B", "root/A"], "AB", ROOT));
        assert_eq!(manager.pending().unwrap().paths, vec!["root/A", "root/B"]);
    }

    #[test]
    fn test_begin_rejects_nested_paths() {
        let mut manager = MergeManager::new();
        assert!(!manager.begin(["root/A", "root/A/B"], "x", ROOT));
    }

    #[test]
    fn test_confirm_requires_name() {
        let mut manager = MergeManager::new();
        manager.begin(["root/A", "root/B"], "", ROOT);
        assert!(manager.confirm("   ").is_none());
        assert!(manager.pending().is_some());
        let group = manager.confirm(" Pumps ").unwrap();
        assert_eq!(group.name, "Pumps");
        assert!(manager.pending().is_none());
    }

    #[test]
    fn test_cancel_discards_pending() {
        let mut manager = MergeManager::new();
        manager.begin(["root/A", "root/B"], "AB", ROOT);
        assert!(manager.cancel());
        assert!(manager.confirm("AB").is_none());
        assert!(manager.groups().is_empty());
    }

    #[test]
    fn test_overlapping_group_is_replaced_whole() {
        let mut manager = MergeManager::new();
        merged(&mut manager, &["root/A", "root/B", "root/C"], "first");
        merged(&mut manager, &["root/D", "root/E"], "second");
        let third = merged(&mut manager, &["root/C", "root/F"], "third");

        let names: Vec<&str> = manager.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["second", "third"]);
        // root/A and root/B are no longer merged at all.
        assert!(manager.group_for("root/A").is_none());
        assert_eq!(manager.group_for("root/C").unwrap().id, third.id);
    }

    #[test]
    fn test_membership_stays_unique() {
        let mut manager = MergeManager::new();
        merged(&mut manager, &["root/A", "root/B"], "1");
        merged(&mut manager, &["root/B", "root/C"], "2");
        merged(&mut manager, &["root/D", "root/A"], "3");
        merged(&mut manager, &["root/C", "root/E"], "4");

        let mut seen = AHashSet::new();
        for group in manager.groups() {
            for member in &group.member_paths {
                assert!(seen.insert(member.clone()), "{} in two groups", member);
            }
        }
    }

    #[test]
    fn test_remove_member_prunes_empty_groups() {
        let mut manager = MergeManager::new();
        merged(&mut manager, &["root/A", "root/B"], "AB");
        manager.remove_member("root/A");
        assert_eq!(manager.groups()[0].member_paths, vec!["root/B"]);
        manager.remove_member("root/B");
        assert!(manager.groups().is_empty());
    }

    #[test]
    fn test_from_groups_sanitizes() {
        let groups = vec![
            MergedDevice {
                id: "g1".to_string(),
                name: "One".to_string(),
                member_paths: vec!["root/A".to_string(), "root/gone".to_string()],
            },
            MergedDevice {
                id: "g1".to_string(),
                name: "Two".to_string(),
                member_paths: vec!["A".to_string(), "root/B".to_string()],
            },
            MergedDevice {
                id: "g3".to_string(),
                name: "  ".to_string(),
                member_paths: vec!["root/C".to_string()],
            },
        ];
        let manager =
            MergeManager::from_groups(groups, ROOT, |p| ["root/A", "root/B", "root/C"].contains(&p));

        assert_eq!(manager.groups().len(), 2);
        assert_eq!(manager.groups()[0].member_paths, vec!["root/A"]);
        assert_eq!(manager.groups()[1].member_paths, vec!["root/B"]);
        assert_ne!(manager.groups()[1].id, "g1");
    }

    #[test]
    fn test_rename_and_dissolve() {
        let mut manager = MergeManager::new();
        let group = merged(&mut manager, &["root/A", "root/B"], "AB");
        assert!(manager.rename(&group.id, "Air"));
        assert!(!manager.rename(&group.id, ""));
        assert_eq!(manager.groups()[0].name, "Air");
        assert!(manager.dissolve(&group.id).is_some());
        assert!(manager.dissolve(&group.id).is_none());
    }
}
