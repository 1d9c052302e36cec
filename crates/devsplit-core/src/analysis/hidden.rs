use std::collections::BTreeSet;

use crate::path;
use crate::tree::FolderTree;

/// Reduce hidden folder candidates to their most general form.
///
/// Blank entries, the root, and folders missing from `tree` are discarded;
/// anything beneath another kept entry is dropped. Result is sorted.
pub fn normalize_hidden<I, S>(candidates: I, tree: &FolderTree) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let root = tree.root_label();
    let known = candidates
        .into_iter()
        .filter(|c| !path::is_root(c.as_ref(), root))
        .map(|c| path::canonical_path(c.as_ref(), root))
        .filter(|c| tree.contains(c));
    most_general(known, root)
}

/// Canonical, deduplicated, root-free paths with anything beneath another
/// entry removed. Result is sorted. Does not check folder existence.
pub fn most_general<I, S>(candidates: I, root: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = candidates
        .into_iter()
        .filter(|c| !path::is_root(c.as_ref(), root))
        .map(|c| path::canonical_path(c.as_ref(), root))
        .collect();

    unique
        .iter()
        .filter(|candidate| {
            !unique.iter().any(|other| {
                other != *candidate
                    && path::relate(other, candidate, root) == path::PathRelation::Ancestor
            })
        })
        .cloned()
        .collect()
}

/// True when `point_path` is at or beneath any hidden folder.
pub fn is_hidden<'a, I>(point_path: &str, hidden: I, root: &str) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    hidden
        .into_iter()
        .any(|folder| path::covers(folder, point_path, root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> FolderTree {
        FolderTree::build(
            [
                "root/A/B/C/1",
                "root/A/2",
                "root/D/E/3",
                "root/F/4",
            ],
            "root",
        )
    }

    #[test]
    fn test_keeps_most_general() {
        let tree = tree();
        let hidden = normalize_hidden(["root/A", "root/A/B"], &tree);
        assert_eq!(hidden, vec!["root/A"]);
    }

    #[test]
    fn test_discards_root_blank_and_stale() {
        let tree = tree();
        let hidden = normalize_hidden(["root", "  ", "root/gone", " root/F ", "D/E"], &tree);
        assert_eq!(hidden, vec!["root/D/E", "root/F"]);
    }

    #[test]
    fn test_is_idempotent_and_minimal() {
        let tree = tree();
        let once = normalize_hidden(
            ["root/A/B/C", "root/D/E", "root/A/B", "root/D", "root/F"],
            &tree,
        );
        let twice = normalize_hidden(&once, &tree);
        assert_eq!(once, twice);
        assert_eq!(once, vec!["root/A/B", "root/D", "root/F"]);
        for a in &once {
            for b in &once {
                assert!(a == b || !path::covers(a, b, "root"));
            }
        }
    }

    #[test]
    fn test_most_general_without_tree() {
        let hidden = most_general(["root/H/I", "H", " root/H ", "root", "root/J"], "root");
        assert_eq!(hidden, vec!["root/H", "root/J"]);
    }

    #[test]
    fn test_is_hidden() {
        let hidden = vec!["root/H".to_string()];
        assert!(is_hidden("root/H/anything", &hidden, "root"));
        assert!(is_hidden("root/H", &hidden, "root"));
        assert!(!is_hidden("root/Hx/1", &hidden, "root"));
    }
}
