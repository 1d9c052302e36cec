use crate::path::{self, PathRelation};

/// The device that owns `point_path`: the deepest device folder that is the
/// point itself or one of its ancestors.
///
/// Does not rely on the device set being free of overlaps. Equal-depth ties
/// (only possible with duplicate spellings) go to the first candidate seen.
pub fn owner_of<'a, I>(point_path: &str, devices: I, root: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut best: Option<(&'a str, usize)> = None;

    for device in devices {
        match path::relate(device, point_path, root) {
            PathRelation::Ancestor | PathRelation::Same => {
                let depth = path::depth(device, root);
                if best.map_or(true, |(_, best_depth)| depth > best_depth) {
                    best = Some((device.as_str(), depth));
                }
            }
            _ => {}
        }
    }

    best.map(|(device, _)| device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn devices(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_owner_is_containing_device() {
        let set = devices(&["root/A", "root/C"]);
        assert_eq!(owner_of("root/A/1", &set, "root"), Some("root/A"));
        assert_eq!(owner_of("root/A/x/y/2", &set, "root"), Some("root/A"));
        assert_eq!(owner_of("root/B/1", &set, "root"), None);
    }

    #[test]
    fn test_owner_picks_deepest_when_overlapping() {
        let set = devices(&["root/A", "root/A/sub", "root/A/sub/deeper"]);
        assert_eq!(owner_of("root/A/sub/1", &set, "root"), Some("root/A/sub"));
        assert_eq!(
            owner_of("root/A/sub/deeper/1", &set, "root"),
            Some("root/A/sub/deeper")
        );
        assert_eq!(owner_of("root/A/other/1", &set, "root"), Some("root/A"));
    }

    #[test]
    fn test_root_device_owns_nothing() {
        let set = devices(&["root"]);
        assert_eq!(owner_of("root/A/1", &set, "root"), None);
    }

    #[test]
    fn test_no_devices() {
        let set = devices(&[]);
        assert_eq!(owner_of("root/A/1", &set, "root"), None);
    }
}
