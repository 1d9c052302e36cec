use std::collections::BTreeMap;
use std::fs;

use tempfile::tempdir;

use devsplit_core::analysis::MergedDevice;
use devsplit_core::records::PointRecord;
use devsplit_core::state::{load_state, save_state, DeviceState};
use devsplit_core::{DeviceEngine, SilentReporter};

const ROOT: &str = "root";

fn points(paths: &[&str]) -> Vec<PointRecord> {
    paths
        .iter()
        .map(|p| PointRecord::new(p, "Points", ROOT))
        .collect()
}

#[test]
fn test_missing_file_gives_default_state() {
    let tmp = tempdir().unwrap();
    let state = load_state(&tmp.path().join("absent.json"));
    assert_eq!(state, DeviceState::default());
}

#[test]
fn test_corrupt_file_gives_default_state() {
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("state.json");
    fs::write(&file, "\u{0}\u{1}garbage").unwrap();
    assert_eq!(load_state(&file), DeviceState::default());
}

#[test]
fn test_engine_state_survives_save_and_load() {
    let tmp = tempdir().unwrap();
    let file = tmp.path().join("nested").join("state.json");
    let data = points(&["root/A/1", "root/B/1", "root/C/1", "root/H/1"]);

    let mut engine = DeviceEngine::new(ROOT);
    engine.load_points(data.clone(), &SilentReporter);
    engine.propose_devices(["root/A", "root/B", "root/C"], &SilentReporter);
    engine.set_name_override("root/C", "Chiller");
    engine.begin_merge(["root/A", "root/B"], "");
    let group = engine.confirm_merge("Air").unwrap();
    engine.hide(["root/H"]);

    save_state(&file, &engine.snapshot()).unwrap();

    let mut restored = DeviceEngine::from_state(ROOT, load_state(&file));
    restored.load_points(data, &SilentReporter);

    assert_eq!(restored.snapshot(), engine.snapshot());
    assert_eq!(restored.merged_devices()[0].id, group.id);
    assert_eq!(restored.display_name("root/B"), "Air");
    assert_eq!(restored.display_name("root/C"), "Chiller");
    assert!(restored.is_hidden("root/H/1"));
}

#[test]
fn test_inconsistent_state_is_repaired_on_construction() {
    let mut device_names = BTreeMap::new();
    device_names.insert("root/A/x".to_string(), "Gone".to_string());
    device_names.insert("B".to_string(), " Boiler ".to_string());

    let state = DeviceState {
        devices: vec![
            "root/A".to_string(),
            "root/A/x".to_string(),
            "B".to_string(),
            "root".to_string(),
        ],
        device_names,
        merged_devices: vec![
            MergedDevice {
                id: "m1".to_string(),
                name: "Pair".to_string(),
                member_paths: vec!["root/A/x".to_string(), "root/B".to_string()],
            },
            MergedDevice {
                id: "m2".to_string(),
                name: "Dup".to_string(),
                member_paths: vec!["root/B".to_string()],
            },
        ],
        hidden_folders: vec!["root/H".to_string(), "root/H/I".to_string()],
    };

    let mut engine = DeviceEngine::from_state(ROOT, state);

    // Already minimal before any points are loaded.
    assert_eq!(engine.snapshot().hidden_folders, vec!["root/H".to_string()]);

    // The nested ancestor is dropped, the more specific device kept.
    assert_eq!(
        engine.devices().iter().collect::<Vec<_>>(),
        vec!["root/A/x", "root/B"]
    );
    assert_eq!(
        engine.name_overrides().get("root/B").map(String::as_str),
        Some("Boiler")
    );
    assert_eq!(engine.merged_devices().len(), 1);
    assert_eq!(engine.merged_devices()[0].id, "m1");

    engine.load_points(points(&["root/A/x/1", "root/B/1", "root/H/I/1"]), &SilentReporter);
    assert_eq!(engine.hidden_folders(), ["root/H".to_string()]);
}
