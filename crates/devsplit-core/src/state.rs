use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::analysis::MergedDevice;
use crate::error::Error;

/// Serializable snapshot of everything the engine persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceState {
    pub devices: Vec<String>,
    pub device_names: BTreeMap<String, String>,
    pub merged_devices: Vec<MergedDevice>,
    pub hidden_folders: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StateFile<'a> {
    #[serde(flatten)]
    state: &'a DeviceState,
    saved_at: String,
}

impl DeviceState {
    /// Decode leniently. Each key is read on its own; values of the wrong
    /// shape are dropped element by element.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            devices: string_list(obj.get("devices")),
            device_names: string_map(obj.get("deviceNames")),
            merged_devices: obj
                .get("mergedDevices")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| serde_json::from_value(item.clone()).ok())
                        .collect()
                })
                .unwrap_or_default(),
            hidden_folders: string_list(obj.get("hiddenFolders")),
        }
    }

    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::from_value(&value),
            Err(e) => {
                warn!("Discarding unreadable state: {}", e);
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        let file = StateFile {
            state: self,
            saved_at: chrono::Utc::now().to_rfc3339(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Load persisted state. Never fails: a missing or unreadable file gives the
/// empty default.
pub fn load_state(path: &Path) -> DeviceState {
    match fs::read_to_string(path) {
        Ok(text) => {
            debug!("Loading state from {}", path.display());
            DeviceState::from_json_str(&text)
        }
        Err(e) => {
            debug!("No state at {} ({}), starting empty", path.display(), e);
            DeviceState::default()
        }
    }
}

pub fn save_state(path: &Path, state: &DeviceState) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, state.to_json()?)?;
    debug!("State saved to {}", path.display());
    Ok(())
}
