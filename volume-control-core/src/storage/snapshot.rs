use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::config::ControlConfiguration;
use crate::models::error::ControlError;
use crate::models::hotkey::HotkeyBinding;
use crate::models::target::SelectionSnapshot;

/// Serialize `value` as pretty JSON to `path`.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), ControlError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ControlError::Storage(format!("failed to serialize {}: {}", path.display(), e)))?;
    fs::write(path, json)
        .map_err(|e| ControlError::Storage(format!("failed to write {}: {}", path.display(), e)))?;
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ControlError> {
    let json = fs::read_to_string(path)
        .map_err(|e| ControlError::Storage(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&json)
        .map_err(|e| ControlError::Storage(format!("failed to parse {}: {}", path.display(), e)))
}

/// Save the selection, stamping `saved_at` with the current time.
pub fn save_selection(snapshot: &SelectionSnapshot, path: &Path) -> Result<(), ControlError> {
    let stamped = SelectionSnapshot {
        saved_at: Some(chrono::Utc::now().to_rfc3339()),
        ..snapshot.clone()
    };
    write_json(&stamped, path)
}

pub fn load_selection(path: &Path) -> Result<SelectionSnapshot, ControlError> {
    read_json(path)
}

pub fn save_hotkeys(bindings: &[HotkeyBinding], path: &Path) -> Result<(), ControlError> {
    write_json(&bindings, path)
}

pub fn load_hotkeys(path: &Path) -> Result<Vec<HotkeyBinding>, ControlError> {
    read_json(path)
}

pub fn save_configuration(config: &ControlConfiguration, path: &Path) -> Result<(), ControlError> {
    write_json(config, path)
}

/// Load and validate a configuration file.
pub fn load_configuration(path: &Path) -> Result<ControlConfiguration, ControlError> {
    let config: ControlConfiguration = read_json(path)?;
    config.validate().map_err(ControlError::InvalidConfiguration)?;
    Ok(config)
}
