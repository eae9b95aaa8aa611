use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ControlError;

/// Identifier the hotkey source reports when a combination fires.
pub type HotkeyId = u32;

/// Settings payload attached to a hotkey binding.
///
/// Stored as JSON so bindings can reference actions from plugins whose
/// settings types are unknown to the host.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSettings(Value);

impl ActionSettings {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn from_typed<T: Serialize>(settings: &T) -> Result<Self, ControlError> {
        serde_json::to_value(settings)
            .map(Self)
            .map_err(|e| ControlError::InvalidConfiguration(format!("unserializable settings: {}", e)))
    }

    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Deserialize into a handler's settings type; empty settings yield `T::default()`.
    pub fn typed<T: DeserializeOwned + Default>(&self) -> Result<T, ControlError> {
        if self.is_empty() {
            return Ok(T::default());
        }
        serde_json::from_value(self.0.clone())
            .map_err(|e| ControlError::InvalidConfiguration(format!("bad action settings: {}", e)))
    }

    pub fn raw(&self) -> &Value {
        &self.0
    }
}

/// Association of a hotkey with a named action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotkeyBinding {
    pub id: HotkeyId,
    pub action: String,
    #[serde(default)]
    pub settings: ActionSettings,
}

impl HotkeyBinding {
    pub fn new(id: HotkeyId, action: impl Into<String>) -> Self {
        Self {
            id,
            action: action.into(),
            settings: ActionSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ActionSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Event arguments handed to an action handler.
#[derive(Debug, Clone, PartialEq)]
pub struct HotkeyPressed {
    pub hotkey_id: Option<HotkeyId>,
    pub action_name: String,
    pub settings: ActionSettings,
}

impl HotkeyPressed {
    pub fn from_binding(binding: &HotkeyBinding) -> Self {
        Self {
            hotkey_id: Some(binding.id),
            action_name: binding.action.clone(),
            settings: binding.settings.clone(),
        }
    }

    /// Event for an action triggered without a hotkey (tray menu, plugin call).
    pub fn manual(action_name: impl Into<String>, settings: ActionSettings) -> Self {
        Self {
            hotkey_id: None,
            action_name: action_name.into(),
            settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct StepSettings {
        step: f32,
    }

    #[test]
    fn empty_settings_yield_default() {
        let settings = ActionSettings::default();
        assert!(settings.is_empty());
        assert_eq!(settings.typed::<StepSettings>().unwrap(), StepSettings::default());
        assert!(ActionSettings::new(json!({})).is_empty());
    }

    #[test]
    fn typed_settings_deserialize() {
        let settings = ActionSettings::new(json!({ "step": 0.5 }));
        assert_eq!(settings.typed::<StepSettings>().unwrap(), StepSettings { step: 0.5 });
    }

    #[test]
    fn malformed_settings_are_reported() {
        let settings = ActionSettings::new(json!({ "step": "loud" }));
        assert!(matches!(
            settings.typed::<StepSettings>(),
            Err(ControlError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn binding_roundtrips_without_settings() {
        let binding: HotkeyBinding = serde_json::from_str(r#"{"id":3,"action":"Volume Up"}"#).unwrap();
        assert_eq!(binding, HotkeyBinding::new(3, "Volume Up"));
        let pressed = HotkeyPressed::from_binding(&binding);
        assert_eq!(pressed.hotkey_id, Some(3));
        assert_eq!(pressed.action_name, "Volume Up");
    }
}
