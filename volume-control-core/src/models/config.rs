use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::device_state::DeviceState;

/// Configuration for a volume control runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfiguration {
    /// States to include when enumerating endpoints (default: active + disabled).
    pub device_state_mask: DeviceState,

    /// Period of the background refresh in milliseconds (None = notifications only).
    pub refresh_interval_ms: Option<u64>,

    /// Upper bound for a single native call in milliseconds (None = unbounded).
    pub native_call_timeout_ms: Option<u64>,

    /// Default step for the volume up/down actions (0.0, 1.0].
    pub volume_step: f32,

    /// Register the built-in volume/target actions on startup (default: true).
    pub register_builtin_actions: bool,
}

impl ControlConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.device_state_mask.is_empty() {
            return Err("device state mask must not be empty".into());
        }
        if !DeviceState::ALL.contains(self.device_state_mask) {
            return Err(format!(
                "unsupported device state mask: {:#x}",
                self.device_state_mask.bits()
            ));
        }
        if !(self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(format!("volume step out of range: {}", self.volume_step));
        }
        if self.refresh_interval_ms == Some(0) {
            return Err("refresh interval must be positive".into());
        }
        if self.native_call_timeout_ms == Some(0) {
            return Err("native call timeout must be positive".into());
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_ms.map(Duration::from_millis)
    }

    pub fn native_call_timeout(&self) -> Option<Duration> {
        self.native_call_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ControlConfiguration {
    fn default() -> Self {
        Self {
            device_state_mask: DeviceState::ACTIVE | DeviceState::DISABLED,
            refresh_interval_ms: Some(2000),
            native_call_timeout_ms: Some(500),
            volume_step: 0.02,
            register_builtin_actions: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_is_valid() {
        assert!(ControlConfiguration::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = ControlConfiguration {
            volume_step: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.volume_step = 0.05;
        config.device_state_mask = DeviceState::empty();
        assert!(config.validate().is_err());

        config.device_state_mask = DeviceState::ACCESS_ERROR;
        assert!(config.validate().is_err());

        config.device_state_mask = DeviceState::ACTIVE;
        config.refresh_interval_ms = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ControlConfiguration =
            serde_json::from_str(r#"{"volume_step":0.1,"refresh_interval_ms":null}"#).unwrap();
        assert_relative_eq!(config.volume_step, 0.1);
        assert_eq!(config.refresh_interval(), None);
        assert_eq!(config.native_call_timeout(), Some(Duration::from_millis(500)));
        assert!(config.register_builtin_actions);
    }
}
