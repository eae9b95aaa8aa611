use serde::{Deserialize, Serialize};

use super::audio_models::{AudioDevice, AudioSession, VIRTUAL_PID};

/// Identity of a selected session, independent of any registry snapshot.
///
/// Used to restore the selection after a refresh or an application restart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetInfo {
    pub pid: i64,
    #[serde(default)]
    pub session_instance_id: String,
}

impl TargetInfo {
    pub fn new(pid: i64, session_instance_id: impl Into<String>) -> Self {
        Self {
            pid,
            session_instance_id: session_instance_id.into(),
        }
    }

    /// Target identified only by process id.
    pub fn from_pid(pid: i64) -> Self {
        Self::new(pid, "")
    }

    pub fn is_virtual(&self) -> bool {
        self.pid == VIRTUAL_PID && self.session_instance_id.is_empty()
    }
}

/// What a hotkey action controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Subject {
    /// No-op.
    #[default]
    Null = 0,
    Volume = 1,
    Media = 2,
    Target = 3,
}

/// Result of resolving the current selection for a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Nothing,
    Device(AudioDevice),
    Session(AudioSession),
}

impl Selection {
    /// True when the selection holds a real (non-virtual) object.
    pub fn is_real(&self) -> bool {
        match self {
            Self::Nothing => false,
            Self::Device(device) => !device.is_virtual(),
            Self::Session(session) => !session.is_virtual(),
        }
    }
}

/// Persistable selector state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    /// Explicitly selected device, `None` for "default device".
    pub device_id: Option<String>,
    pub session: Option<TargetInfo>,
    #[serde(default)]
    pub locked: bool,
    /// RFC 3339 timestamp of the export.
    #[serde(default)]
    pub saved_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_values_are_stable() {
        assert_eq!(Subject::Null as u8, 0);
        assert_eq!(Subject::Volume as u8, 1);
        assert_eq!(Subject::Media as u8, 2);
        assert_eq!(Subject::Target as u8, 3);
    }

    #[test]
    fn target_info_from_pid_has_no_instance() {
        let t = TargetInfo::from_pid(9999);
        assert_eq!(t.pid, 9999);
        assert!(t.session_instance_id.is_empty());
        assert!(!t.is_virtual());
        assert!(AudioSession::Virtual.target_info().is_virtual());
    }

    #[test]
    fn virtual_selection_is_not_real() {
        assert!(!Selection::Nothing.is_real());
        assert!(!Selection::Device(AudioDevice::Virtual).is_real());
        assert!(!Selection::Session(AudioSession::Virtual).is_real());
    }

    #[test]
    fn snapshot_deserializes_without_optional_fields() {
        let snap: SelectionSnapshot =
            serde_json::from_str(r#"{"device_id":"dev-1","session":{"pid":42}}"#).unwrap();
        assert_eq!(snap.device_id.as_deref(), Some("dev-1"));
        assert_eq!(snap.session, Some(TargetInfo::from_pid(42)));
        assert!(!snap.locked);
    }
}
