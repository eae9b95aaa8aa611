use std::fmt;

use crate::models::audio_models::DataFlow;
use crate::models::device_state::DeviceState;
use crate::models::error::ControlError;

/// Raw result code from the native audio layer.
///
/// Success is represented by `Ok(..)`; a `NativeStatus` is always a failure.
/// Codes are HRESULT-shaped so the Windows backend can pass them through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeStatus(pub i32);

impl NativeStatus {
    /// `HRESULT_FROM_WIN32(ERROR_NOT_FOUND)`
    pub const NOT_FOUND: Self = Self(0x8007_0490_u32 as i32);
    /// `E_ACCESSDENIED`
    pub const ACCESS_DENIED: Self = Self(0x8007_0005_u32 as i32);
    /// `AUDCLNT_E_DEVICE_INVALIDATED`
    pub const INVALID_STATE: Self = Self(0x8889_0004_u32 as i32);
    /// `HRESULT_FROM_WIN32(ERROR_TIMEOUT)`
    pub const TIMED_OUT: Self = Self(0x8007_05B4_u32 as i32);
    /// `E_FAIL`
    pub const FAILED: Self = Self(0x8000_4005_u32 as i32);

    pub fn class(self) -> FailureClass {
        match self {
            Self::NOT_FOUND => FailureClass::NotFound,
            Self::ACCESS_DENIED => FailureClass::AccessDenied,
            Self::INVALID_STATE => FailureClass::InvalidState,
            Self::TIMED_OUT => FailureClass::TimedOut,
            _ => FailureClass::Other,
        }
    }

    /// Translate into the registry-level condition for `subject`.
    pub fn into_control_error(self, subject: &str) -> ControlError {
        match self.class() {
            FailureClass::NotFound | FailureClass::InvalidState => {
                ControlError::DeviceUnavailable(subject.to_string())
            }
            FailureClass::AccessDenied => ControlError::AccessDenied(subject.to_string()),
            FailureClass::TimedOut => ControlError::Timeout(subject.to_string()),
            FailureClass::Other => ControlError::DeviceUnavailable(format!("{} ({})", subject, self)),
        }
    }
}

impl fmt::Display for NativeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0 as u32)
    }
}

/// Documented failure classes of the native layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    NotFound,
    AccessDenied,
    InvalidState,
    TimedOut,
    Other,
}

pub type NativeResult<T> = Result<T, NativeStatus>;

/// Opaque reference to a native endpoint or session.
///
/// Handles identify objects by their stable string identifiers rather than
/// holding interface pointers, so a handle stays valid to pass around after
/// the underlying object disappears; calls on it then fail with `NOT_FOUND`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NativeHandle {
    Endpoint { device_id: String },
    Session { device_id: String, instance_id: String },
}

impl NativeHandle {
    pub fn endpoint(device_id: &str) -> Self {
        Self::Endpoint {
            device_id: device_id.to_string(),
        }
    }

    pub fn session(device_id: &str, instance_id: &str) -> Self {
        Self::Session {
            device_id: device_id.to_string(),
            instance_id: instance_id.to_string(),
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            Self::Endpoint { device_id } | Self::Session { device_id, .. } => device_id,
        }
    }
}

/// Endpoint as reported by the native enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeDevice {
    pub handle: NativeHandle,
    pub id: String,
    pub name: String,
    pub state: DeviceState,
    pub flow: DataFlow,
}

/// Session as reported by the native enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeSession {
    pub handle: NativeHandle,
    pub pid: u32,
    pub process_name: String,
    pub instance_id: String,
    pub volume: f32,
    pub muted: bool,
}

/// Capability interface over the operating system's audio endpoint and
/// session API.
///
/// Implemented by:
/// - `WasapiGateway` (Windows, `volume-control-windows`)
/// - `MockGateway` (scriptable, in-memory)
/// - `BoundedGateway` (wraps another gateway with a per-call time bound)
///
/// Every call reports failure through `NativeStatus`; a vanished device is an
/// ordinary `NOT_FOUND`, never a panic.
pub trait NativeAudioGateway: Send + Sync {
    /// Enumerate endpoints whose state intersects `state_mask`, in native order.
    fn enumerate_devices(&self, state_mask: DeviceState) -> NativeResult<Vec<NativeDevice>>;

    /// Enumerate the sessions of an endpoint, in native order.
    fn sessions_for_device(&self, device: &NativeHandle) -> NativeResult<Vec<NativeSession>>;

    /// Current scalar volume (0.0 to 1.0).
    fn get_volume(&self, handle: &NativeHandle) -> NativeResult<f32>;

    fn set_volume(&self, handle: &NativeHandle, level: f32) -> NativeResult<()>;

    fn get_mute(&self, handle: &NativeHandle) -> NativeResult<bool>;

    fn set_mute(&self, handle: &NativeHandle, muted: bool) -> NativeResult<()>;

    /// Identifier of the system default endpoint for `flow`, if the backend
    /// knows one.
    fn default_device_id(&self, _flow: DataFlow) -> NativeResult<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes() {
        assert_eq!(NativeStatus::NOT_FOUND.class(), FailureClass::NotFound);
        assert_eq!(NativeStatus::ACCESS_DENIED.class(), FailureClass::AccessDenied);
        assert_eq!(NativeStatus::INVALID_STATE.class(), FailureClass::InvalidState);
        assert_eq!(NativeStatus(-1).class(), FailureClass::Other);
    }

    #[test]
    fn statuses_translate_to_registry_conditions() {
        assert_eq!(
            NativeStatus::NOT_FOUND.into_control_error("dev"),
            ControlError::DeviceUnavailable("dev".into())
        );
        assert_eq!(
            NativeStatus::INVALID_STATE.into_control_error("dev"),
            ControlError::DeviceUnavailable("dev".into())
        );
        assert_eq!(
            NativeStatus::ACCESS_DENIED.into_control_error("dev"),
            ControlError::AccessDenied("dev".into())
        );
        assert_eq!(
            NativeStatus::TIMED_OUT.into_control_error("dev"),
            ControlError::Timeout("dev".into())
        );
    }

    #[test]
    fn status_displays_as_hresult() {
        assert_eq!(NativeStatus::ACCESS_DENIED.to_string(), "0x80070005");
    }

    #[test]
    fn handle_exposes_device_id() {
        assert_eq!(NativeHandle::endpoint("a").device_id(), "a");
        assert_eq!(NativeHandle::session("b", "s1").device_id(), "b");
    }
}
