use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::device_state::DeviceState;
use super::target::TargetInfo;
use crate::traits::native_gateway::{NativeDevice, NativeHandle, NativeSession};

/// PID reported by the virtual session.
pub const VIRTUAL_PID: i64 = -1;

/// Direction of an audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFlow {
    Render,
    Capture,
}

/// An enumerated audio endpoint.
///
/// Immutable once built; a refresh that observes a different state or name
/// replaces the whole value.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub state: DeviceState,
    pub flow: DataFlow,
    pub(crate) handle: NativeHandle,
}

impl DeviceInfo {
    pub(crate) fn from_native(native: NativeDevice) -> Self {
        Self {
            id: native.id,
            name: native.name,
            state: native.state,
            flow: native.flow,
            handle: native.handle,
        }
    }
}

/// One process's audio stream on an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub pid: u32,
    pub process_name: String,
    pub instance_id: String,
    /// Identifier of the owning endpoint. Resolve it through the registry;
    /// the endpoint may have been replaced since this snapshot was taken.
    pub device_id: String,
    pub volume: f32,
    pub muted: bool,
    pub(crate) handle: NativeHandle,
}

impl SessionInfo {
    pub(crate) fn from_native(device_id: &str, native: NativeSession) -> Self {
        Self {
            pid: native.pid,
            process_name: native.process_name,
            instance_id: native.instance_id,
            device_id: device_id.to_string(),
            volume: native.volume.clamp(0.0, 1.0),
            muted: native.muted,
            handle: native.handle,
        }
    }
}

/// An endpoint as seen by consumers: either a real enumerated device or the
/// virtual stand-in returned whenever resolution fails.
#[derive(Debug, Clone)]
pub enum AudioDevice {
    Real(Arc<DeviceInfo>),
    Virtual,
}

impl AudioDevice {
    pub fn id(&self) -> &str {
        match self {
            Self::Real(info) => &info.id,
            Self::Virtual => "",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Real(info) => &info.name,
            Self::Virtual => "",
        }
    }

    pub fn state(&self) -> DeviceState {
        match self {
            Self::Real(info) => info.state,
            Self::Virtual => DeviceState::empty(),
        }
    }

    pub fn flow(&self) -> Option<DataFlow> {
        match self {
            Self::Real(info) => Some(info.flow),
            Self::Virtual => None,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual)
    }

    pub fn is_active(&self) -> bool {
        self.state().is_active()
    }

    pub fn info(&self) -> Option<&Arc<DeviceInfo>> {
        match self {
            Self::Real(info) => Some(info),
            Self::Virtual => None,
        }
    }
}

impl Default for AudioDevice {
    fn default() -> Self {
        Self::Virtual
    }
}

impl PartialEq for AudioDevice {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Virtual, Self::Virtual) => true,
            (Self::Real(a), Self::Real(b)) => a.id == b.id,
            _ => false,
        }
    }
}

impl Eq for AudioDevice {}

/// A session as seen by consumers; `Virtual` when there is none.
#[derive(Debug, Clone)]
pub enum AudioSession {
    Real(Arc<SessionInfo>),
    Virtual,
}

impl AudioSession {
    /// Process id, or `VIRTUAL_PID` for the virtual session.
    pub fn pid(&self) -> i64 {
        match self {
            Self::Real(info) => i64::from(info.pid),
            Self::Virtual => VIRTUAL_PID,
        }
    }

    pub fn process_name(&self) -> &str {
        match self {
            Self::Real(info) => &info.process_name,
            Self::Virtual => "",
        }
    }

    pub fn instance_id(&self) -> &str {
        match self {
            Self::Real(info) => &info.instance_id,
            Self::Virtual => "",
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            Self::Real(info) => &info.device_id,
            Self::Virtual => "",
        }
    }

    pub fn volume(&self) -> f32 {
        match self {
            Self::Real(info) => info.volume,
            Self::Virtual => 0.0,
        }
    }

    pub fn is_muted(&self) -> bool {
        match self {
            Self::Real(info) => info.muted,
            Self::Virtual => false,
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Self::Virtual)
    }

    pub fn info(&self) -> Option<&Arc<SessionInfo>> {
        match self {
            Self::Real(info) => Some(info),
            Self::Virtual => None,
        }
    }

    /// Identity of this session, detached from the object itself.
    pub fn target_info(&self) -> TargetInfo {
        TargetInfo {
            pid: self.pid(),
            session_instance_id: self.instance_id().to_string(),
        }
    }
}

impl Default for AudioSession {
    fn default() -> Self {
        Self::Virtual
    }
}

impl PartialEq for AudioSession {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Virtual, Self::Virtual) => true,
            (Self::Real(a), Self::Real(b)) => {
                a.pid == b.pid && a.instance_id == b.instance_id && a.device_id == b.device_id
            }
            _ => false,
        }
    }
}

impl Eq for AudioSession {}
