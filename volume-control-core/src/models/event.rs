use std::sync::Arc;

use super::audio_models::DataFlow;
use super::device_state::DeviceState;

/// Change notifications from the operating system's audio layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    DeviceAdded { device_id: String },
    DeviceRemoved { device_id: String },
    DeviceStateChanged { device_id: String, new_state: DeviceState },
    DefaultDeviceChanged { flow: DataFlow, device_id: Option<String> },
    /// A session was created or expired on the endpoint.
    SessionsChanged { device_id: String },
}

impl DeviceEvent {
    /// Whether the event affects the endpoint list (as opposed to one
    /// endpoint's session list).
    pub fn affects_devices(&self) -> bool {
        !matches!(self, Self::SessionsChanged { .. })
    }
}

/// Callback invoked by notification sources, possibly on an OS thread.
pub type DeviceEventCallback = Arc<dyn Fn(DeviceEvent) + Send + Sync + 'static>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_events_leave_the_endpoint_list_alone() {
        let sessions = DeviceEvent::SessionsChanged { device_id: "d1".into() };
        let removed = DeviceEvent::DeviceRemoved { device_id: "d1".into() };
        assert!(!sessions.affects_devices());
        assert!(removed.affects_devices());
    }
}
