use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::DataFlow;
use crate::models::device_state::DeviceState;
use crate::traits::native_gateway::{
    NativeAudioGateway, NativeDevice, NativeHandle, NativeResult, NativeSession, NativeStatus,
};

#[derive(Debug, Clone)]
struct MockSession {
    pid: u32,
    process_name: String,
    instance_id: String,
    volume: f32,
    muted: bool,
}

#[derive(Debug, Clone)]
struct MockDevice {
    id: String,
    name: String,
    state: DeviceState,
    flow: DataFlow,
    volume: f32,
    muted: bool,
    sessions: Vec<MockSession>,
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<MockDevice>,
    default_render: Option<String>,
    default_capture: Option<String>,
    enumeration_failure: Option<NativeStatus>,
    write_failure: Option<NativeStatus>,
    latency: Option<Duration>,
    enumerations: usize,
}

impl MockState {
    fn device(&self, id: &str) -> NativeResult<&MockDevice> {
        self.devices
            .iter()
            .find(|d| d.id == id)
            .ok_or(NativeStatus::NOT_FOUND)
    }

    fn device_mut(&mut self, id: &str) -> NativeResult<&mut MockDevice> {
        self.devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(NativeStatus::NOT_FOUND)
    }

    /// Resolve a handle to its (volume, muted) pair.
    fn levels_mut(&mut self, handle: &NativeHandle) -> NativeResult<(&mut f32, &mut bool)> {
        match handle {
            NativeHandle::Endpoint { device_id } => {
                let device = self.device_mut(device_id)?;
                Ok((&mut device.volume, &mut device.muted))
            }
            NativeHandle::Session {
                device_id,
                instance_id,
            } => {
                let device = self.device_mut(device_id)?;
                if !device.state.is_active() {
                    return Err(NativeStatus::INVALID_STATE);
                }
                let session = device
                    .sessions
                    .iter_mut()
                    .find(|s| &s.instance_id == instance_id)
                    .ok_or(NativeStatus::NOT_FOUND)?;
                Ok((&mut session.volume, &mut session.muted))
            }
        }
    }
}

/// Scriptable in-memory gateway.
///
/// Lets tests and demos add, unplug and replug endpoints, start and stop
/// sessions, and inject native failures or latency.
#[derive(Debug, Default)]
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a render endpoint at full volume.
    pub fn add_device(&self, id: &str, name: &str, state: DeviceState) {
        self.add_device_with_flow(id, name, DataFlow::Render, state);
    }

    pub fn add_device_with_flow(&self, id: &str, name: &str, flow: DataFlow, state: DeviceState) {
        let mut s = self.state.lock();
        s.devices.retain(|d| d.id != id);
        s.devices.push(MockDevice {
            id: id.to_string(),
            name: name.to_string(),
            state,
            flow,
            volume: 1.0,
            muted: false,
            sessions: Vec::new(),
        });
    }

    /// Remove an endpoint entirely, including its sessions.
    pub fn remove_device(&self, id: &str) {
        self.state.lock().devices.retain(|d| d.id != id);
    }

    pub fn set_device_state(&self, id: &str, state: DeviceState) {
        if let Ok(device) = self.state.lock().device_mut(id) {
            device.state = state;
        }
    }

    pub fn rename_device(&self, id: &str, name: &str) {
        if let Ok(device) = self.state.lock().device_mut(id) {
            device.name = name.to_string();
        }
    }

    pub fn set_default_device(&self, flow: DataFlow, id: Option<&str>) {
        let mut s = self.state.lock();
        let id = id.map(str::to_string);
        match flow {
            DataFlow::Render => s.default_render = id,
            DataFlow::Capture => s.default_capture = id,
        }
    }

    /// Start a session on an endpoint and return its instance identifier.
    pub fn add_session(&self, device_id: &str, pid: u32, process_name: &str) -> String {
        let instance_id = format!("{}|{}%b{}", device_id, process_name, pid);
        let mut s = self.state.lock();
        if let Ok(device) = s.device_mut(device_id) {
            device.sessions.push(MockSession {
                pid,
                process_name: process_name.to_string(),
                instance_id: instance_id.clone(),
                volume: 1.0,
                muted: false,
            });
        }
        instance_id
    }

    /// Expire every session of `pid` on an endpoint.
    pub fn remove_session(&self, device_id: &str, pid: u32) {
        if let Ok(device) = self.state.lock().device_mut(device_id) {
            device.sessions.retain(|s| s.pid != pid);
        }
    }

    /// Change a session's volume as if another application had done it.
    pub fn set_external_session_volume(&self, device_id: &str, pid: u32, volume: f32) {
        if let Ok(device) = self.state.lock().device_mut(device_id) {
            for session in device.sessions.iter_mut().filter(|s| s.pid == pid) {
                session.volume = volume;
            }
        }
    }

    /// Make every enumeration fail with `status` until cleared with `None`.
    pub fn fail_enumeration(&self, status: Option<NativeStatus>) {
        self.state.lock().enumeration_failure = status;
    }

    /// Make every volume/mute write fail with `status` until cleared with `None`.
    pub fn fail_writes(&self, status: Option<NativeStatus>) {
        self.state.lock().write_failure = status;
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.state.lock().latency = latency;
    }

    pub fn session_volume(&self, device_id: &str, pid: u32) -> Option<f32> {
        let s = self.state.lock();
        let device = s.device(device_id).ok()?;
        device.sessions.iter().find(|x| x.pid == pid).map(|x| x.volume)
    }

    pub fn session_muted(&self, device_id: &str, pid: u32) -> Option<bool> {
        let s = self.state.lock();
        let device = s.device(device_id).ok()?;
        device.sessions.iter().find(|x| x.pid == pid).map(|x| x.muted)
    }

    pub fn device_volume(&self, device_id: &str) -> Option<f32> {
        self.state.lock().device(device_id).ok().map(|d| d.volume)
    }

    pub fn device_muted(&self, device_id: &str) -> Option<bool> {
        self.state.lock().device(device_id).ok().map(|d| d.muted)
    }

    /// Number of `enumerate_devices` calls so far, including failed ones.
    pub fn enumeration_count(&self) -> usize {
        self.state.lock().enumerations
    }

    fn simulate_latency(&self) {
        let latency = self.state.lock().latency;
        if let Some(latency) = latency {
            thread::sleep(latency);
        }
    }

    fn check_writable(&self) -> NativeResult<()> {
        match self.state.lock().write_failure {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }
}

impl NativeAudioGateway for MockGateway {
    fn enumerate_devices(&self, state_mask: DeviceState) -> NativeResult<Vec<NativeDevice>> {
        self.simulate_latency();
        let mut s = self.state.lock();
        s.enumerations += 1;
        if let Some(status) = s.enumeration_failure {
            return Err(status);
        }
        Ok(s.devices
            .iter()
            .filter(|d| d.state.intersects(state_mask))
            .map(|d| NativeDevice {
                handle: NativeHandle::endpoint(&d.id),
                id: d.id.clone(),
                name: d.name.clone(),
                state: d.state,
                flow: d.flow,
            })
            .collect())
    }

    fn sessions_for_device(&self, device: &NativeHandle) -> NativeResult<Vec<NativeSession>> {
        self.simulate_latency();
        let s = self.state.lock();
        if let Some(status) = s.enumeration_failure {
            return Err(status);
        }
        let device = s.device(device.device_id())?;
        if !device.state.is_active() {
            return Err(NativeStatus::INVALID_STATE);
        }
        Ok(device
            .sessions
            .iter()
            .map(|x| NativeSession {
                handle: NativeHandle::session(&device.id, &x.instance_id),
                pid: x.pid,
                process_name: x.process_name.clone(),
                instance_id: x.instance_id.clone(),
                volume: x.volume,
                muted: x.muted,
            })
            .collect())
    }

    fn get_volume(&self, handle: &NativeHandle) -> NativeResult<f32> {
        self.simulate_latency();
        let mut s = self.state.lock();
        s.levels_mut(handle).map(|(volume, _)| *volume)
    }

    fn set_volume(&self, handle: &NativeHandle, level: f32) -> NativeResult<()> {
        self.simulate_latency();
        self.check_writable()?;
        let mut s = self.state.lock();
        let (volume, _) = s.levels_mut(handle)?;
        *volume = level.clamp(0.0, 1.0);
        Ok(())
    }

    fn get_mute(&self, handle: &NativeHandle) -> NativeResult<bool> {
        self.simulate_latency();
        let mut s = self.state.lock();
        s.levels_mut(handle).map(|(_, muted)| *muted)
    }

    fn set_mute(&self, handle: &NativeHandle, muted: bool) -> NativeResult<()> {
        self.simulate_latency();
        self.check_writable()?;
        let mut s = self.state.lock();
        let (_, current) = s.levels_mut(handle)?;
        *current = muted;
        Ok(())
    }

    fn default_device_id(&self, flow: DataFlow) -> NativeResult<Option<String>> {
        let s = self.state.lock();
        Ok(match flow {
            DataFlow::Render => s.default_render.clone(),
            DataFlow::Capture => s.default_capture.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumeration_honors_state_mask() {
        let gw = MockGateway::new();
        gw.add_device("a", "Speakers", DeviceState::ACTIVE);
        gw.add_device("b", "Headset", DeviceState::UNPLUGGED);

        let active = gw.enumerate_devices(DeviceState::ACTIVE).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "a");

        let all = gw.enumerate_devices(DeviceState::ALL).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(gw.enumeration_count(), 2);
    }

    #[test]
    fn sessions_on_inactive_device_are_invalid() {
        let gw = MockGateway::new();
        gw.add_device("a", "Speakers", DeviceState::DISABLED);
        gw.add_session("a", 10, "spotify.exe");

        assert_eq!(
            gw.sessions_for_device(&NativeHandle::endpoint("a")),
            Err(NativeStatus::INVALID_STATE)
        );
        assert_eq!(
            gw.sessions_for_device(&NativeHandle::endpoint("missing")),
            Err(NativeStatus::NOT_FOUND)
        );
    }

    #[test]
    fn writes_reach_the_session() {
        let gw = MockGateway::new();
        gw.add_device("a", "Speakers", DeviceState::ACTIVE);
        let inst = gw.add_session("a", 10, "spotify.exe");
        let handle = NativeHandle::session("a", &inst);

        gw.set_volume(&handle, 1.7).unwrap();
        gw.set_mute(&handle, true).unwrap();
        assert_eq!(gw.session_volume("a", 10), Some(1.0));
        assert_eq!(gw.session_muted("a", 10), Some(true));

        gw.remove_session("a", 10);
        assert_eq!(gw.get_volume(&handle), Err(NativeStatus::NOT_FOUND));
    }

    #[test]
    fn injected_failures() {
        let gw = MockGateway::new();
        gw.add_device("a", "Speakers", DeviceState::ACTIVE);
        gw.fail_enumeration(Some(NativeStatus::ACCESS_DENIED));
        assert_eq!(
            gw.enumerate_devices(DeviceState::ALL),
            Err(NativeStatus::ACCESS_DENIED)
        );
        gw.fail_enumeration(None);
        gw.fail_writes(Some(NativeStatus::INVALID_STATE));
        assert_eq!(
            gw.set_mute(&NativeHandle::endpoint("a"), true),
            Err(NativeStatus::INVALID_STATE)
        );
    }
}
