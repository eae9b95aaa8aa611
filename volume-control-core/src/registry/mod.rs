//! Live view of the system's audio endpoints and their sessions.
//!
//! ```text
//! [NativeAudioGateway] → enumerate → diff by id → commit (single write)
//!                                                   ↓
//!                     readers ← cloned snapshots ← RegistryState
//! ```
//!
//! Every mutation is serialized by the `writer` mutex; readers only take the
//! `RwLock` briefly to clone what they need. Native failures never touch the
//! committed state.

mod diff;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

pub use diff::RefreshSummary;

use crate::models::audio_models::{AudioDevice, AudioSession, DataFlow, DeviceInfo, SessionInfo};
use crate::models::device_state::DeviceState;
use crate::models::error::ControlError;
use crate::models::event::DeviceEvent;
use crate::models::target::TargetInfo;
use crate::traits::audio_delegate::DelegateSlot;
use crate::traits::native_gateway::NativeAudioGateway;

#[derive(Debug, Default)]
struct RegistryState {
    devices: Vec<Arc<DeviceInfo>>,
    /// Lazily populated per endpoint; absent means "not enumerated yet".
    sessions: HashMap<String, Vec<Arc<SessionInfo>>>,
    generation: u64,
}

/// Authoritative in-memory list of endpoints and sessions.
pub struct AudioRegistry {
    gateway: Arc<dyn NativeAudioGateway>,
    state_mask: DeviceState,
    state: RwLock<RegistryState>,
    writer: Mutex<()>,
    delegates: DelegateSlot,
}

impl AudioRegistry {
    /// Create an empty registry. Call [`refresh`](Self::refresh) to populate it.
    pub fn new(gateway: Arc<dyn NativeAudioGateway>, state_mask: DeviceState) -> Self {
        Self {
            gateway,
            state_mask,
            state: RwLock::new(RegistryState::default()),
            writer: Mutex::new(()),
            delegates: DelegateSlot::default(),
        }
    }

    pub fn delegate(&self) -> &DelegateSlot {
        &self.delegates
    }

    pub fn state_mask(&self) -> DeviceState {
        self.state_mask
    }

    /// Incremented on every committed change; unchanged by failed refreshes.
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    // --- Refresh ---

    /// Re-enumerate endpoints and commit the difference.
    ///
    /// Survivors that did not change keep their identity; changed survivors
    /// are replaced in place; vanished endpoints are dropped together with
    /// their cached sessions. On native failure the registry is untouched.
    pub fn refresh(&self) -> Result<RefreshSummary, ControlError> {
        let summary = {
            let _writer = self.writer.lock();

            let native = self.gateway.enumerate_devices(self.state_mask).map_err(|status| {
                log::warn!("Endpoint enumeration failed: {}", status);
                ControlError::RefreshFailed(format!("endpoint enumeration returned {}", status))
            })?;

            let current = self.state.read().devices.clone();
            let (devices, summary) = diff::diff_devices(&current, native);

            let mut state = self.state.write();
            for id in summary.removed.iter().chain(summary.changed.iter()) {
                state.sessions.remove(id);
            }
            state.devices = devices;
            state.generation += 1;
            summary
        };

        if !summary.is_empty() {
            log::debug!(
                "Endpoints refreshed: +{:?} -{:?} ~{:?}",
                summary.added,
                summary.removed,
                summary.changed
            );
        }
        self.delegates.notify(|d| d.on_refreshed(&summary));
        Ok(summary)
    }

    /// Re-enumerate the sessions of one endpoint.
    pub fn refresh_sessions(&self, device_id: &str) -> Result<Vec<AudioSession>, ControlError> {
        let _writer = self.writer.lock();

        let (handle, current) = {
            let state = self.state.read();
            let device = state
                .devices
                .iter()
                .find(|d| d.id == device_id)
                .ok_or_else(|| ControlError::DeviceUnavailable(device_id.to_string()))?;
            let current = state.sessions.get(device_id).cloned().unwrap_or_default();
            (device.handle.clone(), current)
        };

        let native = self.gateway.sessions_for_device(&handle).map_err(|status| {
            log::warn!("Session enumeration failed for {}: {}", device_id, status);
            status.into_control_error(device_id)
        })?;

        let sessions = diff::diff_sessions(device_id, &current, native);
        let mut state = self.state.write();
        state.sessions.insert(device_id.to_string(), sessions.clone());
        state.generation += 1;

        Ok(sessions.into_iter().map(AudioSession::Real).collect())
    }

    /// Refresh endpoints, then every session list that has been populated.
    pub fn refresh_all(&self) -> Result<RefreshSummary, ControlError> {
        let summary = self.refresh()?;
        let cached: Vec<String> = self.state.read().sessions.keys().cloned().collect();
        for device_id in cached {
            if let Err(e) = self.refresh_sessions(&device_id) {
                log::debug!("Keeping stale sessions for {}: {}", device_id, e);
            }
        }
        Ok(summary)
    }

    /// React to an operating system notification.
    pub fn apply_event(&self, event: &DeviceEvent) -> Result<(), ControlError> {
        log::debug!("Audio event: {:?}", event);
        match event {
            DeviceEvent::SessionsChanged { device_id } => {
                self.refresh_sessions(device_id).map(|_| ())
            }
            _ => self.refresh().map(|_| ()),
        }
    }

    // --- Lookup ---

    /// Snapshot of the endpoints in enumeration order.
    pub fn devices(&self) -> Vec<AudioDevice> {
        self.state
            .read()
            .devices
            .iter()
            .cloned()
            .map(AudioDevice::Real)
            .collect()
    }

    pub fn find_device_by_id(&self, id: &str) -> AudioDevice {
        self.state
            .read()
            .devices
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .map(AudioDevice::Real)
            .unwrap_or_default()
    }

    /// The system default render endpoint, falling back to the first active
    /// render endpoint, then to any active endpoint.
    pub fn default_device(&self) -> AudioDevice {
        match self.gateway.default_device_id(DataFlow::Render) {
            Ok(Some(id)) => {
                let device = self.find_device_by_id(&id);
                if !device.is_virtual() {
                    return device;
                }
            }
            Ok(None) => {}
            Err(status) => log::debug!("Default endpoint lookup failed: {}", status),
        }

        let state = self.state.read();
        state
            .devices
            .iter()
            .find(|d| d.state.is_active() && d.flow == DataFlow::Render)
            .or_else(|| state.devices.iter().find(|d| d.state.is_active()))
            .cloned()
            .map(AudioDevice::Real)
            .unwrap_or_default()
    }

    /// Sessions of an endpoint, enumerating them on first use.
    ///
    /// The virtual device and endpoints whose sessions cannot be enumerated
    /// yield an empty list.
    pub fn sessions(&self, device_id: &str) -> Vec<AudioSession> {
        let cached = self.state.read().sessions.get(device_id).cloned();
        if let Some(cached) = cached {
            return cached.into_iter().map(AudioSession::Real).collect();
        }
        match self.refresh_sessions(device_id) {
            Ok(sessions) => sessions,
            Err(e) => {
                log::debug!("No sessions for {}: {}", device_id, e);
                Vec::new()
            }
        }
    }

    pub fn sessions_of(&self, device: &AudioDevice) -> Vec<AudioSession> {
        if device.is_virtual() {
            return Vec::new();
        }
        self.sessions(device.id())
    }

    /// Sessions of every active endpoint, in endpoint then session order.
    pub fn all_sessions(&self) -> Vec<AudioSession> {
        self.devices()
            .iter()
            .filter(|d| d.is_active())
            .flat_map(|d| self.sessions_of(d))
            .collect()
    }

    /// Case-insensitive process name lookup; a trailing `.exe` is ignored.
    ///
    /// When several processes share the name the first in enumeration order
    /// wins.
    pub fn find_session_by_process_name(&self, name: &str) -> AudioSession {
        let wanted = normalize_process_name(name);
        self.all_sessions()
            .into_iter()
            .find(|s| normalize_process_name(s.process_name()) == wanted)
            .unwrap_or_default()
    }

    /// Resolve a persisted target: instance identifier first, then PID.
    pub fn find_session(&self, target: &TargetInfo) -> AudioSession {
        if target.is_virtual() {
            return AudioSession::Virtual;
        }
        let sessions = self.all_sessions();
        if !target.session_instance_id.is_empty() {
            if let Some(s) = sessions
                .iter()
                .find(|s| s.instance_id() == target.session_instance_id)
            {
                return s.clone();
            }
        }
        if target.pid >= 0 {
            if let Some(s) = sessions.iter().find(|s| s.pid() == target.pid) {
                return s.clone();
            }
        }
        AudioSession::Virtual
    }

    /// The endpoint a session belongs to, as currently enumerated.
    pub fn device_of(&self, session: &AudioSession) -> AudioDevice {
        self.find_device_by_id(session.device_id())
    }

    // --- Session write-back ---

    pub fn set_session_volume(&self, session: &AudioSession, level: f32) -> Result<(), ControlError> {
        let Some(info) = session.info() else {
            log::debug!("Ignoring volume change on virtual session");
            return Ok(());
        };
        let level = level.clamp(0.0, 1.0);
        self.gateway
            .set_volume(&info.handle, level)
            .map_err(|s| s.into_control_error(&info.process_name))?;
        self.update_session(info, |s| s.volume = level);
        Ok(())
    }

    /// Add `delta` to the session's live volume and return the new level.
    pub fn adjust_session_volume(&self, session: &AudioSession, delta: f32) -> Result<f32, ControlError> {
        let Some(info) = session.info() else {
            return Ok(0.0);
        };
        let current = self
            .gateway
            .get_volume(&info.handle)
            .map_err(|s| s.into_control_error(&info.process_name))?;
        let level = (current + delta).clamp(0.0, 1.0);
        self.set_session_volume(session, level)?;
        Ok(level)
    }

    pub fn set_session_mute(&self, session: &AudioSession, muted: bool) -> Result<(), ControlError> {
        let Some(info) = session.info() else {
            log::debug!("Ignoring mute change on virtual session");
            return Ok(());
        };
        self.gateway
            .set_mute(&info.handle, muted)
            .map_err(|s| s.into_control_error(&info.process_name))?;
        self.update_session(info, |s| s.muted = muted);
        Ok(())
    }

    /// Flip the session's live mute state and return the new value.
    pub fn toggle_session_mute(&self, session: &AudioSession) -> Result<bool, ControlError> {
        let Some(info) = session.info() else {
            return Ok(false);
        };
        let muted = !self
            .gateway
            .get_mute(&info.handle)
            .map_err(|s| s.into_control_error(&info.process_name))?;
        self.set_session_mute(session, muted)?;
        Ok(muted)
    }

    // --- Endpoint write-back ---

    pub fn device_volume(&self, device: &AudioDevice) -> Result<f32, ControlError> {
        match device.info() {
            Some(info) => self
                .gateway
                .get_volume(&info.handle)
                .map_err(|s| s.into_control_error(&info.id)),
            None => Ok(0.0),
        }
    }

    pub fn device_muted(&self, device: &AudioDevice) -> Result<bool, ControlError> {
        match device.info() {
            Some(info) => self
                .gateway
                .get_mute(&info.handle)
                .map_err(|s| s.into_control_error(&info.id)),
            None => Ok(false),
        }
    }

    pub fn set_device_volume(&self, device: &AudioDevice, level: f32) -> Result<(), ControlError> {
        let Some(info) = device.info() else {
            log::debug!("Ignoring volume change on virtual device");
            return Ok(());
        };
        self.gateway
            .set_volume(&info.handle, level.clamp(0.0, 1.0))
            .map_err(|s| s.into_control_error(&info.id))
    }

    pub fn adjust_device_volume(&self, device: &AudioDevice, delta: f32) -> Result<f32, ControlError> {
        if device.is_virtual() {
            return Ok(0.0);
        }
        let level = (self.device_volume(device)? + delta).clamp(0.0, 1.0);
        self.set_device_volume(device, level)?;
        Ok(level)
    }

    pub fn set_device_mute(&self, device: &AudioDevice, muted: bool) -> Result<(), ControlError> {
        let Some(info) = device.info() else {
            log::debug!("Ignoring mute change on virtual device");
            return Ok(());
        };
        self.gateway
            .set_mute(&info.handle, muted)
            .map_err(|s| s.into_control_error(&info.id))
    }

    pub fn toggle_device_mute(&self, device: &AudioDevice) -> Result<bool, ControlError> {
        if device.is_virtual() {
            return Ok(false);
        }
        let muted = !self.device_muted(device)?;
        self.set_device_mute(device, muted)?;
        Ok(muted)
    }

    /// Replace the cached snapshot of a session after a successful write.
    fn update_session(&self, info: &SessionInfo, apply: impl FnOnce(&mut SessionInfo)) {
        let _writer = self.writer.lock();
        let mut state = self.state.write();
        let Some(list) = state.sessions.get_mut(&info.device_id) else {
            return;
        };
        if let Some(entry) = list.iter_mut().find(|s| s.instance_id == info.instance_id) {
            let mut updated = (**entry).clone();
            apply(&mut updated);
            *entry = Arc::new(updated);
            state.generation += 1;
        }
    }
}

fn normalize_process_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    match lower.strip_suffix(".exe") {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}
