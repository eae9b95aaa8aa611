//! `NativeAudioGateway` over the Windows Core Audio APIs.
//!
//! Each call initializes COM on the calling thread (MTA) and resolves the
//! handle by identifier, so the gateway is `Send + Sync` and works from the
//! short-lived threads `BoundedGateway` uses. Endpoints go through
//! `IMMDeviceEnumerator`/`IAudioEndpointVolume`; sessions through
//! `IAudioSessionManager2`/`ISimpleAudioVolume`.

use windows::core::{Interface, GUID, HSTRING, PWSTR};
use windows::Win32::Devices::FunctionDiscovery::PKEY_Device_FriendlyName;
use windows::Win32::Foundation::{ERROR_NOT_FOUND, RPC_E_CHANGED_MODE};
use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
use windows::Win32::Media::Audio::{
    eAll, eCapture, eMultimedia, eRender, EDataFlow, IAudioSessionControl2, IAudioSessionManager2, IMMDevice,
    IMMDeviceEnumerator, IMMEndpoint, ISimpleAudioVolume, MMDeviceEnumerator, DEVICE_STATE,
};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CoTaskMemFree, CoUninitialize, CLSCTX_ALL, COINIT_MULTITHREADED, STGM_READ,
};

use volume_control_core::models::audio_models::DataFlow;
use volume_control_core::models::device_state::DeviceState;
use volume_control_core::traits::native_gateway::{
    FailureClass, NativeAudioGateway, NativeDevice, NativeHandle, NativeResult, NativeSession, NativeStatus,
};

use crate::process;

/// Event context passed with every write, so session and endpoint
/// notifications caused by this process can be told apart.
pub const EVENT_CONTEXT: GUID = GUID::from_u128(0x5f1c_9a4e_7d2b_4c8e_a0b3_6e91_d4f2_c7a8);

/// Name shown for the session of PID 0.
const SYSTEM_SOUNDS: &str = "System Sounds";

fn status(e: windows::core::Error) -> NativeStatus {
    NativeStatus(e.code().0)
}

/// Keeps COM initialized on the current thread for the guard's lifetime.
struct ComApartment {
    owned: bool,
}

impl ComApartment {
    fn enter() -> NativeResult<Self> {
        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        if hr.is_ok() {
            Ok(Self { owned: true })
        } else if hr == RPC_E_CHANGED_MODE {
            // Thread already joined an STA; COM is usable, just not ours to tear down.
            Ok(Self { owned: false })
        } else {
            Err(NativeStatus(hr.0))
        }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.owned {
            unsafe { CoUninitialize() };
        }
    }
}

/// Copy and free a COM-allocated wide string.
unsafe fn take_pwstr(value: PWSTR) -> String {
    let text = value.to_string().unwrap_or_default();
    CoTaskMemFree(Some(value.0 as *const _));
    text
}

fn to_flow(flow: DataFlow) -> EDataFlow {
    match flow {
        DataFlow::Render => eRender,
        DataFlow::Capture => eCapture,
    }
}

/// Stateless Windows gateway. Cheap to construct; holds no COM objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct WasapiGateway;

impl WasapiGateway {
    pub fn new() -> Self {
        Self
    }

    fn enumerator() -> NativeResult<IMMDeviceEnumerator> {
        unsafe { CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(status) }
    }

    fn device(enumerator: &IMMDeviceEnumerator, device_id: &str) -> NativeResult<IMMDevice> {
        unsafe { enumerator.GetDevice(&HSTRING::from(device_id)).map_err(status) }
    }

    fn describe(device: &IMMDevice) -> NativeResult<NativeDevice> {
        unsafe {
            let id = take_pwstr(device.GetId().map_err(status)?);
            let state = device.GetState().map_err(status)?;
            let flow = match device.cast::<IMMEndpoint>().and_then(|e| e.GetDataFlow()) {
                Ok(f) if f == eCapture => DataFlow::Capture,
                _ => DataFlow::Render,
            };
            let mut state = DeviceState::from_bits(state.0);
            let name = match device
                .OpenPropertyStore(STGM_READ)
                .and_then(|store| store.GetValue(&PKEY_Device_FriendlyName))
            {
                Ok(value) => value.to_string(),
                Err(e) => {
                    if status(e).class() == FailureClass::AccessDenied {
                        state |= DeviceState::ACCESS_ERROR;
                    }
                    String::new()
                }
            };
            let name = if name.is_empty() { id.clone() } else { name };

            Ok(NativeDevice {
                handle: NativeHandle::endpoint(&id),
                id,
                name,
                state,
                flow,
            })
        }
    }

    fn endpoint_volume(device_id: &str) -> NativeResult<IAudioEndpointVolume> {
        let enumerator = Self::enumerator()?;
        let device = Self::device(&enumerator, device_id)?;
        unsafe { device.Activate(CLSCTX_ALL, None).map_err(status) }
    }

    fn session_controls(device_id: &str) -> NativeResult<Vec<IAudioSessionControl2>> {
        let enumerator = Self::enumerator()?;
        let device = Self::device(&enumerator, device_id)?;
        unsafe {
            let manager: IAudioSessionManager2 = device.Activate(CLSCTX_ALL, None).map_err(status)?;
            let sessions = manager.GetSessionEnumerator().map_err(status)?;
            let count = sessions.GetCount().map_err(status)?;
            let mut controls = Vec::with_capacity(count.max(0) as usize);
            for i in 0..count {
                match sessions.GetSession(i).and_then(|s| s.cast::<IAudioSessionControl2>()) {
                    Ok(control) => controls.push(control),
                    Err(e) => log::debug!("Skipping session {} on {}: {}", i, device_id, e),
                }
            }
            Ok(controls)
        }
    }

    fn session_volume(device_id: &str, instance_id: &str) -> NativeResult<ISimpleAudioVolume> {
        for control in Self::session_controls(device_id)? {
            let id = unsafe { control.GetSessionInstanceIdentifier().map(|p| take_pwstr(p)) };
            if matches!(id, Ok(ref id) if id == instance_id) {
                return control.cast::<ISimpleAudioVolume>().map_err(status);
            }
        }
        Err(NativeStatus::NOT_FOUND)
    }

    fn describe_session(device_id: &str, control: &IAudioSessionControl2) -> NativeResult<NativeSession> {
        unsafe {
            let instance_id = take_pwstr(control.GetSessionInstanceIdentifier().map_err(status)?);
            let pid = control.GetProcessId().map_err(status)?;
            let volume = control.cast::<ISimpleAudioVolume>().map_err(status)?;
            let process_name = if pid == 0 {
                SYSTEM_SOUNDS.to_string()
            } else {
                process::process_name(pid).unwrap_or_else(|| format!("Process {}", pid))
            };

            Ok(NativeSession {
                handle: NativeHandle::session(device_id, &instance_id),
                pid,
                process_name,
                instance_id,
                volume: volume.GetMasterVolume().map_err(status)?,
                muted: volume.GetMute().map_err(status)?.as_bool(),
            })
        }
    }
}

impl NativeAudioGateway for WasapiGateway {
    fn enumerate_devices(&self, state_mask: DeviceState) -> NativeResult<Vec<NativeDevice>> {
        let _com = ComApartment::enter()?;
        let enumerator = Self::enumerator()?;
        unsafe {
            let collection = enumerator
                .EnumAudioEndpoints(eAll, DEVICE_STATE(state_mask.bits()))
                .map_err(status)?;
            let count = collection.GetCount().map_err(status)?;

            let mut devices = Vec::with_capacity(count as usize);
            for i in 0..count {
                let described = collection.Item(i).map_err(status).and_then(|d| Self::describe(&d));
                match described {
                    Ok(device) => devices.push(device),
                    Err(e) => log::debug!("Skipping endpoint {}: {}", i, e),
                }
            }
            Ok(devices)
        }
    }

    fn sessions_for_device(&self, device: &NativeHandle) -> NativeResult<Vec<NativeSession>> {
        let _com = ComApartment::enter()?;
        let device_id = device.device_id();
        let controls = Self::session_controls(device_id)?;
        Ok(controls
            .iter()
            .filter_map(|control| match Self::describe_session(device_id, control) {
                Ok(session) => Some(session),
                Err(e) => {
                    log::debug!("Skipping session on {}: {}", device_id, e);
                    None
                }
            })
            .collect())
    }

    fn get_volume(&self, handle: &NativeHandle) -> NativeResult<f32> {
        let _com = ComApartment::enter()?;
        unsafe {
            match handle {
                NativeHandle::Endpoint { device_id } => {
                    Self::endpoint_volume(device_id)?.GetMasterVolumeLevelScalar().map_err(status)
                }
                NativeHandle::Session { device_id, instance_id } => {
                    Self::session_volume(device_id, instance_id)?.GetMasterVolume().map_err(status)
                }
            }
        }
    }

    fn set_volume(&self, handle: &NativeHandle, level: f32) -> NativeResult<()> {
        let _com = ComApartment::enter()?;
        let level = level.clamp(0.0, 1.0);
        unsafe {
            match handle {
                NativeHandle::Endpoint { device_id } => Self::endpoint_volume(device_id)?
                    .SetMasterVolumeLevelScalar(level, &EVENT_CONTEXT)
                    .map_err(status),
                NativeHandle::Session { device_id, instance_id } => Self::session_volume(device_id, instance_id)?
                    .SetMasterVolume(level, &EVENT_CONTEXT)
                    .map_err(status),
            }
        }
    }

    fn get_mute(&self, handle: &NativeHandle) -> NativeResult<bool> {
        let _com = ComApartment::enter()?;
        unsafe {
            let muted = match handle {
                NativeHandle::Endpoint { device_id } => Self::endpoint_volume(device_id)?.GetMute(),
                NativeHandle::Session { device_id, instance_id } => {
                    Self::session_volume(device_id, instance_id)?.GetMute()
                }
            };
            muted.map(|m| m.as_bool()).map_err(status)
        }
    }

    fn set_mute(&self, handle: &NativeHandle, muted: bool) -> NativeResult<()> {
        let _com = ComApartment::enter()?;
        unsafe {
            match handle {
                NativeHandle::Endpoint { device_id } => Self::endpoint_volume(device_id)?
                    .SetMute(muted, &EVENT_CONTEXT)
                    .map_err(status),
                NativeHandle::Session { device_id, instance_id } => Self::session_volume(device_id, instance_id)?
                    .SetMute(muted, &EVENT_CONTEXT)
                    .map_err(status),
            }
        }
    }

    fn default_device_id(&self, flow: DataFlow) -> NativeResult<Option<String>> {
        let _com = ComApartment::enter()?;
        let enumerator = Self::enumerator()?;
        unsafe {
            match enumerator.GetDefaultAudioEndpoint(to_flow(flow), eMultimedia) {
                Ok(device) => Ok(Some(take_pwstr(device.GetId().map_err(status)?))),
                Err(e) if e.code() == ERROR_NOT_FOUND.to_hresult() => Ok(None),
                Err(e) => Err(status(e)),
            }
        }
    }
}
