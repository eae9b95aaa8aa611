//! Endpoint notifications through `IMMNotificationClient`.
//!
//! The client is registered from a dedicated thread that owns its COM
//! apartment for as long as the notifier runs. Events are forwarded to a
//! `DeviceEventCallback`, typically `RefreshWorker::event_callback()`.

use std::sync::mpsc;
use std::thread;

use parking_lot::Mutex;
use windows::core::{implement, PCWSTR};
use windows::Win32::Foundation::E_FAIL;
use windows::Win32::Media::Audio::{
    eCapture, eMultimedia, ERole, EDataFlow, IMMDeviceEnumerator, IMMNotificationClient, IMMNotificationClient_Impl,
    MMDeviceEnumerator, DEVICE_STATE,
};
use windows::Win32::System::Com::{CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_MULTITHREADED};
use windows::Win32::Foundation::PROPERTYKEY;
// The implement macro expands to paths under windows_core.
#[allow(unused_imports)]
use windows_core;

use volume_control_core::models::audio_models::DataFlow;
use volume_control_core::models::device_state::DeviceState;
use volume_control_core::models::event::{DeviceEvent, DeviceEventCallback};

#[implement(IMMNotificationClient)]
struct NotificationClient {
    callback: DeviceEventCallback,
}

impl NotificationClient {
    fn emit(&self, event: DeviceEvent) {
        (self.callback)(event);
    }
}

unsafe fn device_id(id: &PCWSTR) -> Option<String> {
    if id.is_null() {
        None
    } else {
        id.to_string().ok()
    }
}

impl IMMNotificationClient_Impl for NotificationClient_Impl {
    fn OnDeviceStateChanged(&self, pwstrdeviceid: &PCWSTR, dwnewstate: DEVICE_STATE) -> windows::core::Result<()> {
        if let Some(device_id) = unsafe { device_id(pwstrdeviceid) } {
            self.emit(DeviceEvent::DeviceStateChanged {
                device_id,
                new_state: DeviceState::from_bits(dwnewstate.0),
            });
        }
        Ok(())
    }

    fn OnDeviceAdded(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        if let Some(device_id) = unsafe { device_id(pwstrdeviceid) } {
            self.emit(DeviceEvent::DeviceAdded { device_id });
        }
        Ok(())
    }

    fn OnDeviceRemoved(&self, pwstrdeviceid: &PCWSTR) -> windows::core::Result<()> {
        if let Some(device_id) = unsafe { device_id(pwstrdeviceid) } {
            self.emit(DeviceEvent::DeviceRemoved { device_id });
        }
        Ok(())
    }

    fn OnDefaultDeviceChanged(
        &self,
        flow: EDataFlow,
        role: ERole,
        pwstrdefaultdeviceid: &PCWSTR,
    ) -> windows::core::Result<()> {
        // One event per flow is enough; console and communications roles repeat it.
        if role != eMultimedia {
            return Ok(());
        }
        let flow = if flow == eCapture { DataFlow::Capture } else { DataFlow::Render };
        self.emit(DeviceEvent::DefaultDeviceChanged {
            flow,
            device_id: unsafe { device_id(pwstrdefaultdeviceid) },
        });
        Ok(())
    }

    fn OnPropertyValueChanged(&self, _pwstrdeviceid: &PCWSTR, _key: &PROPERTYKEY) -> windows::core::Result<()> {
        Ok(())
    }
}

/// Running registration of an `IMMNotificationClient`.
///
/// Dropping the notifier unregisters the client and joins its thread.
pub struct DeviceNotifier {
    stop: Mutex<Option<mpsc::Sender<()>>>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl DeviceNotifier {
    /// Register for endpoint notifications and forward them to `callback`.
    pub fn start(callback: DeviceEventCallback) -> windows::core::Result<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<windows::core::Result<()>>();

        let handle = thread::Builder::new()
            .name("audio-notifications".into())
            .spawn(move || unsafe {
                if let Err(e) = CoInitializeEx(None, COINIT_MULTITHREADED).ok() {
                    let _ = ready_tx.send(Err(e));
                    return;
                }

                let registered = (|| -> windows::core::Result<(IMMDeviceEnumerator, IMMNotificationClient)> {
                    let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)?;
                    let client: IMMNotificationClient = NotificationClient { callback }.into();
                    enumerator.RegisterEndpointNotificationCallback(&client)?;
                    Ok((enumerator, client))
                })();

                match registered {
                    Ok((enumerator, client)) => {
                        let _ = ready_tx.send(Ok(()));
                        // Blocks until stop() or the notifier is dropped.
                        let _ = stop_rx.recv();
                        if let Err(e) = enumerator.UnregisterEndpointNotificationCallback(&client) {
                            log::warn!("Failed to unregister endpoint notifications: {}", e);
                        }
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
                CoUninitialize();
            })
            .map_err(|e| {
                log::error!("Failed to spawn notification thread: {}", e);
                windows::core::Error::from(E_FAIL)
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!("Endpoint notifications registered");
                Ok(Self {
                    stop: Mutex::new(Some(stop_tx)),
                    handle: Mutex::new(Some(handle)),
                })
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(windows::core::Error::from(E_FAIL))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Unregister and wait for the notification thread to exit.
    pub fn stop(&self) {
        drop(self.stop.lock().take());
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
            log::info!("Endpoint notifications stopped");
        }
    }
}

impl Drop for DeviceNotifier {
    fn drop(&mut self) {
        self.stop();
    }
}
