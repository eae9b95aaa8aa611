//! # volume-control-windows
//!
//! Windows Core Audio backend for volume-control-core.
//!
//! Provides:
//! - `WasapiGateway`: endpoint and session enumeration, volume and mute via
//!   MMDevice, `IAudioSessionManager2`, `ISimpleAudioVolume` and
//!   `IAudioEndpointVolume`
//! - `DeviceNotifier`: `IMMNotificationClient` events forwarded as `DeviceEvent`s
//! - `process`: PID to executable name lookup
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use volume_control_core::{sdk, ControlConfiguration};
//! use volume_control_windows::{DeviceNotifier, WasapiGateway};
//!
//! let api = sdk::initialize(Arc::new(WasapiGateway::new()), ControlConfiguration::default())?;
//! let notifier = DeviceNotifier::start(api.start_background_refresh()?)?;
//! api.bind_hotkey(HotkeyBinding::new(1, "Volume Up"));
//! // from the keyboard hook:
//! api.dispatch_hotkey(1);
//! ```

#[cfg(target_os = "windows")]
pub mod gateway;
#[cfg(target_os = "windows")]
pub mod notifications;
#[cfg(target_os = "windows")]
pub mod process;

#[cfg(target_os = "windows")]
pub use gateway::WasapiGateway;
#[cfg(target_os = "windows")]
pub use notifications::DeviceNotifier;
