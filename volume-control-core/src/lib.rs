//! # volume-control-core
//!
//! Platform-agnostic core of a hotkey-driven volume control utility.
//!
//! Keeps a live view of the system's audio endpoints and per-process
//! sessions, resolves hotkey presses into named actions applied to the
//! selected target, and exposes both through a plugin-facing API. Platform
//! backends (Windows Core Audio) implement the `NativeAudioGateway` trait.
//!
//! ## Architecture
//!
//! ```text
//! volume-control-core (this crate)
//! ├── traits/     ← NativeAudioGateway, ActionProvider, AudioDelegate
//! ├── models/     ← ControlError, DeviceState, AudioDevice/AudioSession, TargetInfo, config
//! ├── gateway/    ← BoundedGateway (time-bounded calls), MockGateway
//! ├── registry/   ← AudioRegistry (devices + lazily enumerated sessions)
//! ├── selection/  ← TargetSelector
//! ├── actions/    ← ActionRegistry, built-in actions
//! ├── hotkeys/    ← HotkeyManager
//! ├── runtime/    ← RefreshWorker
//! ├── sdk/        ← VolumeControlApi + process-wide instance
//! └── storage/    ← JSON snapshots (selection, hotkeys, configuration)
//! ```

pub mod actions;
pub mod gateway;
pub mod hotkeys;
pub mod models;
pub mod registry;
pub mod runtime;
pub mod sdk;
pub mod selection;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use actions::{ActionBinding, ActionContext, ActionHandler, ActionOutcome, ActionRegistry, BuiltinActions, VolumeStepSettings};
pub use gateway::{BoundedGateway, MockGateway};
pub use hotkeys::HotkeyManager;
pub use models::audio_models::{AudioDevice, AudioSession, DataFlow, DeviceInfo, SessionInfo, VIRTUAL_PID};
pub use models::config::ControlConfiguration;
pub use models::device_state::DeviceState;
pub use models::error::ControlError;
pub use models::event::{DeviceEvent, DeviceEventCallback};
pub use models::hotkey::{ActionSettings, HotkeyBinding, HotkeyId, HotkeyPressed};
pub use models::target::{Selection, SelectionSnapshot, Subject, TargetInfo};
pub use registry::{AudioRegistry, RefreshSummary};
pub use runtime::RefreshWorker;
pub use sdk::VolumeControlApi;
pub use selection::TargetSelector;
pub use traits::action_provider::ActionProvider;
pub use traits::audio_delegate::{AudioDelegate, DelegateSlot};
pub use traits::native_gateway::{
    FailureClass, NativeAudioGateway, NativeDevice, NativeHandle, NativeResult, NativeSession, NativeStatus,
};
