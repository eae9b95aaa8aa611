use std::sync::Arc;

use parking_lot::Mutex;

use crate::actions::{ActionBinding, ActionContext, ActionOutcome, ActionRegistry, BuiltinActions};
use crate::gateway::bounded::BoundedGateway;
use crate::hotkeys::HotkeyManager;
use crate::models::audio_models::{AudioDevice, AudioSession};
use crate::models::config::ControlConfiguration;
use crate::models::error::ControlError;
use crate::models::event::DeviceEventCallback;
use crate::models::hotkey::{ActionSettings, HotkeyBinding, HotkeyId, HotkeyPressed};
use crate::models::target::{Selection, SelectionSnapshot, Subject, TargetInfo};
use crate::registry::{AudioRegistry, RefreshSummary};
use crate::runtime::refresh_worker::RefreshWorker;
use crate::selection::TargetSelector;
use crate::traits::action_provider::ActionProvider;
use crate::traits::audio_delegate::AudioDelegate;
use crate::traits::native_gateway::NativeAudioGateway;

/// The surface hosts and plugins program against.
///
/// ```text
/// hotkey id → [HotkeyManager] → HotkeyPressed → [ActionRegistry] → handler
///                                                    ↓
///                               [TargetSelector] → [AudioRegistry] → gateway
/// ```
///
/// Only `AudioDevice`, `AudioSession` and `Selection` values cross this
/// boundary; native handles stay inside the registry.
pub struct VolumeControlApi {
    config: ControlConfiguration,
    registry: Arc<AudioRegistry>,
    selector: Arc<TargetSelector>,
    actions: Arc<ActionRegistry>,
    hotkeys: Arc<HotkeyManager>,
    worker: Mutex<Option<RefreshWorker>>,
}

impl VolumeControlApi {
    /// Build an instance over `gateway`.
    ///
    /// Native calls are bounded when `native_call_timeout_ms` is set. A failed
    /// initial enumeration is logged and leaves the registry empty; the next
    /// refresh retries.
    pub fn new(gateway: Arc<dyn NativeAudioGateway>, config: ControlConfiguration) -> Result<Self, ControlError> {
        config.validate().map_err(ControlError::InvalidConfiguration)?;

        let gateway: Arc<dyn NativeAudioGateway> = match config.native_call_timeout() {
            Some(timeout) => Arc::new(BoundedGateway::new(gateway, timeout)),
            None => gateway,
        };

        let registry = Arc::new(AudioRegistry::new(gateway, config.device_state_mask));
        match registry.refresh() {
            Ok(summary) => log::info!("Found {} audio devices", summary.added.len()),
            Err(e) => log::warn!("Initial device enumeration failed: {}", e),
        }

        let selector = Arc::new(TargetSelector::new(Arc::clone(&registry)));
        let actions = Arc::new(ActionRegistry::new());
        if config.register_builtin_actions {
            actions.register_provider(&BuiltinActions)?;
        }

        Ok(Self {
            config,
            registry,
            selector,
            actions,
            hotkeys: Arc::new(HotkeyManager::new()),
            worker: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ControlConfiguration {
        &self.config
    }

    pub fn registry(&self) -> &Arc<AudioRegistry> {
        &self.registry
    }

    pub fn selector(&self) -> &Arc<TargetSelector> {
        &self.selector
    }

    pub fn actions(&self) -> &Arc<ActionRegistry> {
        &self.actions
    }

    pub fn hotkeys(&self) -> &Arc<HotkeyManager> {
        &self.hotkeys
    }

    // --- Devices & sessions ---

    pub fn refresh(&self) -> Result<RefreshSummary, ControlError> {
        self.registry.refresh_all()
    }

    pub fn devices(&self) -> Vec<AudioDevice> {
        self.registry.devices()
    }

    pub fn sessions(&self, device_id: &str) -> Vec<AudioSession> {
        self.registry.sessions(device_id)
    }

    pub fn all_sessions(&self) -> Vec<AudioSession> {
        self.registry.all_sessions()
    }

    pub fn find_device_by_id(&self, id: &str) -> AudioDevice {
        self.registry.find_device_by_id(id)
    }

    pub fn find_session_by_process_name(&self, name: &str) -> AudioSession {
        self.registry.find_session_by_process_name(name)
    }

    pub fn default_device(&self) -> AudioDevice {
        self.registry.default_device()
    }

    pub fn set_session_volume(&self, session: &AudioSession, level: f32) -> Result<(), ControlError> {
        self.registry.set_session_volume(session, level)
    }

    pub fn set_session_mute(&self, session: &AudioSession, muted: bool) -> Result<(), ControlError> {
        self.registry.set_session_mute(session, muted)
    }

    pub fn set_device_volume(&self, device: &AudioDevice, level: f32) -> Result<(), ControlError> {
        self.registry.set_device_volume(device, level)
    }

    pub fn set_device_mute(&self, device: &AudioDevice, muted: bool) -> Result<(), ControlError> {
        self.registry.set_device_mute(device, muted)
    }

    // --- Selection ---

    pub fn selected_device(&self) -> AudioDevice {
        self.selector.selected_device()
    }

    pub fn selected_session(&self) -> AudioSession {
        self.selector.selected_session()
    }

    pub fn get_selection(&self, subject: Subject) -> Selection {
        self.selector.get_selection(subject)
    }

    pub fn select_device(&self, device_id: &str) -> bool {
        self.selector.select_device(device_id)
    }

    pub fn select_session(&self, target: TargetInfo) -> bool {
        self.selector.select_session(target)
    }

    pub fn selection_snapshot(&self) -> SelectionSnapshot {
        self.selector.snapshot()
    }

    pub fn restore_selection(&self, snapshot: &SelectionSnapshot) {
        self.selector.restore(snapshot)
    }

    // --- Actions & hotkeys ---

    pub fn register_action(&self, binding: ActionBinding) -> Result<(), ControlError> {
        self.actions.register(binding)
    }

    pub fn register_provider(&self, provider: &dyn ActionProvider) -> Result<usize, ControlError> {
        self.actions.register_provider(provider)
    }

    pub fn action_names(&self) -> Vec<String> {
        self.actions.names()
    }

    /// Run an action by name outside of any hotkey.
    pub fn invoke_action(&self, name: &str, settings: ActionSettings) -> ActionOutcome {
        self.run(&HotkeyPressed::manual(name, settings))
    }

    /// Entry point for the hotkey source. Unbound ids are skipped.
    pub fn dispatch_hotkey(&self, id: HotkeyId) -> ActionOutcome {
        match self.hotkeys.event_for(id) {
            Some(event) => self.run(&event),
            None => {
                log::warn!("Hotkey {} is not bound", id);
                ActionOutcome::Skipped
            }
        }
    }

    pub fn bind_hotkey(&self, binding: HotkeyBinding) -> Option<HotkeyBinding> {
        self.hotkeys.bind(binding)
    }

    pub fn unbind_hotkey(&self, id: HotkeyId) -> Option<HotkeyBinding> {
        self.hotkeys.unbind(id)
    }

    pub fn hotkey_bindings(&self) -> Vec<HotkeyBinding> {
        self.hotkeys.bindings()
    }

    fn run(&self, event: &HotkeyPressed) -> ActionOutcome {
        let ctx = ActionContext {
            registry: &self.registry,
            selector: &self.selector,
            config: &self.config,
        };
        let outcome = self.actions.invoke(&event.action_name, &ctx, event);
        let delegates = self.registry.delegate();
        match &outcome {
            ActionOutcome::Completed(subject) => {
                delegates.notify(|d| d.on_action_completed(&event.action_name, *subject))
            }
            ActionOutcome::Failed(error) => delegates.notify(|d| d.on_action_failed(error)),
            ActionOutcome::Skipped => {}
        }
        outcome
    }

    // --- Background refresh ---

    /// Start the refresh worker if it is not running and return the callback
    /// a device notification source should feed.
    pub fn start_background_refresh(&self) -> Result<DeviceEventCallback, ControlError> {
        let mut worker = self.worker.lock();
        if let Some(running) = worker.as_ref() {
            return Ok(running.event_callback());
        }
        let started = RefreshWorker::start(Arc::clone(&self.registry), self.config.refresh_interval())?;
        let callback = started.event_callback();
        *worker = Some(started);
        Ok(callback)
    }

    /// Callback of the running worker, if any.
    pub fn device_event_callback(&self) -> Option<DeviceEventCallback> {
        self.worker.lock().as_ref().map(RefreshWorker::event_callback)
    }

    pub fn stop_background_refresh(&self) {
        // Take the worker out first so joining does not hold the lock.
        let worker = self.worker.lock().take();
        if let Some(mut worker) = worker {
            worker.stop();
        }
    }

    // --- Delegate ---

    pub fn set_delegate(&self, delegate: Arc<dyn AudioDelegate>) {
        self.registry.delegate().set(delegate);
    }

    pub fn clear_delegate(&self) {
        self.registry.delegate().clear();
    }
}

impl Drop for VolumeControlApi {
    fn drop(&mut self) {
        self.stop_background_refresh();
    }
}
