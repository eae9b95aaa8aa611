//! Current target of hotkey actions.
//!
//! The selector stores identities (device id, `TargetInfo`) and resolves them
//! through the registry on every read, so a target that disappears reads as
//! virtual and comes back once it is enumerated again.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::models::audio_models::{AudioDevice, AudioSession};
use crate::models::target::{Selection, SelectionSnapshot, Subject, TargetInfo};
use crate::registry::AudioRegistry;
use crate::traits::audio_delegate::DelegateSlot;

#[derive(Debug, Default)]
struct SelectorState {
    /// `None` follows the default device.
    device_id: Option<String>,
    session: Option<TargetInfo>,
    subject: Subject,
    locked: bool,
}

impl SelectorState {
    fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            device_id: self.device_id.clone(),
            session: self.session.clone(),
            locked: self.locked,
            saved_at: None,
        }
    }
}

/// Tracks the selected device, session and subject.
pub struct TargetSelector {
    registry: Arc<AudioRegistry>,
    state: RwLock<SelectorState>,
    delegates: DelegateSlot,
}

impl TargetSelector {
    /// Selector that follows the default device and has no session selected.
    ///
    /// Shares the registry's delegate slot.
    pub fn new(registry: Arc<AudioRegistry>) -> Self {
        let delegates = registry.delegate().clone();
        Self {
            registry,
            state: RwLock::new(SelectorState::default()),
            delegates,
        }
    }

    // --- Resolution ---

    /// The selected device, or the default device when none was chosen.
    pub fn selected_device(&self) -> AudioDevice {
        let device_id = self.state.read().device_id.clone();
        match device_id {
            Some(id) => self.registry.find_device_by_id(&id),
            None => self.registry.default_device(),
        }
    }

    pub fn selected_session(&self) -> AudioSession {
        let target = self.state.read().session.clone();
        match target {
            Some(target) => self.registry.find_session(&target),
            None => AudioSession::Virtual,
        }
    }

    /// Resolve what an action with `subject` would operate on.
    pub fn get_selection(&self, subject: Subject) -> Selection {
        match subject {
            Subject::Null => Selection::Nothing,
            Subject::Volume | Subject::Target => Selection::Session(self.selected_session()),
            Subject::Media => Selection::Device(self.selected_device()),
        }
    }

    pub fn subject(&self) -> Subject {
        self.state.read().subject
    }

    pub fn set_subject(&self, subject: Subject) {
        self.state.write().subject = subject;
    }

    // --- Selection changes ---

    /// Select a device by identifier. Returns `false` while locked.
    ///
    /// The identifier does not need to be present right now; it resolves to
    /// the virtual device until it is.
    pub fn select_device(&self, device_id: &str) -> bool {
        self.update("select device", |s| s.device_id = Some(device_id.to_string()))
    }

    /// Follow the system default device again.
    pub fn select_default_device(&self) -> bool {
        self.update("select default device", |s| s.device_id = None)
    }

    /// Select a session by identity. Returns `false` while locked.
    pub fn select_session(&self, target: TargetInfo) -> bool {
        self.update("select session", |s| {
            s.session = if target.is_virtual() { None } else { Some(target) };
        })
    }

    pub fn select_next_session(&self) -> bool {
        self.step_session(1)
    }

    pub fn select_previous_session(&self) -> bool {
        self.step_session(-1)
    }

    pub fn select_next_device(&self) -> bool {
        self.step_device(1)
    }

    pub fn select_previous_device(&self) -> bool {
        self.step_device(-1)
    }

    // --- Lock ---

    pub fn lock(&self) {
        self.set_locked(true);
    }

    pub fn unlock(&self) {
        self.set_locked(false);
    }

    /// Flip the lock and return the new state.
    pub fn toggle_lock(&self) -> bool {
        let locked = !self.is_locked();
        self.set_locked(locked);
        locked
    }

    pub fn is_locked(&self) -> bool {
        self.state.read().locked
    }

    // --- Persistence ---

    pub fn snapshot(&self) -> SelectionSnapshot {
        self.state.read().snapshot()
    }

    /// Replace the selection, including the lock flag, with a saved one.
    pub fn restore(&self, snapshot: &SelectionSnapshot) {
        let snap = {
            let mut state = self.state.write();
            state.device_id = snapshot.device_id.clone();
            state.session = snapshot.session.clone().filter(|t| !t.is_virtual());
            state.locked = snapshot.locked;
            state.snapshot()
        };
        log::debug!("Selection restored: {:?}", snap);
        self.delegates.notify(|d| d.on_selection_changed(&snap));
    }

    fn set_locked(&self, locked: bool) {
        let snap = {
            let mut state = self.state.write();
            if state.locked == locked {
                return;
            }
            state.locked = locked;
            state.snapshot()
        };
        log::debug!("Selection {}", if locked { "locked" } else { "unlocked" });
        self.delegates.notify(|d| d.on_selection_changed(&snap));
    }

    /// Apply `change` unless locked, then notify the delegate.
    fn update(&self, what: &str, change: impl FnOnce(&mut SelectorState)) -> bool {
        let snap = {
            let mut state = self.state.write();
            if state.locked {
                log::warn!("Selection is locked, ignoring {}", what);
                return false;
            }
            change(&mut state);
            state.snapshot()
        };
        log::debug!("{}: {:?}", what, snap);
        self.delegates.notify(|d| d.on_selection_changed(&snap));
        true
    }

    /// Move through the selected device's sessions (all active sessions when
    /// the device has none), wrapping at either end.
    fn step_session(&self, direction: isize) -> bool {
        if self.is_locked() {
            log::warn!("Selection is locked, ignoring session cycle");
            return false;
        }
        let mut sessions = self.registry.sessions_of(&self.selected_device());
        if sessions.is_empty() {
            sessions = self.registry.all_sessions();
        }
        let current = self.selected_session();
        let Some(next) = step(&sessions, &current, direction) else {
            return false;
        };
        let target = next.target_info();
        self.select_session(target)
    }

    fn step_device(&self, direction: isize) -> bool {
        if self.is_locked() {
            log::warn!("Selection is locked, ignoring device cycle");
            return false;
        }
        let devices: Vec<AudioDevice> = self
            .registry
            .devices()
            .into_iter()
            .filter(|d| d.is_active())
            .collect();
        let current = self.selected_device();
        let Some(next) = step(&devices, &current, direction) else {
            return false;
        };
        let id = next.id().to_string();
        self.select_device(&id)
    }
}

/// Neighbour of `current` in `items`, wrapping. Starts at the first (or last)
/// item when `current` is not in the list.
fn step<'a, T: PartialEq>(items: &'a [T], current: &T, direction: isize) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let len = items.len() as isize;
    let index = match items.iter().position(|item| item == current) {
        Some(i) => (i as isize + direction).rem_euclid(len),
        None if direction >= 0 => 0,
        None => len - 1,
    };
    items.get(index as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use crate::models::device_state::DeviceState;
    use crate::models::error::ControlError;
    use crate::registry::RefreshSummary;
    use crate::traits::audio_delegate::AudioDelegate;
    use parking_lot::Mutex;

    fn setup() -> (Arc<MockGateway>, Arc<AudioRegistry>, TargetSelector) {
        let mock = Arc::new(MockGateway::new());
        mock.add_device("d1", "Speakers", DeviceState::ACTIVE);
        mock.add_device("d2", "Headphones", DeviceState::ACTIVE);
        let registry = Arc::new(AudioRegistry::new(
            mock.clone(),
            DeviceState::ACTIVE | DeviceState::DISABLED,
        ));
        registry.refresh().unwrap();
        let selector = TargetSelector::new(registry.clone());
        (mock, registry, selector)
    }

    #[test]
    fn default_selection_follows_default_device() {
        let (_, _, selector) = setup();
        assert_eq!(selector.selected_device().id(), "d1");
        assert!(selector.selected_session().is_virtual());
        assert_eq!(selector.subject(), Subject::Null);
    }

    #[test]
    fn missing_session_resolves_to_virtual() {
        let (_, _, selector) = setup();
        assert!(selector.select_session(TargetInfo::from_pid(9999)));
        let a = selector.selected_session();
        assert!(a.is_virtual());
        assert_eq!(a, AudioSession::Virtual);
        assert_eq!(a, selector.selected_session());
    }

    #[test]
    fn vanished_device_reads_virtual_then_revives() {
        let (mock, registry, selector) = setup();
        selector.select_device("d2");
        mock.remove_device("d2");
        registry.refresh().unwrap();
        assert!(selector.selected_device().is_virtual());

        mock.add_device("d2", "Headphones", DeviceState::ACTIVE);
        registry.refresh().unwrap();
        assert_eq!(selector.selected_device().id(), "d2");
    }

    #[test]
    fn selection_by_subject() {
        let (mock, _, selector) = setup();
        let inst = mock.add_session("d1", 100, "spotify.exe");
        selector.select_session(TargetInfo::new(100, inst));

        assert_eq!(selector.get_selection(Subject::Null), Selection::Nothing);
        assert!(matches!(
            selector.get_selection(Subject::Volume),
            Selection::Session(ref s) if s.pid() == 100
        ));
        assert!(matches!(selector.get_selection(Subject::Target), Selection::Session(_)));
        assert!(matches!(
            selector.get_selection(Subject::Media),
            Selection::Device(ref d) if d.id() == "d1"
        ));
    }

    #[test]
    fn lock_ignores_changes() {
        let (_, _, selector) = setup();
        selector.lock();
        assert!(!selector.select_device("d2"));
        assert!(!selector.select_next_device());
        assert_eq!(selector.selected_device().id(), "d1");

        assert!(!selector.toggle_lock());
        assert!(selector.select_device("d2"));
        assert_eq!(selector.selected_device().id(), "d2");
    }

    #[test]
    fn session_cycling_wraps() {
        let (mock, _, selector) = setup();
        mock.add_session("d1", 100, "a.exe");
        mock.add_session("d1", 200, "b.exe");
        mock.add_session("d2", 300, "c.exe");

        assert!(selector.select_next_session());
        assert_eq!(selector.selected_session().pid(), 100);
        selector.select_next_session();
        assert_eq!(selector.selected_session().pid(), 200);
        selector.select_next_session();
        assert_eq!(selector.selected_session().pid(), 100);
        selector.select_previous_session();
        assert_eq!(selector.selected_session().pid(), 200);
    }

    #[test]
    fn session_cycling_falls_back_to_all_devices() {
        let (mock, _, selector) = setup();
        mock.add_session("d2", 300, "c.exe");
        assert!(selector.select_previous_session());
        assert_eq!(selector.selected_session().pid(), 300);
    }

    #[test]
    fn device_cycling_skips_inactive() {
        let (mock, registry, selector) = setup();
        mock.add_device("d3", "Line Out", DeviceState::DISABLED);
        registry.refresh().unwrap();

        selector.select_next_device();
        assert_eq!(selector.selected_device().id(), "d2");
        selector.select_next_device();
        assert_eq!(selector.selected_device().id(), "d1");
        selector.select_previous_device();
        assert_eq!(selector.selected_device().id(), "d2");
    }

    #[test]
    fn snapshot_round_trip() {
        let (_, _, selector) = setup();
        selector.select_device("d2");
        selector.select_session(TargetInfo::new(42, "inst"));
        selector.lock();
        let snap = selector.snapshot();

        let (_, _, other) = setup();
        other.restore(&snap);
        assert_eq!(other.snapshot(), snap);
        assert!(other.is_locked());
        assert_eq!(other.selected_device().id(), "d2");
    }

    #[derive(Default)]
    struct Recorder {
        changes: Mutex<Vec<SelectionSnapshot>>,
    }

    impl AudioDelegate for Recorder {
        fn on_refreshed(&self, _summary: &RefreshSummary) {}
        fn on_selection_changed(&self, selection: &SelectionSnapshot) {
            self.changes.lock().push(selection.clone());
        }
        fn on_action_completed(&self, _name: &str, _subject: Subject) {}
        fn on_action_failed(&self, _error: &ControlError) {}
    }

    #[test]
    fn delegate_sees_selection_changes() {
        let (_, registry, selector) = setup();
        let recorder = Arc::new(Recorder::default());
        registry.delegate().set(recorder.clone());

        selector.select_device("d2");
        selector.lock();
        selector.select_device("d1");

        let changes = recorder.changes.lock();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].device_id.as_deref(), Some("d2"));
        assert!(changes[1].locked);
    }
}
