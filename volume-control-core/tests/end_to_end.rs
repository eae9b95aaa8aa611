use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use approx::assert_relative_eq;
use parking_lot::Mutex;
use serde_json::json;
use volume_control_core::storage::snapshot;
use volume_control_core::{
    ActionOutcome, ActionSettings, AudioDelegate, AudioSession, ControlConfiguration, ControlError, DeviceEvent,
    DeviceState, HotkeyBinding, MockGateway, RefreshSummary, SelectionSnapshot, Subject, TargetInfo,
    VolumeControlApi,
};

fn build() -> (Arc<MockGateway>, VolumeControlApi) {
    let mock = Arc::new(MockGateway::new());
    mock.add_device("D1", "Speakers", DeviceState::ACTIVE);
    mock.add_device("D2", "Line Out", DeviceState::DISABLED);
    let api = VolumeControlApi::new(mock.clone(), ControlConfiguration::default()).unwrap();
    (mock, api)
}

#[test]
fn unplugged_device_goes_virtual_and_comes_back() {
    let (mock, api) = build();
    assert!(api.select_device("D1"));
    assert_eq!(api.selected_device().name(), "Speakers");

    mock.set_device_state("D1", DeviceState::UNPLUGGED);
    api.refresh().unwrap();
    assert!(api.selected_device().is_virtual());
    assert!(api.find_device_by_id("D1").is_virtual());
    assert_eq!(api.find_device_by_id("D1"), api.find_device_by_id("D1"));

    mock.set_device_state("D1", DeviceState::ACTIVE);
    api.refresh().unwrap();
    let d1 = api.selected_device();
    assert!(!d1.is_virtual());
    assert_eq!(d1.id(), "D1");
    assert!(d1.is_active());
}

#[test]
fn missing_session_selection_is_virtual() {
    let (_, api) = build();
    api.select_session(TargetInfo::from_pid(9999));
    let selected = api.selected_session();
    assert!(selected.is_virtual());
    assert_eq!(selected, AudioSession::Virtual);
}

#[test]
fn hotkeys_from_disk_drive_the_selected_session() {
    let (mock, api) = build();
    mock.add_session("D1", 100, "spotify.exe");
    mock.add_session("D1", 200, "chrome.exe");

    let path = std::env::temp_dir().join(format!("volume_control_e2e_{}_hotkeys.json", std::process::id()));
    snapshot::save_hotkeys(
        &[
            HotkeyBinding::new(1, "Next Target"),
            HotkeyBinding::new(2, "Volume Down").with_settings(ActionSettings::new(json!({ "step": 0.5 }))),
            HotkeyBinding::new(3, "Toggle Mute"),
        ],
        &path,
    )
    .unwrap();
    api.hotkeys().load(snapshot::load_hotkeys(&path).unwrap());
    let _ = std::fs::remove_file(&path);

    assert_eq!(api.dispatch_hotkey(1), ActionOutcome::Completed(Subject::Target));
    assert_eq!(api.selected_session().process_name(), "spotify.exe");

    api.dispatch_hotkey(2);
    api.dispatch_hotkey(3);
    assert_relative_eq!(mock.session_volume("D1", 100).unwrap(), 0.5);
    assert_eq!(mock.session_muted("D1", 100), Some(true));
    assert_relative_eq!(mock.session_volume("D1", 200).unwrap(), 1.0);
}

#[test]
fn selection_survives_restart() {
    let (mock, api) = build();
    let inst = mock.add_session("D1", 100, "spotify.exe");
    api.select_device("D1");
    api.select_session(TargetInfo::new(100, inst));

    let path = std::env::temp_dir().join(format!("volume_control_e2e_{}_selection.json", std::process::id()));
    snapshot::save_selection(&api.selection_snapshot(), &path).unwrap();

    let (_, restarted) = build();
    let saved: SelectionSnapshot = snapshot::load_selection(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    restarted.restore_selection(&saved);

    assert_eq!(restarted.selected_device().id(), "D1");
    assert_eq!(restarted.selection_snapshot().session, saved.session);
}

#[derive(Default)]
struct Recorder {
    refreshes: Mutex<Vec<RefreshSummary>>,
    completed: Mutex<Vec<String>>,
    failed: Mutex<Vec<ControlError>>,
}

impl AudioDelegate for Recorder {
    fn on_refreshed(&self, summary: &RefreshSummary) {
        self.refreshes.lock().push(summary.clone());
    }

    fn on_selection_changed(&self, _selection: &SelectionSnapshot) {}

    fn on_action_completed(&self, name: &str, _subject: Subject) {
        self.completed.lock().push(name.to_string());
    }

    fn on_action_failed(&self, error: &ControlError) {
        self.failed.lock().push(error.clone());
    }
}

#[test]
fn delegate_follows_refreshes_and_actions() {
    let (mock, api) = build();
    let recorder = Arc::new(Recorder::default());
    api.set_delegate(recorder.clone());

    let callback = api.start_background_refresh().unwrap();
    mock.add_device("D3", "USB Headset", DeviceState::ACTIVE);
    callback(DeviceEvent::DeviceAdded {
        device_id: "D3".into(),
    });

    let deadline = Instant::now() + Duration::from_secs(2);
    while api.find_device_by_id("D3").is_virtual() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(!api.find_device_by_id("D3").is_virtual());
    assert!(recorder
        .refreshes
        .lock()
        .iter()
        .any(|s| s.added == vec!["D3".to_string()]));

    api.invoke_action("Toggle Device Mute", ActionSettings::default());
    mock.fail_writes(Some(volume_control_core::NativeStatus::ACCESS_DENIED));
    api.invoke_action("Toggle Device Mute", ActionSettings::default());

    assert_eq!(*recorder.completed.lock(), vec!["Toggle Device Mute".to_string()]);
    assert_eq!(recorder.failed.lock().len(), 1);
    api.stop_background_refresh();
}
