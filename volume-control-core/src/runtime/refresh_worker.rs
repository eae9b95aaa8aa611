use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::models::error::ControlError;
use crate::models::event::{DeviceEvent, DeviceEventCallback};
use crate::registry::AudioRegistry;

enum WorkerMessage {
    Event(DeviceEvent),
    Stop,
}

/// Background thread that keeps the registry current.
///
/// Refreshes on every device notification fed through
/// [`event_callback`](Self::event_callback) and, when an interval is set, at
/// least that often. Failed refreshes are logged; the loop keeps going.
pub struct RefreshWorker {
    sender: Sender<WorkerMessage>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RefreshWorker {
    pub fn start(registry: Arc<AudioRegistry>, interval: Option<Duration>) -> Result<Self, ControlError> {
        let (sender, receiver) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name("audio-refresh".into())
            .spawn(move || {
                while flag.load(Ordering::SeqCst) {
                    let message = match interval {
                        Some(interval) => receiver.recv_timeout(interval),
                        None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
                    };
                    match message {
                        Ok(WorkerMessage::Event(event)) => {
                            if let Err(e) = registry.apply_event(&event) {
                                log::warn!("Refresh after {:?} failed: {}", event, e);
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(e) = registry.refresh_all() {
                                log::warn!("Periodic refresh failed: {}", e);
                            }
                        }
                        Ok(WorkerMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                log::debug!("Refresh worker exiting");
            })
            .map_err(|e| ControlError::RefreshFailed(format!("cannot spawn refresh worker: {}", e)))?;

        log::info!("Refresh worker started (interval {:?})", interval);
        Ok(Self {
            sender,
            running,
            handle: Some(handle),
        })
    }

    /// Callback for a notification source; each call queues one refresh.
    pub fn event_callback(&self) -> DeviceEventCallback {
        let sender = self.sender.clone();
        Arc::new(move |event| {
            if sender.send(WorkerMessage::Event(event)).is_err() {
                log::debug!("Device event dropped, refresh worker stopped");
            }
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && self.handle.is_some()
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.sender.send(WorkerMessage::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Refresh worker panicked");
            }
            log::info!("Refresh worker stopped");
        }
    }
}

impl Drop for RefreshWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;
    use crate::models::device_state::DeviceState;
    use std::time::Instant;

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn setup() -> (Arc<MockGateway>, Arc<AudioRegistry>) {
        let mock = Arc::new(MockGateway::new());
        mock.add_device("d1", "Speakers", DeviceState::ACTIVE);
        let registry = Arc::new(AudioRegistry::new(mock.clone(), DeviceState::ACTIVE));
        registry.refresh().unwrap();
        (mock, registry)
    }

    #[test]
    fn device_event_triggers_refresh() {
        let (mock, registry) = setup();
        let mut worker = RefreshWorker::start(registry.clone(), None).unwrap();

        mock.add_device("d2", "Headset", DeviceState::ACTIVE);
        let callback = worker.event_callback();
        callback(DeviceEvent::DeviceAdded {
            device_id: "d2".into(),
        });

        assert!(wait_for(|| !registry.find_device_by_id("d2").is_virtual()));
        worker.stop();
        assert!(!worker.is_running());
    }

    #[test]
    fn interval_refreshes_and_survives_failures() {
        let (mock, registry) = setup();
        mock.fail_enumeration(Some(crate::traits::native_gateway::NativeStatus::FAILED));
        let mut worker = RefreshWorker::start(registry.clone(), Some(Duration::from_millis(10))).unwrap();

        assert!(wait_for(|| mock.enumeration_count() >= 3));
        mock.fail_enumeration(None);
        mock.add_device("d2", "Headset", DeviceState::ACTIVE);
        assert!(wait_for(|| registry.devices().len() == 2));

        worker.stop();
        let count = mock.enumeration_count();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(mock.enumeration_count(), count);
    }

    #[test]
    fn callback_after_stop_is_harmless() {
        let (_, registry) = setup();
        let mut worker = RefreshWorker::start(registry, None).unwrap();
        let callback = worker.event_callback();
        worker.stop();
        callback(DeviceEvent::SessionsChanged {
            device_id: "d1".into(),
        });
    }
}
