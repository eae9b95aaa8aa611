use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::models::audio_models::DataFlow;
use crate::models::device_state::DeviceState;
use crate::traits::native_gateway::{
    NativeAudioGateway, NativeDevice, NativeHandle, NativeResult, NativeSession, NativeStatus,
};

/// Gateway decorator that bounds every native call.
///
/// Each call runs on a short-lived helper thread. If the inner gateway does
/// not answer within `timeout` the caller gets `NativeStatus::TIMED_OUT`
/// and the helper thread is left to finish (or hang) on its own.
pub struct BoundedGateway {
    inner: Arc<dyn NativeAudioGateway>,
    timeout: Duration,
}

impl BoundedGateway {
    pub fn new(inner: Arc<dyn NativeAudioGateway>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn call<T, F>(&self, op: &'static str, f: F) -> NativeResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn NativeAudioGateway) -> NativeResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let (tx, rx) = mpsc::sync_channel(1);

        thread::Builder::new()
            .name(format!("native-audio-{}", op))
            .spawn(move || {
                let _ = tx.send(f(inner.as_ref()));
            })
            .map_err(|e| {
                log::error!("Failed to spawn native call thread for {}: {}", op, e);
                NativeStatus::FAILED
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("Native call {} did not answer within {:?}", op, self.timeout);
                Err(NativeStatus::TIMED_OUT)
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::error!("Native call {} aborted without a result", op);
                Err(NativeStatus::FAILED)
            }
        }
    }
}

impl NativeAudioGateway for BoundedGateway {
    fn enumerate_devices(&self, state_mask: DeviceState) -> NativeResult<Vec<NativeDevice>> {
        self.call("enumerate", move |g| g.enumerate_devices(state_mask))
    }

    fn sessions_for_device(&self, device: &NativeHandle) -> NativeResult<Vec<NativeSession>> {
        let device = device.clone();
        self.call("sessions", move |g| g.sessions_for_device(&device))
    }

    fn get_volume(&self, handle: &NativeHandle) -> NativeResult<f32> {
        let handle = handle.clone();
        self.call("get-volume", move |g| g.get_volume(&handle))
    }

    fn set_volume(&self, handle: &NativeHandle, level: f32) -> NativeResult<()> {
        let handle = handle.clone();
        self.call("set-volume", move |g| g.set_volume(&handle, level))
    }

    fn get_mute(&self, handle: &NativeHandle) -> NativeResult<bool> {
        let handle = handle.clone();
        self.call("get-mute", move |g| g.get_mute(&handle))
    }

    fn set_mute(&self, handle: &NativeHandle, muted: bool) -> NativeResult<()> {
        let handle = handle.clone();
        self.call("set-mute", move |g| g.set_mute(&handle, muted))
    }

    fn default_device_id(&self, flow: DataFlow) -> NativeResult<Option<String>> {
        self.call("default-device", move |g| g.default_device_id(flow))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::MockGateway;

    fn mock_with_device() -> Arc<MockGateway> {
        let mock = Arc::new(MockGateway::new());
        mock.add_device("a", "Speakers", DeviceState::ACTIVE);
        mock
    }

    #[test]
    fn passes_results_through() {
        let mock = mock_with_device();
        let bounded = BoundedGateway::new(mock.clone(), Duration::from_secs(5));

        let devices = bounded.enumerate_devices(DeviceState::ALL).unwrap();
        assert_eq!(devices.len(), 1);

        bounded.set_mute(&NativeHandle::endpoint("a"), true).unwrap();
        assert_eq!(mock.device_muted("a"), Some(true));
        assert_eq!(
            bounded.get_volume(&NativeHandle::endpoint("missing")),
            Err(NativeStatus::NOT_FOUND)
        );
    }

    #[test]
    fn slow_calls_time_out() {
        let mock = mock_with_device();
        mock.set_latency(Some(Duration::from_millis(500)));
        let bounded = BoundedGateway::new(mock, Duration::from_millis(20));

        assert_eq!(
            bounded.enumerate_devices(DeviceState::ALL),
            Err(NativeStatus::TIMED_OUT)
        );
    }
}
