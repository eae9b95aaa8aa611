//! Plugin-facing API and its process-wide instance.
//!
//! Hosts call [`initialize`] once at startup; plugins reach the same
//! instance through [`instance`]. After [`shutdown`] the slot stays spent:
//! a process initializes the API at most once.

pub mod api;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::ControlConfiguration;
use crate::models::error::ControlError;
use crate::traits::native_gateway::NativeAudioGateway;

pub use api::VolumeControlApi;

enum SlotState {
    Empty,
    Live(Arc<VolumeControlApi>),
    Retired,
}

static SLOT: Mutex<SlotState> = parking_lot::const_mutex(SlotState::Empty);

/// Create the process-wide instance.
///
/// Fails with `AlreadyInitialized` on every call after the first successful
/// one, including after [`shutdown`]. If construction itself fails the slot
/// stays empty and the host may try again.
pub fn initialize(
    gateway: Arc<dyn NativeAudioGateway>,
    config: ControlConfiguration,
) -> Result<Arc<VolumeControlApi>, ControlError> {
    let mut slot = SLOT.lock();
    if !matches!(*slot, SlotState::Empty) {
        return Err(ControlError::AlreadyInitialized);
    }
    let api = Arc::new(VolumeControlApi::new(gateway, config)?);
    *slot = SlotState::Live(Arc::clone(&api));
    log::info!("Volume control API initialized");
    Ok(api)
}

/// The process-wide instance.
pub fn instance() -> Result<Arc<VolumeControlApi>, ControlError> {
    match &*SLOT.lock() {
        SlotState::Live(api) => Ok(Arc::clone(api)),
        SlotState::Empty | SlotState::Retired => Err(ControlError::NotInitialized),
    }
}

/// Stop background work and release the process-wide instance.
///
/// Clones handed out earlier stay usable until dropped.
pub fn shutdown() -> Result<(), ControlError> {
    let api = {
        let mut slot = SLOT.lock();
        match std::mem::replace(&mut *slot, SlotState::Retired) {
            SlotState::Live(api) => api,
            previous => {
                *slot = previous;
                return Err(ControlError::NotInitialized);
            }
        }
    };
    api.stop_background_refresh();
    log::info!("Volume control API shut down");
    Ok(())
}
